//! Outbound escape sequences
//!
//! Formats symbolic terminal requests into CSI and OSC sequences. Output is
//! a pure function of the request, so [`EscapeBuilder`] memoizes it for
//! render loops that emit the same requests every frame.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use tracing::trace;

/// Default number of requests an [`EscapeBuilder`] keeps formatted
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// `ESC [ p1 ; p2 ... final`
pub fn csi(params: &[u32], final_byte: char) -> String {
    format!("\x1b[{}{}", join(params), final_byte)
}

/// `ESC [ ? p1 ; p2 ... final`, the DEC private form
pub fn csi_private(params: &[u32], final_byte: char) -> String {
    format!("\x1b[?{}{}", join(params), final_byte)
}

/// `ESC ] p1 ; p2 ... ESC \`
pub fn osc(params: &[&str]) -> String {
    format!("\x1b]{}\x1b\\", params.join(";"))
}

fn join(params: &[u32]) -> String {
    params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Text color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Default,
    /// One of the 8 base colors (0-7)
    Ansi(u8),
    /// Bright variant of a base color (0-7)
    Bright(u8),
    /// 256-color palette index
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// SGR parameters selecting this color; `base` is 30 for foreground and
    /// 40 for background
    fn sgr(self, base: u32, codes: &mut Vec<u32>) {
        match self {
            Color::Default => codes.push(base + 9),
            Color::Ansi(n) => codes.push(base + u32::from(n & 7)),
            Color::Bright(n) => codes.push(base + 60 + u32::from(n & 7)),
            Color::Indexed(n) => codes.extend([base + 8, 5, u32::from(n)]),
            Color::Rgb(r, g, b) => {
                codes.extend([base + 8, 2, u32::from(r), u32::from(g), u32::from(b)])
            }
        }
    }
}

/// Complete SGR state; encoding it resets everything not set here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub hidden: bool,
    pub strikethrough: bool,
}

impl Style {
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    pub fn bg(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    fn sgr_codes(&self) -> Vec<u32> {
        let mut codes = vec![0];

        let attributes = [
            (self.bold, 1),
            (self.dim, 2),
            (self.italic, 3),
            (self.underline, 4),
            (self.blink, 5),
            (self.reverse, 7),
            (self.hidden, 8),
            (self.strikethrough, 9),
        ];
        codes.extend(attributes.iter().filter(|(on, _)| *on).map(|(_, code)| *code));

        // Default colors are already restored by the reset
        if self.fg != Color::Default {
            self.fg.sgr(30, &mut codes);
        }
        if self.bg != Color::Default {
            self.bg.sgr(40, &mut codes);
        }
        codes
    }
}

/// Erase extent for erase-in-display and erase-in-line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EraseMode {
    /// From the cursor to the end
    ToEnd,
    /// From the start to the cursor
    ToStart,
    All,
    /// Whole display including scrollback (display only)
    Scrollback,
}

impl EraseMode {
    fn param(self) -> u32 {
        match self {
            EraseMode::ToEnd => 0,
            EraseMode::ToStart => 1,
            EraseMode::All => 2,
            EraseMode::Scrollback => 3,
        }
    }
}

/// DEC private modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    ApplicationCursorKeys,
    CursorVisible,
    MouseX10,
    MouseNormalTracking,
    MouseButtonEvent,
    MouseAnyEvent,
    FocusEvents,
    MouseUtf8,
    MouseSgr,
    MouseUrxvt,
    AlternateScreen,
    BracketedPaste,
}

impl Mode {
    pub fn number(self) -> u32 {
        match self {
            Mode::ApplicationCursorKeys => 1,
            Mode::CursorVisible => 25,
            Mode::MouseX10 => 9,
            Mode::MouseNormalTracking => 1000,
            Mode::MouseButtonEvent => 1002,
            Mode::MouseAnyEvent => 1003,
            Mode::FocusEvents => 1004,
            Mode::MouseUtf8 => 1005,
            Mode::MouseSgr => 1006,
            Mode::MouseUrxvt => 1015,
            Mode::AlternateScreen => 1049,
            Mode::BracketedPaste => 2004,
        }
    }
}

/// A terminal effect to format
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Request {
    CursorUp(u16),
    CursorDown(u16),
    CursorForward(u16),
    CursorBack(u16),
    /// Absolute position, 0-based
    CursorTo { row: u16, column: u16 },
    /// Absolute column on the current row, 0-based
    CursorColumn(u16),
    SaveCursor,
    RestoreCursor,
    ShowCursor,
    HideCursor,
    EraseDisplay(EraseMode),
    EraseLine(EraseMode),
    ScrollUp(u16),
    ScrollDown(u16),
    Foreground(Color),
    Background(Color),
    Style(Style),
    ResetAttributes,
    SetMode(Mode),
    ResetMode(Mode),
    /// Device status report 6; answered with a cursor position report
    RequestCursorPosition,
    SetTitle(String),
    SetIconName(String),
}

impl Request {
    pub fn encode(&self) -> String {
        match self {
            Request::CursorUp(n) => csi(&[u32::from(*n)], 'A'),
            Request::CursorDown(n) => csi(&[u32::from(*n)], 'B'),
            Request::CursorForward(n) => csi(&[u32::from(*n)], 'C'),
            Request::CursorBack(n) => csi(&[u32::from(*n)], 'D'),
            Request::CursorTo { row, column } => {
                csi(&[u32::from(*row) + 1, u32::from(*column) + 1], 'H')
            }
            Request::CursorColumn(column) => csi(&[u32::from(*column) + 1], 'G'),
            Request::SaveCursor => "\x1b7".to_string(),
            Request::RestoreCursor => "\x1b8".to_string(),
            Request::ShowCursor => Request::SetMode(Mode::CursorVisible).encode(),
            Request::HideCursor => Request::ResetMode(Mode::CursorVisible).encode(),
            Request::EraseDisplay(mode) => csi(&[mode.param()], 'J'),
            Request::EraseLine(mode) => {
                let mode = if *mode == EraseMode::Scrollback {
                    EraseMode::All
                } else {
                    *mode
                };
                csi(&[mode.param()], 'K')
            }
            Request::ScrollUp(n) => csi(&[u32::from(*n)], 'S'),
            Request::ScrollDown(n) => csi(&[u32::from(*n)], 'T'),
            Request::Foreground(color) => {
                let mut codes = Vec::new();
                color.sgr(30, &mut codes);
                csi(&codes, 'm')
            }
            Request::Background(color) => {
                let mut codes = Vec::new();
                color.sgr(40, &mut codes);
                csi(&codes, 'm')
            }
            Request::Style(style) => csi(&style.sgr_codes(), 'm'),
            Request::ResetAttributes => csi(&[0], 'm'),
            Request::SetMode(mode) => csi_private(&[mode.number()], 'h'),
            Request::ResetMode(mode) => csi_private(&[mode.number()], 'l'),
            Request::RequestCursorPosition => csi(&[6], 'n'),
            Request::SetTitle(title) => osc(&["2", title.as_str()]),
            Request::SetIconName(name) => osc(&["1", name.as_str()]),
        }
    }
}

/// Memoizing formatter with a bounded, first-in first-out cache
#[derive(Debug)]
pub struct EscapeBuilder {
    cache: HashMap<Request, String>,
    order: VecDeque<Request>,
    capacity: usize,
}

impl Default for EscapeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EscapeBuilder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Builder keeping at most `capacity` formatted requests (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            cache: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Formatted bytes for a request
    pub fn get(&mut self, request: &Request) -> &str {
        if !self.cache.contains_key(request) {
            if self.order.len() >= self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    trace!("Evicting cached escape sequence for {:?}", evicted);
                    self.cache.remove(&evicted);
                }
            }
            self.order.push_back(request.clone());
            self.cache.insert(request.clone(), request.encode());
        }
        self.cache
            .get(request)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Write a request's bytes to `out`
    pub fn write<W: Write>(&mut self, out: &mut W, request: &Request) -> io::Result<()> {
        out.write_all(self.get(request).as_bytes())
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Request::CursorUp(3), "\x1b[3A" ; "cursor up")]
    #[test_case(Request::CursorBack(1), "\x1b[1D" ; "cursor back")]
    #[test_case(Request::CursorTo { row: 0, column: 9 }, "\x1b[1;10H" ; "cursor to")]
    #[test_case(Request::CursorColumn(4), "\x1b[5G" ; "cursor column")]
    #[test_case(Request::EraseDisplay(EraseMode::All), "\x1b[2J" ; "erase display")]
    #[test_case(Request::EraseLine(EraseMode::ToEnd), "\x1b[0K" ; "erase line")]
    #[test_case(Request::HideCursor, "\x1b[?25l" ; "hide cursor")]
    #[test_case(Request::SetMode(Mode::MouseSgr), "\x1b[?1006h" ; "sgr mouse on")]
    #[test_case(Request::ResetMode(Mode::BracketedPaste), "\x1b[?2004l" ; "paste off")]
    #[test_case(Request::RequestCursorPosition, "\x1b[6n" ; "cursor report")]
    #[test_case(Request::SetTitle("rlterm".into()), "\x1b]2;rlterm\x1b\\" ; "title")]
    fn test_encode(request: Request, expected: &str) {
        assert_eq!(request.encode(), expected);
    }

    #[test_case(Color::Default, "\x1b[39m" ; "default")]
    #[test_case(Color::Ansi(1), "\x1b[31m" ; "base")]
    #[test_case(Color::Bright(2), "\x1b[92m" ; "bright")]
    #[test_case(Color::Indexed(196), "\x1b[38;5;196m" ; "indexed")]
    #[test_case(Color::Rgb(10, 20, 30), "\x1b[38;2;10;20;30m" ; "rgb")]
    fn test_foreground_colors(color: Color, expected: &str) {
        assert_eq!(Request::Foreground(color).encode(), expected);
    }

    #[test]
    fn test_background_uses_background_base() {
        assert_eq!(Request::Background(Color::Ansi(4)).encode(), "\x1b[44m");
        assert_eq!(Request::Background(Color::Bright(0)).encode(), "\x1b[100m");
        assert_eq!(Request::Background(Color::Indexed(17)).encode(), "\x1b[48;5;17m");
    }

    #[test]
    fn test_style_resets_first() {
        let style = Style::default().bold().underline().fg(Color::Ansi(3));
        assert_eq!(Request::Style(style).encode(), "\x1b[0;1;4;33m");
        assert_eq!(Request::Style(Style::default()).encode(), "\x1b[0m");
    }

    #[test]
    fn test_builder_memoizes_with_fifo_eviction() {
        let mut builder = EscapeBuilder::with_capacity(2);
        assert_eq!(builder.get(&Request::CursorUp(1)), "\x1b[1A");
        assert_eq!(builder.get(&Request::CursorUp(1)), "\x1b[1A");
        assert_eq!(builder.len(), 1);

        builder.get(&Request::CursorUp(2));
        builder.get(&Request::CursorUp(3));
        assert_eq!(builder.len(), 2);

        let mut out = Vec::new();
        builder.write(&mut out, &Request::CursorUp(1)).unwrap();
        assert_eq!(out, b"\x1b[1A");
        assert_eq!(builder.len(), 2);

        builder.clear();
        assert!(builder.is_empty());
    }
}
