//! Decoded input tokens

use crate::capability::{Capability, Key, KeypadKey};
use crate::ESC;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

/// Mouse reporting protocol a report was received in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseProtocol {
    /// `ESC [ M` followed by three biased bytes
    X10,
    /// `ESC [ < b ; x ; y M|m`
    Sgr,
    /// `ESC [ b ; x ; y M`
    Urxvt,
}

/// Parsed mouse report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseReport {
    pub protocol: MouseProtocol,
    /// Button code with the protocol bias removed
    pub button: u32,
    /// 1-based column
    pub column: u32,
    /// 1-based row
    pub row: u32,
    pub pressed: bool,
    pub modifiers: KeyModifiers,
    pub motion: bool,
    pub wheel: bool,
}

impl MouseReport {
    /// Build a report from an unbiased button code.
    ///
    /// `pressed` is `None` for protocols that signal release through the
    /// button code (low bits 3) instead of the terminator.
    pub fn from_code(
        protocol: MouseProtocol,
        code: u32,
        column: u32,
        row: u32,
        pressed: Option<bool>,
    ) -> Self {
        let mut modifiers = KeyModifiers::NONE;
        if code & 4 != 0 {
            modifiers |= KeyModifiers::SHIFT;
        }
        if code & 8 != 0 {
            modifiers |= KeyModifiers::ALT;
        }
        if code & 16 != 0 {
            modifiers |= KeyModifiers::CONTROL;
        }
        let wheel = code & 64 != 0;
        Self {
            protocol,
            button: code,
            column,
            row,
            pressed: pressed.unwrap_or(wheel || code & 3 != 3),
            modifiers,
            motion: code & 32 != 0,
            wheel,
        }
    }

    /// Button number from the low two bits (0 left, 1 middle, 2 right)
    pub fn button_index(&self) -> u32 {
        self.button & 3
    }

    fn to_event(self) -> MouseEvent {
        let button = match self.button_index() {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        };
        let kind = if self.wheel {
            match self.button_index() {
                0 => MouseEventKind::ScrollUp,
                1 => MouseEventKind::ScrollDown,
                2 => MouseEventKind::ScrollLeft,
                _ => MouseEventKind::ScrollRight,
            }
        } else if self.motion {
            if self.button_index() == 3 {
                MouseEventKind::Moved
            } else {
                MouseEventKind::Drag(button)
            }
        } else if self.pressed {
            MouseEventKind::Down(button)
        } else {
            MouseEventKind::Up(button)
        };

        MouseEvent {
            kind,
            column: to_zero_based(self.column),
            row: to_zero_based(self.row),
            modifiers: self.modifiers,
        }
    }
}

fn to_zero_based(value: u32) -> u16 {
    u16::try_from(value.saturating_sub(1)).unwrap_or(u16::MAX)
}

/// Cursor position report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub row: u32,
    pub column: u32,
}

/// Parameters parsed out of a variable-length sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fields {
    Key { modifiers: KeyModifiers },
    Cursor(CursorPosition),
    Mouse(MouseReport),
}

impl Fields {
    /// Fields implied by a capability on its own: modifier state for
    /// modified keys, nothing otherwise
    pub fn for_capability(capability: Capability) -> Option<Self> {
        match capability {
            Capability::Key(_, modifiers) if !modifiers.is_empty() => {
                Some(Fields::Key { modifiers })
            }
            _ => None,
        }
    }
}

/// One decoded input token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The characters this token consumed
    pub text: String,
    /// Resolved capability, `None` when unrecognized
    pub capability: Option<Capability>,
    /// Whether the token followed a lone ESC (the Alt/Meta prefix)
    pub is_escaped: bool,
    pub fields: Option<Fields>,
}

impl Sequence {
    pub fn new(text: impl Into<String>, capability: Option<Capability>) -> Self {
        let fields = capability.and_then(Fields::for_capability);
        Self {
            text: text.into(),
            capability,
            is_escaped: false,
            fields,
        }
    }

    /// A lone Escape key press
    pub fn escape_key() -> Self {
        Self::new(ESC.to_string(), Some(Capability::key(Key::Escape)))
    }

    pub fn escaped(mut self, is_escaped: bool) -> Self {
        self.is_escaped = is_escaped;
        self
    }

    pub fn with_fields(mut self, fields: Option<Fields>) -> Self {
        self.fields = fields;
        self
    }

    /// Canonical capability name
    pub fn name(&self) -> Option<String> {
        self.capability.map(|cap| cap.to_string())
    }

    /// Whether more than one character was consumed
    pub fn is_sequence(&self) -> bool {
        self.text.chars().nth(1).is_some()
    }

    pub fn cursor_position(&self) -> Option<CursorPosition> {
        match self.fields {
            Some(Fields::Cursor(pos)) => Some(pos),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<MouseReport> {
        match self.fields {
            Some(Fields::Mouse(report)) => Some(report),
            _ => None,
        }
    }

    /// Modifier keys, with the ESC prefix counted as Alt
    pub fn modifiers(&self) -> KeyModifiers {
        let mut modifiers = match self.fields {
            Some(Fields::Key { modifiers }) => modifiers,
            Some(Fields::Mouse(report)) => report.modifiers,
            _ => self.capability.map(|c| c.modifiers()).unwrap_or(KeyModifiers::NONE),
        };
        if self.is_escaped {
            modifiers |= KeyModifiers::ALT;
        }
        modifiers
    }

    /// Convert into a crossterm event for applications built on crossterm.
    ///
    /// Reports without a crossterm counterpart (cursor position, paste
    /// markers) and unknown multi-character sequences give `None`.
    pub fn to_event(&self) -> Option<Event> {
        match self.capability {
            Some(Capability::Key(key, _)) => {
                let (code, keypad) = key_code(key);
                let state = if keypad {
                    KeyEventState::KEYPAD
                } else {
                    KeyEventState::NONE
                };
                Some(Event::Key(KeyEvent::new_with_kind_and_state(
                    code,
                    self.modifiers(),
                    KeyEventKind::Press,
                    state,
                )))
            }
            Some(Capability::FocusIn) => Some(Event::FocusGained),
            Some(Capability::FocusOut) => Some(Event::FocusLost),
            Some(Capability::MouseReport) => self.mouse().map(|m| Event::Mouse(m.to_event())),
            Some(_) => None,
            None => {
                let mut chars = self.text.chars();
                let (Some(c), None) = (chars.next(), chars.next()) else {
                    return None;
                };
                let (code, modifiers) = char_key(c);
                let modifiers = if self.is_escaped {
                    modifiers | KeyModifiers::ALT
                } else {
                    modifiers
                };
                Some(Event::Key(KeyEvent::new(code, modifiers)))
            }
        }
    }
}

fn key_code(key: Key) -> (KeyCode, bool) {
    let code = match key {
        Key::Up => KeyCode::Up,
        Key::Down => KeyCode::Down,
        Key::Left => KeyCode::Left,
        Key::Right => KeyCode::Right,
        Key::Home => KeyCode::Home,
        Key::End => KeyCode::End,
        Key::Insert => KeyCode::Insert,
        Key::Delete => KeyCode::Delete,
        Key::PageUp => KeyCode::PageUp,
        Key::PageDown => KeyCode::PageDown,
        Key::Begin => KeyCode::KeypadBegin,
        Key::Backspace => KeyCode::Backspace,
        Key::Tab => KeyCode::Tab,
        Key::BackTab => KeyCode::BackTab,
        Key::Enter => KeyCode::Enter,
        Key::Escape => KeyCode::Esc,
        Key::F(n) => KeyCode::F(n),
        Key::Keypad(pad) => {
            let code = match pad {
                KeypadKey::Digit(d) => KeyCode::Char(char::from(b'0' + d)),
                KeypadKey::Multiply => KeyCode::Char('*'),
                KeypadKey::Add => KeyCode::Char('+'),
                KeypadKey::Separator => KeyCode::Char(','),
                KeypadKey::Subtract => KeyCode::Char('-'),
                KeypadKey::Decimal => KeyCode::Char('.'),
                KeypadKey::Divide => KeyCode::Char('/'),
                KeypadKey::Equal => KeyCode::Char('='),
                KeypadKey::Enter => KeyCode::Enter,
            };
            return (code, true);
        }
    };
    (code, false)
}

/// Key for a single unresolved character
fn char_key(c: char) -> (KeyCode, KeyModifiers) {
    match c {
        '\0' => (KeyCode::Char(' '), KeyModifiers::CONTROL),
        '\x01'..='\x1a' => (
            KeyCode::Char(char::from(b'a' + c as u8 - 1)),
            KeyModifiers::CONTROL,
        ),
        '\x1c'..='\x1f' => (
            KeyCode::Char(char::from(b'4' + c as u8 - 0x1c)),
            KeyModifiers::CONTROL,
        ),
        _ => (KeyCode::Char(c), KeyModifiers::NONE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_code_bits() {
        let report = MouseReport::from_code(MouseProtocol::X10, 4 | 16 | 2, 5, 6, None);
        assert_eq!(report.button_index(), 2);
        assert!(report.pressed);
        assert_eq!(report.modifiers, KeyModifiers::SHIFT | KeyModifiers::CONTROL);

        let release = MouseReport::from_code(MouseProtocol::X10, 3, 1, 1, None);
        assert!(!release.pressed);

        let wheel = MouseReport::from_code(MouseProtocol::Sgr, 65, 1, 1, Some(true));
        assert!(wheel.wheel);
        assert_eq!(
            wheel.to_event().kind,
            MouseEventKind::ScrollDown
        );
    }

    #[test]
    fn test_control_characters_map_to_ctrl_keys() {
        let seq = Sequence::new("\x01", None);
        assert_eq!(
            seq.to_event(),
            Some(Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)))
        );
    }

    #[test]
    fn test_escaped_literal_is_alt() {
        let seq = Sequence::new("x", None).escaped(true);
        assert_eq!(
            seq.to_event(),
            Some(Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT)))
        );
    }

    #[test]
    fn test_unknown_sequence_has_no_event() {
        assert_eq!(Sequence::new("\x1b[99z", None).to_event(), None);
        assert!(Sequence::new("\x1b[99z", None).is_sequence());
        assert!(!Sequence::new("é", None).is_sequence());
    }
}
