//! Symbolic capability names
//!
//! A capability names a logical key, report or marker independently of the
//! bytes a particular terminal uses for it.

use crate::TerminalError;
use crossterm::event::KeyModifiers;
use std::fmt;
use std::str::FromStr;

/// Highest function key number with a terminfo code (`kf63`)
pub const MAX_FUNCTION_KEY: u8 = 63;

/// Keys on the numeric keypad in application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypadKey {
    Digit(u8),
    Multiply,
    Add,
    Separator,
    Subtract,
    Decimal,
    Divide,
    Equal,
    Enter,
}

impl KeypadKey {
    fn name(self) -> String {
        match self {
            KeypadKey::Digit(d) => format!("kp_{d}"),
            KeypadKey::Multiply => "kp_multiply".to_string(),
            KeypadKey::Add => "kp_add".to_string(),
            KeypadKey::Separator => "kp_separator".to_string(),
            KeypadKey::Subtract => "kp_subtract".to_string(),
            KeypadKey::Decimal => "kp_decimal".to_string(),
            KeypadKey::Divide => "kp_divide".to_string(),
            KeypadKey::Equal => "kp_equal".to_string(),
            KeypadKey::Enter => "kp_enter".to_string(),
        }
    }

    /// Keypad key for an SS3 (`ESC O x`) final character
    pub fn from_ss3(c: char) -> Option<Self> {
        Some(match c {
            'p'..='y' => KeypadKey::Digit(c as u8 - b'p'),
            'j' => KeypadKey::Multiply,
            'k' => KeypadKey::Add,
            'l' => KeypadKey::Separator,
            'm' => KeypadKey::Subtract,
            'n' => KeypadKey::Decimal,
            'o' => KeypadKey::Divide,
            'X' => KeypadKey::Equal,
            'M' => KeypadKey::Enter,
            _ => return None,
        })
    }
}

/// A logical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Centre of the keypad (`kb2`)
    Begin,
    Backspace,
    Tab,
    BackTab,
    Enter,
    Escape,
    /// Function key, numbered from 1
    F(u8),
    Keypad(KeypadKey),
}

impl Key {
    fn name(self) -> String {
        match self {
            Key::Up => "up".to_string(),
            Key::Down => "down".to_string(),
            Key::Left => "left".to_string(),
            Key::Right => "right".to_string(),
            Key::Home => "home".to_string(),
            Key::End => "end".to_string(),
            Key::Insert => "insert".to_string(),
            Key::Delete => "delete".to_string(),
            Key::PageUp => "pgup".to_string(),
            Key::PageDown => "pgdown".to_string(),
            Key::Begin => "begin".to_string(),
            Key::Backspace => "backspace".to_string(),
            Key::Tab => "tab".to_string(),
            Key::BackTab => "btab".to_string(),
            Key::Enter => "enter".to_string(),
            Key::Escape => "escape".to_string(),
            Key::F(n) => format!("f{n}"),
            Key::Keypad(k) => k.name(),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "home" => Key::Home,
            "end" => Key::End,
            "insert" => Key::Insert,
            "delete" => Key::Delete,
            "pgup" => Key::PageUp,
            "pgdown" => Key::PageDown,
            "begin" => Key::Begin,
            "backspace" => Key::Backspace,
            "tab" => Key::Tab,
            "btab" => Key::BackTab,
            "enter" => Key::Enter,
            "escape" => Key::Escape,
            "kp_multiply" => Key::Keypad(KeypadKey::Multiply),
            "kp_add" => Key::Keypad(KeypadKey::Add),
            "kp_separator" => Key::Keypad(KeypadKey::Separator),
            "kp_subtract" => Key::Keypad(KeypadKey::Subtract),
            "kp_decimal" => Key::Keypad(KeypadKey::Decimal),
            "kp_divide" => Key::Keypad(KeypadKey::Divide),
            "kp_equal" => Key::Keypad(KeypadKey::Equal),
            "kp_enter" => Key::Keypad(KeypadKey::Enter),
            _ => {
                if let Some(digit) = name.strip_prefix("kp_") {
                    let d: u8 = digit.parse().ok()?;
                    return (d <= 9 && digit.len() == 1).then_some(Key::Keypad(KeypadKey::Digit(d)));
                }
                let n: u8 = name.strip_prefix('f')?.parse().ok()?;
                return (1..=MAX_FUNCTION_KEY).contains(&n).then_some(Key::F(n));
            }
        };
        Some(key)
    }

    /// Key named by the final character of a CSI or SS3 cursor-style sequence
    pub fn from_final(c: char) -> Option<Self> {
        Some(match c {
            'A' => Key::Up,
            'B' => Key::Down,
            'C' => Key::Right,
            'D' => Key::Left,
            'H' => Key::Home,
            'F' => Key::End,
            'E' => Key::Begin,
            'P' => Key::F(1),
            'Q' => Key::F(2),
            'R' => Key::F(3),
            'S' => Key::F(4),
            _ => return None,
        })
    }

    /// Key named by the first parameter of a VT220 `CSI n ~` sequence
    pub fn from_tilde_number(n: u32) -> Option<Self> {
        Some(match n {
            1 | 7 => Key::Home,
            2 => Key::Insert,
            3 => Key::Delete,
            4 | 8 => Key::End,
            5 => Key::PageUp,
            6 => Key::PageDown,
            11..=15 => Key::F((n - 10) as u8),
            17..=21 => Key::F((n - 11) as u8),
            23..=26 => Key::F((n - 12) as u8),
            28 | 29 => Key::F((n - 13) as u8),
            31..=34 => Key::F((n - 14) as u8),
            _ => return None,
        })
    }

    /// Terminfo family prefix used by the shifted and extended modifier codes
    /// (`kLFT`, `kUP5`, `kHOM6`, ...)
    fn modified_family(self) -> Option<&'static str> {
        Some(match self {
            Key::Up => "kUP",
            Key::Down => "kDN",
            Key::Left => "kLFT",
            Key::Right => "kRIT",
            Key::Home => "kHOM",
            Key::End => "kEND",
            Key::Insert => "kIC",
            Key::Delete => "kDC",
            Key::PageUp => "kPRV",
            Key::PageDown => "kNXT",
            _ => return None,
        })
    }
}

/// Symbolic capability name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// A key press, possibly with modifiers
    Key(Key, KeyModifiers),
    MouseReport,
    CursorReport,
    FocusIn,
    FocusOut,
    PasteBegin,
    PasteEnd,
}

impl Capability {
    /// Unmodified key
    pub const fn key(key: Key) -> Self {
        Capability::Key(key, KeyModifiers::NONE)
    }

    pub fn key_code(&self) -> Option<Key> {
        match self {
            Capability::Key(key, _) => Some(*key),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> KeyModifiers {
        match self {
            Capability::Key(_, modifiers) => *modifiers,
            _ => KeyModifiers::NONE,
        }
    }

    /// Primary terminfo code for this capability, if it has one
    pub fn terminfo_name(&self) -> Option<String> {
        terminfo_names(*self).into_iter().next()
    }

    /// Capability for a terminfo key code
    pub fn from_terminfo_name(code: &str) -> Option<Self> {
        terminfo_key_codes()
            .into_iter()
            .find_map(|(name, cap)| (name == code).then_some(cap))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Key(key, modifiers) => {
                f.write_str("key_")?;
                for (flag, name) in MODIFIER_NAMES {
                    if modifiers.contains(*flag) {
                        write!(f, "{name}_")?;
                    }
                }
                f.write_str(&key.name())
            }
            Capability::MouseReport => f.write_str("mouse_report"),
            Capability::CursorReport => f.write_str("cursor_report"),
            Capability::FocusIn => f.write_str("focus_in"),
            Capability::FocusOut => f.write_str("focus_out"),
            Capability::PasteBegin => f.write_str("paste_begin"),
            Capability::PasteEnd => f.write_str("paste_end"),
        }
    }
}

impl FromStr for Capability {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cap = match s {
            "mouse_report" => Capability::MouseReport,
            "cursor_report" => Capability::CursorReport,
            "focus_in" => Capability::FocusIn,
            "focus_out" => Capability::FocusOut,
            "paste_begin" => Capability::PasteBegin,
            "paste_end" => Capability::PasteEnd,
            _ => {
                let unknown = || TerminalError::UnknownCapability(s.to_string());
                let mut rest = s.strip_prefix("key_").ok_or_else(unknown)?;
                let mut modifiers = KeyModifiers::NONE;
                for (flag, name) in MODIFIER_NAMES {
                    if let Some(tail) = rest
                        .strip_prefix(name)
                        .and_then(|tail| tail.strip_prefix('_'))
                    {
                        modifiers |= *flag;
                        rest = tail;
                    }
                }
                let key = Key::from_name(rest).ok_or_else(unknown)?;
                Capability::Key(key, modifiers)
            }
        };
        Ok(cap)
    }
}

/// Modifier prefixes in canonical name order
const MODIFIER_NAMES: &[(KeyModifiers, &str)] = &[
    (KeyModifiers::CONTROL, "ctrl"),
    (KeyModifiers::ALT, "alt"),
    (KeyModifiers::SHIFT, "shift"),
    (KeyModifiers::META, "meta"),
];

/// Decode an xterm modifier parameter (`1 + bits`)
pub fn modifiers_from_param(param: u32) -> KeyModifiers {
    let bits = param.saturating_sub(1);
    let mut modifiers = KeyModifiers::NONE;
    if bits & 1 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if bits & 2 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if bits & 4 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }
    if bits & 8 != 0 {
        modifiers |= KeyModifiers::META;
    }
    modifiers
}

/// Encode modifiers as an xterm modifier parameter
pub fn modifiers_to_param(modifiers: KeyModifiers) -> u32 {
    let mut bits = 0;
    if modifiers.contains(KeyModifiers::SHIFT) {
        bits |= 1;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        bits |= 2;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        bits |= 4;
    }
    if modifiers.contains(KeyModifiers::META) {
        bits |= 8;
    }
    bits + 1
}

fn terminfo_names(cap: Capability) -> Vec<String> {
    let (key, modifiers) = match cap {
        Capability::Key(key, modifiers) => (key, modifiers),
        Capability::MouseReport => return vec!["kmous".to_string()],
        Capability::CursorReport => return vec!["u6".to_string()],
        Capability::FocusIn => return vec!["kxIN".to_string()],
        Capability::FocusOut => return vec!["kxOUT".to_string()],
        Capability::PasteBegin => return vec!["PS".to_string()],
        Capability::PasteEnd => return vec!["PE".to_string()],
    };

    if modifiers.is_empty() {
        let code = match key {
            Key::Up => "kcuu1",
            Key::Down => "kcud1",
            Key::Left => "kcub1",
            Key::Right => "kcuf1",
            Key::Home => "khome",
            Key::End => "kend",
            Key::Insert => "kich1",
            Key::Delete => "kdch1",
            Key::PageUp => "kpp",
            Key::PageDown => "knp",
            Key::Begin => "kb2",
            Key::Backspace => "kbs",
            Key::BackTab => "kcbt",
            Key::Keypad(KeypadKey::Enter) => "kent",
            Key::F(n) => return vec![format!("kf{n}")],
            _ => return Vec::new(),
        };
        return vec![code.to_string()];
    }

    let Some(family) = key.modified_family() else {
        return Vec::new();
    };
    let param = modifiers_to_param(modifiers);
    let mut names = Vec::new();
    if modifiers == KeyModifiers::SHIFT {
        names.push(match key {
            Key::Up => "kri".to_string(),
            Key::Down => "kind".to_string(),
            _ => family.to_string(),
        });
    }
    if (2..=8).contains(&param) {
        names.push(format!("{family}{param}"));
    }
    names
}

/// Every terminfo key code this crate understands, with its capability.
///
/// Only codes in the terminfo key namespace (a leading `k`) are listed.
pub fn terminfo_key_codes() -> Vec<(String, Capability)> {
    let mut keys = vec![
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Home,
        Key::End,
        Key::Insert,
        Key::Delete,
        Key::PageUp,
        Key::PageDown,
        Key::Begin,
        Key::Backspace,
        Key::BackTab,
        Key::Keypad(KeypadKey::Enter),
    ];
    keys.extend((1..=MAX_FUNCTION_KEY).map(Key::F));

    let mut codes = Vec::new();
    for key in keys {
        let mut caps = vec![Capability::key(key)];
        if key.modified_family().is_some() {
            caps.extend((2..=8).map(|param| Capability::Key(key, modifiers_from_param(param))));
        }
        for cap in caps {
            codes.extend(terminfo_names(cap).into_iter().map(|name| (name, cap)));
        }
    }
    codes.push(("kxIN".to_string(), Capability::FocusIn));
    codes.push(("kxOUT".to_string(), Capability::FocusOut));
    codes
}
