//! Variable-length input sequence grammars
//!
//! The key table can only hold fixed strings. Reports that carry numbers
//! (cursor position, mouse) and the open-ended families of modified keys are
//! recognized here by small prefix parsers. Each parser looks only at the
//! start of the remaining input and reports exactly how many bytes it
//! consumed, so whatever follows stays available for the next token.

use crate::capability::{modifiers_from_param, Capability, Key, KeypadKey};
use crate::keymap::Keymap;
use crate::sequence::{CursorPosition, Fields, MouseProtocol, MouseReport};
use crate::ESC;
use crossterm::event::KeyModifiers;
use std::fmt;

/// Longest decimal field any grammar accepts
const MAX_DIGITS: usize = 5;

/// Bias added by terminals to X10 and URXVT button codes and X10 coordinates
const MOUSE_BIAS: u32 = 32;

/// Result of trying one grammar against the start of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    /// The input cannot start this sequence
    NoMatch,
    /// The input is a proper prefix of this sequence
    Incomplete,
    Matched {
        /// Bytes consumed from the start of the input
        len: usize,
        capability: Option<Capability>,
        fields: Option<Fields>,
    },
}

/// Session facts a grammar may depend on
#[derive(Debug, Clone, Copy)]
pub struct PatternContext<'a> {
    pub keymap: &'a Keymap,
    /// Decrement cursor report coordinates by one
    pub decrement_cursor: bool,
}

/// A grammar recognizing a family of variable-length sequences
pub trait SequencePattern: fmt::Debug {
    fn name(&self) -> &'static str;

    fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match;
}

/// Ordered collection of grammars; the first match wins
#[derive(Debug)]
pub struct PatternSet {
    patterns: Vec<Box<dyn SequencePattern>>,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatternSet {
    /// An empty set
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// The built-in grammars in priority order
    pub fn standard() -> Self {
        Self {
            patterns: vec![
                Box::new(CsiLetter),
                Box::new(CsiNumeric),
                Box::new(CursorReport),
                Box::new(X10Mouse),
                Box::new(SgrMouse),
                Box::new(UrxvtMouse),
            ],
        }
    }

    /// Append a grammar with the lowest priority
    pub fn push(&mut self, pattern: Box<dyn SequencePattern>) {
        self.patterns.push(pattern);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|p| p.name()).collect()
    }

    /// Try every grammar in order.
    ///
    /// When the matched text is itself in the key table, the table's
    /// capability takes precedence over the grammar's.
    pub fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match {
        let mut incomplete = false;
        for pattern in &self.patterns {
            match pattern.try_match(input, ctx) {
                Match::Matched {
                    len,
                    capability,
                    fields,
                } => {
                    return match ctx.keymap.lookup(&input[..len]) {
                        Some(cap) => Match::Matched {
                            len,
                            capability: Some(cap),
                            fields: fields.or_else(|| Fields::for_capability(cap)),
                        },
                        None => Match::Matched {
                            len,
                            capability,
                            fields,
                        },
                    };
                }
                Match::Incomplete => incomplete = true,
                Match::NoMatch => {}
            }
        }
        if incomplete {
            Match::Incomplete
        } else {
            Match::NoMatch
        }
    }
}

/// Why a scan stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Incomplete,
    NoMatch,
}

impl From<Stop> for Match {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Incomplete => Match::Incomplete,
            Stop::NoMatch => Match::NoMatch,
        }
    }
}

type Scan<T> = Result<T, Stop>;

/// Character cursor over the input
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Scan<char> {
        let c = self.peek().ok_or(Stop::Incomplete)?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn eat(&mut self, expected: char) -> Scan<()> {
        match self.peek() {
            None => Err(Stop::Incomplete),
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(_) => Err(Stop::NoMatch),
        }
    }

    fn eat_str(&mut self, expected: &str) -> Scan<()> {
        expected.chars().try_for_each(|c| self.eat(c))
    }

    /// Decimal field of one to `MAX_DIGITS` digits
    fn number(&mut self) -> Scan<u32> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            if self.pos - start == MAX_DIGITS {
                return Err(Stop::NoMatch);
            }
            self.pos += 1;
        }
        let digits = &self.input[start..self.pos];
        if digits.is_empty() {
            return Err(if self.peek().is_none() {
                Stop::Incomplete
            } else {
                Stop::NoMatch
            });
        }
        if self.peek().is_none() {
            return Err(Stop::Incomplete);
        }
        match digits.parse() {
            Ok(value) => Ok(value),
            Err(err) => panic!("decimal field {digits:?} admitted by the grammar failed to parse: {err}"),
        }
    }

    fn matched(self, capability: Option<Capability>, fields: Option<Fields>) -> Match {
        Match::Matched {
            len: self.pos,
            capability,
            fields,
        }
    }
}

fn key_match(scanner: Scanner<'_>, key: Option<Key>, modifiers: KeyModifiers) -> Match {
    let capability = key.map(|key| Capability::Key(key, modifiers));
    let fields = capability.and_then(Fields::for_capability);
    scanner.matched(capability, fields)
}

/// `ESC [ letter`, `ESC O letter`, `ESC O digit letter` and `ESC ? letter`
#[derive(Debug, Clone, Copy)]
pub struct CsiLetter;

impl CsiLetter {
    fn scan(input: &str, ctx: &PatternContext<'_>) -> Scan<Match> {
        let mut s = Scanner::new(input);
        s.eat(ESC)?;
        let intro = s.bump()?;
        if !matches!(intro, '[' | 'O' | '?') {
            return Err(Stop::NoMatch);
        }

        let mut modifiers = KeyModifiers::NONE;
        let mut c = s.bump()?;
        if intro == 'O' && c.is_ascii_digit() {
            modifiers = modifiers_from_param(c.to_digit(10).unwrap_or(1));
            c = s.bump()?;
        }
        if !c.is_ascii_alphabetic() {
            return Err(Stop::NoMatch);
        }
        if intro == '[' && c == 'M' && ctx.keymap.is_mouse_lead(&input[..s.pos]) {
            return Err(Stop::NoMatch);
        }

        let key = match intro {
            '[' => match c {
                'Z' => Some(Key::BackTab),
                'I' => return Ok(s.matched(Some(Capability::FocusIn), None)),
                'O' => return Ok(s.matched(Some(Capability::FocusOut), None)),
                _ => Key::from_final(c),
            },
            'O' => Key::from_final(c).or_else(|| KeypadKey::from_ss3(c).map(Key::Keypad)),
            _ => KeypadKey::from_ss3(c).map(Key::Keypad),
        };
        Ok(key_match(s, key, modifiers))
    }
}

impl SequencePattern for CsiLetter {
    fn name(&self) -> &'static str {
        "csi-letter"
    }

    fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match {
        Self::scan(input, ctx).unwrap_or_else(Match::from)
    }
}

/// `ESC [ n [; m] t` with `t` one of `~ ^ $ @` or a letter
#[derive(Debug, Clone, Copy)]
pub struct CsiNumeric;

impl CsiNumeric {
    fn scan(input: &str, ctx: &PatternContext<'_>) -> Scan<Match> {
        let mut s = Scanner::new(input);
        s.eat_str("\x1b[")?;
        let first = s.number()?;
        let second = if s.peek() == Some(';') {
            s.bump()?;
            Some(s.number()?)
        } else {
            None
        };

        let terminator = s.bump()?;
        let mut modifiers = second.map(modifiers_from_param).unwrap_or(KeyModifiers::NONE);
        let key = match terminator {
            '~' => match first {
                200 => return Ok(s.matched(Some(Capability::PasteBegin), None)),
                201 => return Ok(s.matched(Some(Capability::PasteEnd), None)),
                n => Key::from_tilde_number(n),
            },
            '^' | '$' | '@' => {
                modifiers |= match terminator {
                    '^' => KeyModifiers::CONTROL,
                    '$' => KeyModifiers::SHIFT,
                    _ => KeyModifiers::CONTROL | KeyModifiers::SHIFT,
                };
                Key::from_tilde_number(first)
            }
            // Two-parameter R is a cursor position report
            'R' if second.is_some() => return Err(Stop::NoMatch),
            'Z' => Some(Key::BackTab),
            'M' if second.is_none() && ctx.keymap.is_mouse_lead(&input[..s.pos]) => {
                return Err(Stop::NoMatch)
            }
            c if c.is_ascii_alphabetic() => Key::from_final(c),
            _ => return Err(Stop::NoMatch),
        };
        Ok(key_match(s, key, modifiers))
    }
}

impl SequencePattern for CsiNumeric {
    fn name(&self) -> &'static str {
        "csi-numeric"
    }

    fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match {
        Self::scan(input, ctx).unwrap_or_else(Match::from)
    }
}

/// `ESC [ row ; column R`
#[derive(Debug, Clone, Copy)]
pub struct CursorReport;

impl CursorReport {
    fn scan(input: &str, ctx: &PatternContext<'_>) -> Scan<Match> {
        let mut s = Scanner::new(input);
        s.eat_str("\x1b[")?;
        let mut row = s.number()?;
        s.eat(';')?;
        let mut column = s.number()?;
        s.eat('R')?;

        if ctx.decrement_cursor {
            row = row.saturating_sub(1);
            column = column.saturating_sub(1);
        }
        let fields = Fields::Cursor(CursorPosition { row, column });
        Ok(s.matched(Some(Capability::CursorReport), Some(fields)))
    }
}

impl SequencePattern for CursorReport {
    fn name(&self) -> &'static str {
        "cursor-report"
    }

    fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match {
        Self::scan(input, ctx).unwrap_or_else(Match::from)
    }
}

/// Legacy mouse report: a lead marker followed by three raw characters
/// (button, column, row), each biased by 32
#[derive(Debug, Clone, Copy)]
pub struct X10Mouse;

impl X10Mouse {
    fn scan(input: &str, ctx: &PatternContext<'_>) -> Scan<Match> {
        let mut incomplete = false;
        for lead in ctx.keymap.mouse_leads() {
            if lead.starts_with(input) {
                incomplete = true;
                continue;
            }
            if !input.starts_with(lead.as_str()) {
                continue;
            }

            let mut s = Scanner::new(input);
            s.pos = lead.len();
            let mut raw = [0u32; 3];
            for value in &mut raw {
                *value = u32::from(s.bump()?).saturating_sub(MOUSE_BIAS);
            }
            let [code, column, row] = raw;
            let report = MouseReport::from_code(MouseProtocol::X10, code, column, row, None);
            return Ok(s.matched(Some(Capability::MouseReport), Some(Fields::Mouse(report))));
        }
        Err(if incomplete {
            Stop::Incomplete
        } else {
            Stop::NoMatch
        })
    }
}

impl SequencePattern for X10Mouse {
    fn name(&self) -> &'static str {
        "x10-mouse"
    }

    fn try_match(&self, input: &str, ctx: &PatternContext<'_>) -> Match {
        Self::scan(input, ctx).unwrap_or_else(Match::from)
    }
}

/// Reads `b ; x ; y` shared by the extended mouse encodings
fn mouse_fields(s: &mut Scanner<'_>) -> Scan<(u32, u32, u32)> {
    let button = s.number()?;
    s.eat(';')?;
    let column = s.number()?;
    s.eat(';')?;
    let row = s.number()?;
    Ok((button, column, row))
}

/// SGR extended mouse report `ESC [ < b ; x ; y (M|m)`
#[derive(Debug, Clone, Copy)]
pub struct SgrMouse;

impl SgrMouse {
    fn scan(input: &str) -> Scan<Match> {
        let mut s = Scanner::new(input);
        s.eat_str("\x1b[<")?;
        let (code, column, row) = mouse_fields(&mut s)?;
        let pressed = match s.bump()? {
            'M' => true,
            'm' => false,
            _ => return Err(Stop::NoMatch),
        };
        let report = MouseReport::from_code(MouseProtocol::Sgr, code, column, row, Some(pressed));
        Ok(s.matched(Some(Capability::MouseReport), Some(Fields::Mouse(report))))
    }
}

impl SequencePattern for SgrMouse {
    fn name(&self) -> &'static str {
        "sgr-mouse"
    }

    fn try_match(&self, input: &str, _ctx: &PatternContext<'_>) -> Match {
        Self::scan(input).unwrap_or_else(Match::from)
    }
}

/// URXVT extended mouse report `ESC [ b ; x ; y M`
#[derive(Debug, Clone, Copy)]
pub struct UrxvtMouse;

impl UrxvtMouse {
    fn scan(input: &str) -> Scan<Match> {
        let mut s = Scanner::new(input);
        s.eat_str("\x1b[")?;
        let (code, column, row) = mouse_fields(&mut s)?;
        s.eat('M')?;
        let code = code.saturating_sub(MOUSE_BIAS);
        let report = MouseReport::from_code(MouseProtocol::Urxvt, code, column, row, None);
        Ok(s.matched(Some(Capability::MouseReport), Some(Fields::Mouse(report))))
    }
}

impl SequencePattern for UrxvtMouse {
    fn name(&self) -> &'static str {
        "urxvt-mouse"
    }

    fn try_match(&self, input: &str, _ctx: &PatternContext<'_>) -> Match {
        Self::scan(input).unwrap_or_else(Match::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(keymap: &Keymap) -> PatternContext<'_> {
        PatternContext {
            keymap,
            decrement_cursor: false,
        }
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            PatternSet::standard().names(),
            vec![
                "csi-letter",
                "csi-numeric",
                "cursor-report",
                "x10-mouse",
                "sgr-mouse",
                "urxvt-mouse"
            ]
        );
    }

    #[test]
    fn test_match_reports_consumed_length_only() {
        let keymap = Keymap::defaults();
        let m = CsiNumeric.try_match("\x1b[1;5Dtail", &ctx(&keymap));
        assert_eq!(
            m,
            Match::Matched {
                len: 6,
                capability: Some(Capability::Key(Key::Left, KeyModifiers::CONTROL)),
                fields: Some(Fields::Key {
                    modifiers: KeyModifiers::CONTROL
                }),
            }
        );
    }

    #[test]
    fn test_incomplete_prefixes() {
        let keymap = Keymap::defaults();
        let c = ctx(&keymap);
        assert_eq!(CsiLetter.try_match("\x1b", &c), Match::Incomplete);
        assert_eq!(CsiLetter.try_match("\x1bO5", &c), Match::Incomplete);
        assert_eq!(CursorReport.try_match("\x1b[24;8", &c), Match::Incomplete);
        assert_eq!(SgrMouse.try_match("\x1b[<0;10", &c), Match::Incomplete);
        assert_eq!(X10Mouse.try_match("\x1b[M !", &c), Match::Incomplete);
        assert_eq!(X10Mouse.try_match("\x1b[", &c), Match::Incomplete);
    }

    #[test]
    fn test_grammars_are_disjoint() {
        let keymap = Keymap::defaults();
        let c = ctx(&keymap);
        assert_eq!(CsiLetter.try_match("\x1b[M !!", &c), Match::NoMatch);
        assert_eq!(CsiNumeric.try_match("\x1b[24;80R", &c), Match::NoMatch);
        assert_eq!(CsiNumeric.try_match("\x1b[0;10;20M", &c), Match::NoMatch);
        assert_eq!(UrxvtMouse.try_match("\x1b[<0;10;20M", &c), Match::NoMatch);
    }

    #[test]
    fn test_overlong_number_rejected() {
        let keymap = Keymap::defaults();
        assert_eq!(
            CursorReport.try_match("\x1b[123456;1R", &ctx(&keymap)),
            Match::NoMatch
        );
    }

    #[test]
    fn test_unknown_final_is_well_formed_but_unresolved() {
        let keymap = Keymap::defaults();
        let m = PatternSet::standard().try_match("\x1b[5z", &ctx(&keymap));
        assert_eq!(
            m,
            Match::Matched {
                len: 4,
                capability: None,
                fields: None
            }
        );
    }
}
