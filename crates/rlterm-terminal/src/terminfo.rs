//! Terminal capability database access
//!
//! The decoder only needs a key-value view of the terminal's capabilities.
//! `Terminfo` provides one, either built in memory or parsed from terminfo
//! source text as printed by `infocmp`.

use crate::TerminalError;
use std::collections::{HashMap, HashSet};
use std::process::Command;
use tracing::debug;

/// Key-value query surface over a terminal capability database
pub trait CapabilityDatabase {
    /// Boolean capability
    fn get_flag(&self, name: &str) -> bool;

    /// Numeric capability
    fn get_num(&self, name: &str) -> Option<u32>;

    /// String capability as raw bytes
    fn get_str(&self, name: &str) -> Option<&[u8]>;
}

/// In-memory terminfo entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Terminfo {
    names: Vec<String>,
    flags: HashSet<String>,
    numbers: HashMap<String, u32>,
    strings: HashMap<String, Vec<u8>>,
}

impl Terminfo {
    /// Create an empty entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal names from the entry header, primary name first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn with_flag(mut self, name: &str) -> Self {
        self.flags.insert(name.to_string());
        self
    }

    pub fn with_num(mut self, name: &str, value: u32) -> Self {
        self.numbers.insert(name.to_string(), value);
        self
    }

    pub fn with_str(mut self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.strings.insert(name.to_string(), value.into());
        self
    }

    /// Iterate over every string capability
    pub fn strings(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.strings.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Parse terminfo source text (the format printed by `infocmp`)
    pub fn parse_source(source: &str) -> Result<Self, TerminalError> {
        let body: String = source
            .lines()
            .filter(|line| {
                let trimmed = line.trim_start();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut fields = split_fields(&body).into_iter();
        let header = fields
            .next()
            .ok_or_else(|| TerminalError::Database("empty terminfo source".to_string()))?;

        let mut info = Terminfo {
            names: header.split('|').map(|n| n.trim().to_string()).collect(),
            ..Default::default()
        };

        for field in fields {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }

            if let Some(name) = field.strip_suffix('@') {
                info.flags.remove(name);
                info.numbers.remove(name);
                info.strings.remove(name);
            } else if let Some((name, value)) = field.split_once('=') {
                info.strings.insert(name.to_string(), unescape(value));
            } else if let Some((name, value)) = field.split_once('#') {
                let number = parse_number(value).ok_or_else(|| {
                    TerminalError::Database(format!("invalid number for {name}: {value}"))
                })?;
                info.numbers.insert(name.to_string(), number);
            } else {
                info.flags.insert(field.to_string());
            }
        }

        debug!(
            "Parsed terminfo entry {:?}: {} flags, {} numbers, {} strings",
            info.names.first(),
            info.flags.len(),
            info.numbers.len(),
            info.strings.len()
        );
        Ok(info)
    }

    /// Query the system terminfo database through `infocmp`
    pub fn query(term: &str) -> Result<Self, TerminalError> {
        let output = Command::new("infocmp").args(["-1", "-x", term]).output()?;
        if !output.status.success() {
            return Err(TerminalError::Database(format!(
                "infocmp {term} failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Self::parse_source(std::str::from_utf8(&output.stdout)?)
    }

    /// Query the entry named by `$TERM`
    pub fn from_env() -> Result<Self, TerminalError> {
        let term = std::env::var("TERM")
            .map_err(|_| TerminalError::Database("TERM is not set".to_string()))?;
        Self::query(&term)
    }
}

impl CapabilityDatabase for Terminfo {
    fn get_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    fn get_num(&self, name: &str) -> Option<u32> {
        self.numbers.get(name).copied()
    }

    fn get_str(&self, name: &str) -> Option<&[u8]> {
        self.strings.get(name).map(Vec::as_slice)
    }
}

/// Split on commas that are not escaped with a backslash
fn split_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ',' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        fields.push(current);
    }
    fields
}

fn parse_number(value: &str) -> Option<u32> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if value.len() > 1 && value.starts_with('0') {
        u32::from_str_radix(&value[1..], 8).ok()
    } else {
        value.parse().ok()
    }
}

/// Decode terminfo string escapes into raw bytes
fn unescape(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(b'\\');
                    break;
                };
                match next {
                    'E' | 'e' => out.push(0x1b),
                    'n' | 'l' => out.push(b'\n'),
                    'r' => out.push(b'\r'),
                    't' => out.push(b'\t'),
                    'b' => out.push(0x08),
                    'f' => out.push(0x0c),
                    's' => out.push(b' '),
                    '0'..='7' => {
                        let mut value = next.to_digit(8).unwrap_or(0);
                        for _ in 0..2 {
                            match chars.peek().and_then(|d| d.to_digit(8)) {
                                Some(digit) => {
                                    value = value * 8 + digit;
                                    chars.next();
                                }
                                None => break,
                            }
                        }
                        // NUL is stored as \200 in terminfo strings
                        out.push(if value == 0 { 0x80 } else { value as u8 });
                    }
                    other => out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes()),
                }
            }
            '^' => match chars.next() {
                Some('?') => out.push(0x7f),
                Some(ctl) => out.push((ctl as u8) & 0x1f),
                None => out.push(b'^'),
            },
            other => out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const XTERM_SOURCE: &str = r"#	Reconstructed via infocmp from file: /usr/share/terminfo/x/xterm
xterm|xterm terminal emulator (X Window System),
	am,
	km,
	colors#8,
	cols#80,
	it#0x8,
	lines#024,
	bel=^G,
	kbs=^?,
	kcuu1=\EOA,
	kf1=\EOP,
	kmous=\E[<,
	sep=\,,
	u6=\E[%i%d;%dR,
	null=\0,
	oct=\101\033,
	xon@,
	kUP5=\E[1;5A,
";

    #[test]
    fn test_parse_source_sections() {
        let info = Terminfo::parse_source(XTERM_SOURCE).unwrap();

        assert_eq!(info.names()[0], "xterm");
        assert!(info.get_flag("am"));
        assert!(info.get_flag("km"));
        assert!(!info.get_flag("xon"));
        assert_eq!(info.get_num("colors"), Some(8));
        assert_eq!(info.get_num("it"), Some(8));
        assert_eq!(info.get_num("lines"), Some(20));
        assert_eq!(info.get_num("missing"), None);
    }

    #[test]
    fn test_parse_source_escapes() {
        let info = Terminfo::parse_source(XTERM_SOURCE).unwrap();

        assert_eq!(info.get_str("bel"), Some(&b"\x07"[..]));
        assert_eq!(info.get_str("kbs"), Some(&b"\x7f"[..]));
        assert_eq!(info.get_str("kcuu1"), Some(&b"\x1bOA"[..]));
        assert_eq!(info.get_str("kmous"), Some(&b"\x1b[<"[..]));
        assert_eq!(info.get_str("sep"), Some(&b","[..]));
        assert_eq!(info.get_str("u6"), Some(&b"\x1b[%i%d;%dR"[..]));
        assert_eq!(info.get_str("null"), Some(&b"\x80"[..]));
        assert_eq!(info.get_str("oct"), Some(&b"A\x1b"[..]));
        assert_eq!(info.get_str("kUP5"), Some(&b"\x1b[1;5A"[..]));
    }

    #[test]
    fn test_cancelled_capability_removed() {
        let info = Terminfo::parse_source("t|test,\n\tkf1=\\EOP,\n\tkf1@,\n").unwrap();
        assert_eq!(info.get_str("kf1"), None);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = Terminfo::parse_source("t|test,\n\tcols#eighty,\n").unwrap_err();
        assert!(err.to_string().contains("cols"));
    }

    #[test]
    fn test_empty_source_is_an_error() {
        assert!(Terminfo::parse_source("# only a comment\n").is_err());
    }

    #[test]
    fn test_builder() {
        let info = Terminfo::new()
            .with_flag("am")
            .with_num("cols", 132)
            .with_str("kcuu1", "\x1bOA");
        assert!(info.get_flag("am"));
        assert_eq!(info.get_num("cols"), Some(132));
        assert_eq!(info.get_str("kcuu1"), Some(&b"\x1bOA"[..]));
        assert_eq!(info.strings().count(), 1);
    }
}
