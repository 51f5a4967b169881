//! Incremental decoding of raw terminal input into text

use crate::TerminalError;
use std::fmt;
use std::str::FromStr;

/// Text encoding of the terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Encoding {
    #[default]
    #[cfg_attr(feature = "clap", value(name = "utf-8", alias = "utf8"))]
    Utf8,
    #[cfg_attr(feature = "clap", value(name = "latin-1", aliases = ["latin1", "iso-8859-1"]))]
    Latin1,
}

impl Encoding {
    /// Decode a complete byte string, replacing invalid input
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("utf-8"),
            Encoding::Latin1 => f.write_str("latin-1"),
        }
    }
}

impl FromStr for Encoding {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(TerminalError::InvalidEncoding(s.to_string())),
        }
    }
}

/// Stateful decoder for input that arrives in arbitrary chunks.
///
/// A UTF-8 code point split across two reads is held back until the rest
/// of it arrives.
#[derive(Debug, Default)]
pub struct TextDecoder {
    encoding: Encoding,
    partial: Vec<u8>,
}

impl TextDecoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            partial: Vec::new(),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Bytes held back waiting for the end of a code point
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }

    /// Decode the next chunk of input
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        if self.encoding == Encoding::Latin1 {
            return Encoding::Latin1.decode(bytes);
        }

        self.partial.extend_from_slice(bytes);
        let mut output = String::with_capacity(self.partial.len());
        let mut rest = self.partial.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    output.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    output.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            output.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated code point at the end of the chunk
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.partial = rest.to_vec();
        output
    }

    /// Give up on a held-back partial code point
    pub fn finish(&mut self) -> String {
        let partial = std::mem::take(&mut self.partial);
        self.encoding.decode(&partial)
    }
}
