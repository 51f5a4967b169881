//! Decoder configuration

use crate::text::Encoding;

/// How the key sequence table is matched against buffered input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum MatchStrategy {
    /// Match the longest table sequence that prefixes the remaining input
    #[default]
    #[cfg_attr(feature = "clap", value(name = "longest-prefix"))]
    LongestPrefix,
    /// Only match when the remaining input equals a table sequence exactly.
    ///
    /// A known sequence followed by more input in the same read falls
    /// through to the pattern grammars or to literal characters.
    #[cfg_attr(feature = "clap", value(name = "whole-buffer"))]
    WholeBuffer,
}

/// What happens to an ambiguous fragment at the end of a parse call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum PartialInput {
    /// Resolve everything; a trailing lone ESC becomes an Escape key press
    #[default]
    #[cfg_attr(feature = "clap", value(name = "flush"))]
    Flush,
    /// Keep a fragment that may still grow into a longer sequence until the
    /// next parse call or an explicit flush
    #[cfg_attr(feature = "clap", value(name = "retain"))]
    Retain,
}

/// Coordinate origin of cursor position reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CursorOrigin {
    /// Decrement when the report format carries the `%i` marker
    #[default]
    #[cfg_attr(feature = "clap", value(name = "detect"))]
    Detect,
    /// Report coordinates exactly as received
    #[cfg_attr(feature = "clap", value(name = "raw"))]
    Raw,
    /// Always decrement both coordinates by one
    #[cfg_attr(feature = "clap", value(name = "decrement"))]
    Decrement,
}

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderConfig {
    /// Encoding used for capability strings from the terminal database
    pub encoding: Encoding,
    pub match_strategy: MatchStrategy,
    pub partial_input: PartialInput,
    pub cursor_origin: CursorOrigin,
}

impl DecoderConfig {
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    pub fn with_partial_input(mut self, partial_input: PartialInput) -> Self {
        self.partial_input = partial_input;
        self
    }

    pub fn with_cursor_origin(mut self, origin: CursorOrigin) -> Self {
        self.cursor_origin = origin;
        self
    }

    /// Whether cursor report coordinates are decremented, given what the
    /// keymap learned about the report format
    pub fn decrement_cursor_report(&self, format_one_based: bool) -> bool {
        match self.cursor_origin {
            CursorOrigin::Detect => format_one_based,
            CursorOrigin::Raw => false,
            CursorOrigin::Decrement => true,
        }
    }
}
