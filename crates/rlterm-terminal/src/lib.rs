//! Terminal input/output protocol layer for rlterm
//!
//! Decodes raw terminal input into key, mouse, focus, paste and report
//! tokens, and builds the outbound CSI/OSC sequences that drive the terminal.

pub mod capability;
pub mod config;
pub mod decoder;
pub mod escape;
pub mod keymap;
pub mod pattern;
pub mod sequence;
pub mod terminfo;
pub mod text;

pub use capability::{Capability, Key, KeypadKey};
pub use config::{CursorOrigin, DecoderConfig, MatchStrategy, PartialInput};
pub use decoder::{Decoder, DecoderState, Sequences};
pub use escape::{csi, csi_private, osc, Color, EraseMode, EscapeBuilder, Mode, Request, Style};
pub use keymap::Keymap;
pub use pattern::{Match, PatternContext, PatternSet, SequencePattern};
pub use sequence::{CursorPosition, Fields, MouseProtocol, MouseReport, Sequence};
pub use terminfo::{CapabilityDatabase, Terminfo};
pub use text::{Encoding, TextDecoder};

pub use crossterm::event::KeyModifiers;

use thiserror::Error;

/// The escape character that opens every control sequence
pub const ESC: char = '\x1b';

#[derive(Error, Debug)]
pub enum TerminalError {
    #[error("Unknown capability name: {0}")]
    UnknownCapability(String),

    #[error("Unsupported text encoding: {0}")]
    InvalidEncoding(String),

    #[error("Terminal capability database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 decoding error")]
    Utf8Error(#[from] std::str::Utf8Error),
}
