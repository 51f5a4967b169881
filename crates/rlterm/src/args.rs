//! Command line arguments for rlterm-keys

use clap::{Parser, ValueEnum};
use rlterm_terminal::{CursorOrigin, DecoderConfig, Encoding, MatchStrategy, Mode, PartialInput};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Mouse report encoding to request from the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MouseEncoding {
    X10,
    Sgr,
    Urxvt,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Show how terminal input decodes into key and report tokens")]
pub struct Args {
    /// Terminal type to load capabilities for (defaults to $TERM)
    #[arg(long)]
    pub term: Option<String>,

    /// Use the built-in key sequences only
    #[arg(long)]
    pub no_terminfo: bool,

    /// Text encoding of terminal input and capability strings
    #[arg(long, value_enum, default_value = "utf-8")]
    pub encoding: Encoding,

    /// How key sequences are matched against buffered input
    #[arg(long, value_enum, default_value = "longest-prefix")]
    pub match_strategy: MatchStrategy,

    /// Coordinate origin of cursor position reports
    #[arg(long, value_enum, default_value = "detect")]
    pub cursor_origin: CursorOrigin,

    /// Milliseconds to wait for the rest of a sequence after ESC
    #[arg(long, default_value = "35")]
    pub esc_delay_ms: u16,

    /// Enable mouse reporting with the given encoding
    #[arg(long, value_enum)]
    pub mouse: Option<MouseEncoding>,

    /// Enable focus in/out reports
    #[arg(long)]
    pub focus: bool,

    /// Enable bracketed paste
    #[arg(long)]
    pub paste: bool,

    /// Ask the terminal for the cursor position on start
    #[arg(long)]
    pub probe_cursor: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Write logs to this file (logging is off in raw mode otherwise)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Decoder settings; fragments are retained between reads and resolved
    /// when the escape delay runs out
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::default()
            .with_encoding(self.encoding)
            .with_match_strategy(self.match_strategy)
            .with_partial_input(PartialInput::Retain)
            .with_cursor_origin(self.cursor_origin)
    }

    pub fn esc_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.esc_delay_ms))
    }

    /// Terminal modes to set for the session, in the order they are set.
    ///
    /// Legacy mouse coordinates past 95 are bytes above 0x7f, so under UTF-8
    /// input they are requested UTF-8 encoded; Latin-1 takes them raw.
    pub fn modes(&self) -> Vec<Mode> {
        let mut modes = Vec::new();
        if let Some(encoding) = self.mouse {
            modes.push(Mode::MouseButtonEvent);
            match encoding {
                MouseEncoding::X10 if self.encoding == Encoding::Utf8 => modes.push(Mode::MouseUtf8),
                MouseEncoding::X10 => {}
                MouseEncoding::Sgr => modes.push(Mode::MouseSgr),
                MouseEncoding::Urxvt => modes.push(Mode::MouseUrxvt),
            }
        }
        if self.focus {
            modes.push(Mode::FocusEvents);
        }
        if self.paste {
            modes.push(Mode::BracketedPaste);
        }
        modes
    }
}
