//! Sequence decoder
//!
//! Turns decoded terminal input into a stream of [`Sequence`] tokens. The
//! decoder is the only long-lived mutable state of an input session: it
//! keeps the ESC state and any retained fragment between `parse` calls,
//! because a read boundary can fall anywhere inside a sequence.

use crate::config::{DecoderConfig, MatchStrategy, PartialInput};
use crate::keymap::Keymap;
use crate::pattern::{Match, PatternContext, PatternSet};
use crate::sequence::Sequence;
use crate::terminfo::CapabilityDatabase;
use crate::ESC;
use std::cell::OnceCell;
use std::fmt;
use tracing::{debug, trace};

/// Longest fragment retained between calls in [`PartialInput::Retain`] mode
pub const MAX_RETAINED: usize = 256;

/// Escape state carried between tokens and between calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// No ESC prefix is pending
    #[default]
    Idle,
    /// A lone ESC was read and the next token is prefixed by it
    Escaped,
}

/// What a single decoding step produced
enum Step {
    Emit(Sequence),
    Continue,
    Stop,
}

pub struct Decoder {
    config: DecoderConfig,
    database: Option<Box<dyn CapabilityDatabase>>,
    keymap: OnceCell<Keymap>,
    patterns: PatternSet,
    state: DecoderState,
    /// A consumed ESC that has been neither emitted nor used as a prefix
    pending_escape: bool,
    buffer: String,
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("config", &self.config)
            .field("database", &self.database.is_some())
            .field("keymap_built", &self.keymap.get().is_some())
            .field("patterns", &self.patterns.names())
            .field("state", &self.state)
            .field("pending_escape", &self.pending_escape)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl Decoder {
    /// Decoder using the compiled-in key sequences only
    pub fn new(config: DecoderConfig) -> Self {
        Self::build(config, None, OnceCell::new())
    }

    /// Decoder whose key sequences are overlaid with the database entries
    pub fn with_database(db: Box<dyn CapabilityDatabase>, config: DecoderConfig) -> Self {
        Self::build(config, Some(db), OnceCell::new())
    }

    /// Decoder with a prepared keymap
    pub fn with_keymap(keymap: Keymap, config: DecoderConfig) -> Self {
        Self::build(config, None, OnceCell::from(keymap))
    }

    fn build(
        config: DecoderConfig,
        database: Option<Box<dyn CapabilityDatabase>>,
        keymap: OnceCell<Keymap>,
    ) -> Self {
        Self {
            config,
            database,
            keymap,
            patterns: PatternSet::standard(),
            state: DecoderState::Idle,
            pending_escape: false,
            buffer: String::new(),
        }
    }

    /// Replace the variable-length grammars
    pub fn with_patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Input retained from previous calls and not yet decoded
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// The key sequence table, built on first use
    pub fn keymap(&self) -> &Keymap {
        build_keymap(&self.keymap, self.database.as_deref(), &self.config)
    }

    /// Forget retained input and ESC state, as when a session is
    /// reinitialized
    pub fn reset(&mut self) {
        debug!("Resetting decoder, dropping {} retained bytes", self.buffer.len());
        self.buffer.clear();
        self.state = DecoderState::Idle;
        self.pending_escape = false;
    }

    /// Decode `input` together with anything retained from earlier calls.
    ///
    /// Tokens are produced lazily. Dropping the iterator early keeps the
    /// rest of the input for the next call.
    pub fn parse(&mut self, input: &str) -> Sequences<'_> {
        self.buffer.push_str(input);
        let finishing = self.config.partial_input == PartialInput::Flush;
        Sequences {
            decoder: self,
            pos: 0,
            finishing,
        }
    }

    /// Resolve retained input as if no more will arrive
    pub fn flush(&mut self) -> Sequences<'_> {
        Sequences {
            decoder: self,
            pos: 0,
            finishing: true,
        }
    }

    /// Decode `input` to completion
    pub fn decode_all(&mut self, input: &str) -> Vec<Sequence> {
        self.parse(input).collect()
    }

    fn step(&mut self, pos: &mut usize, finishing: bool) -> Step {
        let Decoder {
            config,
            database,
            keymap,
            patterns,
            state,
            pending_escape,
            buffer,
        } = self;
        let keymap = build_keymap(keymap, database.as_deref(), config);
        let ctx = PatternContext {
            keymap,
            decrement_cursor: config.decrement_cursor_report(keymap.cursor_report_one_based()),
        };

        let rest = &buffer[*pos..];
        let Some(first) = rest.chars().next() else {
            if finishing && *pending_escape {
                *pending_escape = false;
                *state = DecoderState::Idle;
                return Step::Emit(Sequence::escape_key());
            }
            return Step::Stop;
        };

        if !finishing && rest.len() <= MAX_RETAINED && first == ESC {
            let incomplete = rest.len() == ESC.len_utf8()
                || keymap.is_strict_prefix(rest)
                || patterns.try_match(rest, &ctx) == Match::Incomplete;
            if incomplete {
                return Step::Stop;
            }
        }

        if first == ESC && *pending_escape {
            *pending_escape = false;
            return Step::Emit(Sequence::escape_key());
        }

        let escaped = *state == DecoderState::Escaped;
        let table = match config.match_strategy {
            MatchStrategy::LongestPrefix => keymap.longest_prefix(rest),
            MatchStrategy::WholeBuffer if rest.len() > ESC.len_utf8() => {
                keymap.lookup(rest).map(|cap| (rest.len(), cap))
            }
            MatchStrategy::WholeBuffer => None,
        };
        let matched = match table {
            Some((len, cap)) => Some((len, Sequence::new(&rest[..len], Some(cap)))),
            None => match patterns.try_match(rest, &ctx) {
                Match::Matched {
                    len,
                    capability,
                    fields,
                } => Some((len, Sequence::new(&rest[..len], capability).with_fields(fields))),
                Match::Incomplete | Match::NoMatch => None,
            },
        };

        if let Some((len, seq)) = matched {
            *pos += len;
            *pending_escape = false;
            *state = DecoderState::Idle;
            return Step::Emit(seq.escaped(escaped));
        }

        *pos += first.len_utf8();
        if first == ESC {
            *pending_escape = true;
            *state = DecoderState::Escaped;
            return Step::Continue;
        }

        *pending_escape = false;
        *state = DecoderState::Idle;
        Step::Emit(Sequence::new(first.to_string(), None).escaped(escaped))
    }
}

fn build_keymap<'a>(
    cell: &'a OnceCell<Keymap>,
    database: Option<&dyn CapabilityDatabase>,
    config: &DecoderConfig,
) -> &'a Keymap {
    cell.get_or_init(|| {
        let keymap = match database {
            Some(db) => Keymap::with_database(db, config.encoding),
            None => Keymap::defaults(),
        };
        debug!("Built key sequence table with {} entries", keymap.len());
        keymap
    })
}

/// Lazy token stream returned by [`Decoder::parse`] and [`Decoder::flush`]
pub struct Sequences<'a> {
    decoder: &'a mut Decoder,
    pos: usize,
    finishing: bool,
}

impl Iterator for Sequences<'_> {
    type Item = Sequence;

    fn next(&mut self) -> Option<Sequence> {
        loop {
            match self.decoder.step(&mut self.pos, self.finishing) {
                Step::Emit(seq) => {
                    trace!(
                        "Decoded {:?} as {:?} (escaped: {})",
                        seq.text,
                        seq.name(),
                        seq.is_escaped
                    );
                    return Some(seq);
                }
                Step::Continue => continue,
                Step::Stop => return None,
            }
        }
    }
}

impl Drop for Sequences<'_> {
    fn drop(&mut self) {
        self.decoder.buffer.drain(..self.pos);
    }
}
