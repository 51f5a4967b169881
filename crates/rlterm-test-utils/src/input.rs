//! Input feeding helpers and generators

use proptest::prelude::*;
use rlterm_terminal::{Decoder, Sequence};

/// Feed `chunks` one `parse` call each, then flush
pub fn decode_chunks(decoder: &mut Decoder, chunks: &[&str]) -> Vec<Sequence> {
    let mut tokens = Vec::new();
    for chunk in chunks {
        tokens.extend(decoder.parse(chunk));
    }
    tokens.extend(decoder.flush());
    tokens
}

/// Concatenated text of every token
pub fn joined_text(tokens: &[Sequence]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Fragments real terminals send, including broken and partial ones
const FRAGMENTS: &[&str] = &[
    "\x1b",
    "\x1b[",
    "\x1bO",
    "\x1b[A",
    "\x1bOP",
    "\x1b[1;5C",
    "\x1b[15~",
    "\x1b[200~",
    "\x1b[201~",
    "\x1b[24;80R",
    "\x1b[<0;10;20M",
    "\x1b[<",
    "\x1b[32;5;6M",
    "\x1b[M !\"",
    "\x1b[M",
    "\x1b[99999999~",
    "\x1b[[A",
    "\r",
    "\x7f",
];

/// Terminal-like input: known sequences, fragments, ASCII and wider chars
pub fn input_strategy() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        3 => proptest::sample::select(FRAGMENTS).prop_map(str::to_string),
        2 => "[ -~]{1,4}",
        1 => any::<char>().prop_map(|c| c.to_string()),
    ];
    proptest::collection::vec(piece, 0..12).prop_map(|pieces| pieces.concat())
}
