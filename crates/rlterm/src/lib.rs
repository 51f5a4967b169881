//! rlterm-keys: an interactive viewer for decoded terminal input

pub mod args;
pub mod input;
pub mod keys;
pub mod terminal_guard;
