//! rlterm-keys: print the tokens terminal input decodes into

use crate::args::Args;
use crate::input::{InputReader, ReadOutcome};
use crate::terminal_guard::TerminalGuard;
use anyhow::{Context, Result};
use clap::Parser;
use rlterm_terminal::{Decoder, Fields, Request, Sequence, Terminfo};
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Keys that end the session
const QUIT_KEYS: [&str; 2] = ["q", "\x03"];

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut decoder = build_decoder(&args);
    let mut reader = InputReader::new(args.encoding);

    let mut guard = TerminalGuard::acquire()?;
    guard.enable_raw_mode()?;
    guard.set_modes(&args.modes())?;
    if args.probe_cursor {
        guard.send(&Request::RequestCursorPosition)?;
    }

    let mut stdout = io::stdout();
    write!(stdout, "Press keys to see how they decode; q or Ctrl-C quits.\r\n")?;
    stdout.flush()?;

    loop {
        let (tokens, closed) = decode_outcome(&mut decoder, reader.read(args.esc_delay())?);
        if closed {
            info!("Input closed");
        }

        let mut quit = closed;
        for token in &tokens {
            write!(stdout, "{}\r\n", describe(token))?;
            quit |= !token.is_escaped && QUIT_KEYS.contains(&token.text.as_str());
        }
        stdout.flush()?;
        if quit {
            break;
        }
    }

    guard.disable_raw_mode()?;
    Ok(())
}

/// Tokens for one read, and whether input has ended
fn decode_outcome(decoder: &mut Decoder, outcome: ReadOutcome) -> (Vec<Sequence>, bool) {
    match outcome {
        ReadOutcome::Text(text) => (decoder.parse(&text).collect(), false),
        ReadOutcome::Timeout => (decoder.flush().collect(), false),
        ReadOutcome::Eof(rest) => {
            let mut tokens: Vec<Sequence> = decoder.parse(&rest).collect();
            tokens.extend(decoder.flush());
            (tokens, true)
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(args.log_level))
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_decoder(args: &Args) -> Decoder {
    let config = args.decoder_config();
    if args.no_terminfo {
        debug!("Using built-in key sequences only");
        return Decoder::new(config);
    }

    let info = match &args.term {
        Some(term) => Terminfo::query(term),
        None => Terminfo::from_env(),
    };
    match info {
        Ok(info) => {
            info!("Loaded terminal capabilities for {:?}", info.names().first());
            Decoder::with_database(Box::new(info), config)
        }
        Err(e) => {
            warn!("Terminal capabilities unavailable, using built-in key sequences: {}", e);
            Decoder::new(config)
        }
    }
}

/// One line describing a token
pub fn describe(token: &Sequence) -> String {
    let name = token.name().unwrap_or_else(|| "-".to_string());
    let mut line = format!("{name:<24} {:?}", token.text);
    if token.is_escaped {
        line.push_str(" escaped");
    }
    match token.fields {
        Some(Fields::Key { modifiers }) => line.push_str(&format!(" modifiers={modifiers:?}")),
        Some(Fields::Cursor(pos)) => {
            line.push_str(&format!(" row={} column={}", pos.row, pos.column))
        }
        Some(Fields::Mouse(m)) => line.push_str(&format!(
            " {:?} button={} column={} row={} {}",
            m.protocol,
            m.button_index(),
            m.column,
            m.row,
            if m.pressed { "press" } else { "release" }
        )),
        None => {}
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::input::InputReader;
    use rlterm_terminal::{DecoderConfig, Encoding, PartialInput};
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Duration;
    use test_case::test_case;

    fn retaining() -> Decoder {
        Decoder::new(DecoderConfig::default().with_partial_input(PartialInput::Retain))
    }

    fn first(input: &str) -> Sequence {
        Decoder::new(DecoderConfig::default()).decode_all(input).remove(0)
    }

    #[test_case("a", r#"- "a""# ; "literal")]
    #[test_case("\x1b[A", r#"key_up "\u{1b}[A""# ; "key")]
    #[test_case("\x1bx", r#"- "x" escaped"# ; "escaped")]
    #[test_case("\x1b[24;80R", r#"cursor_report "\u{1b}[24;80R" row=24 column=80"# ; "cursor")]
    #[test_case("\x1b[<0;10;20m", r#"mouse_report "\u{1b}[<0;10;20m" Sgr button=0 column=10 row=20 release"# ; "mouse")]
    fn test_describe(input: &str, expected: &str) {
        let line = describe(&first(input));
        assert_eq!(
            line.split_whitespace().collect::<Vec<_>>(),
            expected.split_whitespace().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_escape_resolved_when_input_closes() {
        let mut decoder = retaining();
        let (tokens, closed) = decode_outcome(&mut decoder, ReadOutcome::Text("a\x1b".into()));
        assert_eq!(tokens, vec![Sequence::new("a", None)]);
        assert!(!closed);

        let (tokens, closed) = decode_outcome(&mut decoder, ReadOutcome::Eof(String::new()));
        assert!(closed);
        assert_eq!(names(&tokens), vec!["key_escape"]);
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_held_back_text_decoded_when_input_closes() {
        let mut decoder = retaining();
        let (tokens, closed) =
            decode_outcome(&mut decoder, ReadOutcome::Eof("\x1b[1".into()));
        assert!(closed);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts.concat(), "\x1b[1");
    }

    #[test]
    fn test_alt_key_split_inside_code_point() {
        let (input, mut terminal) = UnixStream::pair().unwrap();
        let mut reader = InputReader::with_source(input, Encoding::Utf8);
        let mut decoder = retaining();
        let delay = Duration::from_millis(500);

        terminal.write_all(b"\x1b").unwrap();
        let (tokens, _) = decode_outcome(&mut decoder, reader.read(delay).unwrap());
        assert!(tokens.is_empty());

        terminal.write_all(b"\xc3").unwrap();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            terminal.write_all(b"\xa9").unwrap();
            terminal
        });
        let (tokens, _) = decode_outcome(&mut decoder, reader.read(delay).unwrap());
        writer.join().unwrap();

        assert_eq!(tokens.len(), 1, "{tokens:?}");
        assert_eq!(tokens[0].text, "é");
        assert!(tokens[0].is_escaped);
    }

    fn names(tokens: &[Sequence]) -> Vec<String> {
        tokens.iter().filter_map(Sequence::name).collect()
    }
}
