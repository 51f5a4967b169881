//! Terminal input reader
//!
//! Polls stdin with a timeout so the caller learns when input has gone
//! quiet, which is when a retained lone ESC should be treated as a key press.

use anyhow::{Context, Result};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use rlterm_terminal::{Encoding, TextDecoder};
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};
use tracing::trace;

/// Larger than stdin's internal buffer so reads bypass it and poll stays
/// accurate
const READ_BUFFER_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Text(String),
    /// Nothing arrived within the timeout
    Timeout,
    /// Input closed; carries whatever was held back from the last read
    Eof(String),
}

enum Wait {
    Ready,
    TimedOut,
    Interrupted,
}

pub struct InputReader<R = io::Stdin> {
    source: R,
    text: TextDecoder,
    buf: Vec<u8>,
}

impl InputReader {
    pub fn new(encoding: Encoding) -> Self {
        Self::with_source(io::stdin(), encoding)
    }
}

impl<R: Read + AsFd> InputReader<R> {
    pub fn with_source(source: R, encoding: Encoding) -> Self {
        Self {
            source,
            text: TextDecoder::new(encoding),
            buf: vec![0; READ_BUFFER_SIZE],
        }
    }

    /// Wait up to `timeout` for input and decode whatever is available.
    ///
    /// `Timeout` is only returned once poll itself times out. A read that
    /// ends inside a code point waits for the rest with a fresh timeout.
    pub fn read(&mut self, timeout: Duration) -> Result<ReadOutcome> {
        let mut deadline = Instant::now() + timeout;
        loop {
            match self.wait(deadline.saturating_duration_since(Instant::now()))? {
                Wait::Ready => {}
                Wait::Interrupted => continue,
                Wait::TimedOut => return Ok(ReadOutcome::Timeout),
            }

            let n = match self.source.read(&mut self.buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read input"),
            };
            if n == 0 {
                return Ok(ReadOutcome::Eof(self.text.finish()));
            }
            trace!("Read {} bytes: {:?}", n, &self.buf[..n]);

            let text = self.text.decode(&self.buf[..n]);
            if text.is_empty() {
                deadline = Instant::now() + timeout;
                continue;
            }
            return Ok(ReadOutcome::Text(text));
        }
    }

    fn wait(&self, timeout: Duration) -> Result<Wait> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.source.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(millis)) {
            Ok(0) => Ok(Wait::TimedOut),
            Ok(_) => Ok(Wait::Ready),
            Err(nix::errno::Errno::EINTR) => Ok(Wait::Interrupted),
            Err(e) => Err(e).context("Failed to poll input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::thread;

    const WAIT: Duration = Duration::from_millis(500);

    fn reader() -> (InputReader<UnixStream>, UnixStream) {
        let (input, terminal) = UnixStream::pair().unwrap();
        (InputReader::with_source(input, Encoding::Utf8), terminal)
    }

    #[test]
    fn test_quiet_input_times_out() {
        let (mut reader, _terminal) = reader();
        assert_eq!(
            reader.read(Duration::from_millis(10)).unwrap(),
            ReadOutcome::Timeout
        );
    }

    #[test]
    fn test_code_point_split_across_reads() {
        let (mut reader, mut terminal) = reader();
        terminal.write_all(b"\xc3").unwrap();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            terminal.write_all(b"\xa9").unwrap();
            terminal
        });

        assert_eq!(reader.read(WAIT).unwrap(), ReadOutcome::Text("é".to_string()));
        writer.join().unwrap();
    }

    #[test]
    fn test_eof_returns_held_back_bytes() {
        let (mut reader, mut terminal) = reader();
        terminal.write_all(b"a").unwrap();
        assert_eq!(reader.read(WAIT).unwrap(), ReadOutcome::Text("a".to_string()));

        terminal.write_all(b"\xe2\x86").unwrap();
        drop(terminal);
        assert_eq!(
            reader.read(WAIT).unwrap(),
            ReadOutcome::Eof("\u{fffd}".to_string())
        );
    }
}
