//! RAII guard for the terminal while keys are read in raw mode

use anyhow::{Context, Result};
use crossterm::terminal;
use rlterm_terminal::{EscapeBuilder, Mode, Request};
use std::io::{self, Write};
use tracing::subscriber::NoSubscriber;
use tracing_subscriber::util::SubscriberInitExt;

/// Owns raw mode and any terminal modes set for the session, and undoes
/// both when dropped.
pub struct TerminalGuard {
    raw_mode_enabled: bool,
    modes: Vec<Mode>,
    builder: EscapeBuilder,
    // Marker to ensure this type is !Send and !Sync
    _marker: std::marker::PhantomData<*const ()>,
}

impl TerminalGuard {
    /// Take over the terminal. Unless logging already goes to a file, a
    /// no-op subscriber is installed so log lines cannot land on the
    /// raw-mode screen.
    pub fn acquire() -> Result<Self> {
        let _ = NoSubscriber::default().try_init();

        Ok(Self {
            raw_mode_enabled: false,
            modes: Vec::new(),
            builder: EscapeBuilder::new(),
            _marker: std::marker::PhantomData,
        })
    }

    pub fn enable_raw_mode(&mut self) -> Result<()> {
        if !self.raw_mode_enabled {
            terminal::enable_raw_mode().context("Failed to enable raw mode")?;
            self.raw_mode_enabled = true;
        }
        Ok(())
    }

    pub fn disable_raw_mode(&mut self) -> Result<()> {
        if self.raw_mode_enabled {
            terminal::disable_raw_mode().context("Failed to disable raw mode")?;
            self.raw_mode_enabled = false;
        }
        Ok(())
    }

    pub fn is_raw_mode(&self) -> bool {
        self.raw_mode_enabled
    }

    /// Set terminal modes; they are reset in reverse order on drop
    pub fn set_modes(&mut self, modes: &[Mode]) -> Result<()> {
        let mut stdout = io::stdout().lock();
        for mode in modes {
            self.builder.write(&mut stdout, &Request::SetMode(*mode))?;
            self.modes.push(*mode);
        }
        stdout.flush()?;
        Ok(())
    }

    /// Write a request to the terminal
    pub fn send(&mut self, request: &Request) -> Result<()> {
        let mut stdout = io::stdout().lock();
        self.builder.write(&mut stdout, request)?;
        stdout.flush()?;
        Ok(())
    }

    fn reset_modes(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        while let Some(mode) = self.modes.pop() {
            self.builder.write(&mut stdout, &Request::ResetMode(mode))?;
        }
        stdout.flush()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Always try to restore terminal state
        let _ = self.reset_modes();
        if self.raw_mode_enabled {
            let _ = terminal::disable_raw_mode();
        }
    }
}
