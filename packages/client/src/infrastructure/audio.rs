//! Alert sound for breaking-news takeovers.

use std::io::Write;

use crate::{domain::AlertSound, error::AudioError};

/// Rings the terminal bell
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalBell {
    pub enabled: bool,
}

impl AlertSound for TerminalBell {
    fn play(&self) -> Result<(), AudioError> {
        if !self.enabled {
            return Ok(());
        }
        let mut stdout = std::io::stdout();
        stdout
            .write_all(b"\x07")
            .and_then(|_| stdout.flush())
            .map_err(|e| AudioError::Unavailable(e.to_string()))
    }
}

/// Plays nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSound;

impl AlertSound for NoSound {
    fn play(&self) -> Result<(), AudioError> {
        Ok(())
    }
}
