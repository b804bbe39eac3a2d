//! Haptic backends. Desktop hosts have no vibrator, so the closest thing
//! is the terminal bell; `NoHaptics` reports the service as missing.

use std::io::Write;

use medirem_core::traits::Haptics;
use medirem_core::{MediremError, Result};

/// Rings the terminal bell once per "on" segment of the pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl TerminalBell {
    fn pulses(pattern: &[u64]) -> usize {
        // Pattern alternates off, on, off, on ...; odd indices are pulses.
        pattern.iter().skip(1).step_by(2).filter(|ms| **ms > 0).count()
    }
}

impl Haptics for TerminalBell {
    fn vibrate(&self, pattern: &[u64]) -> Result<()> {
        let bells = "\x07".repeat(Self::pulses(pattern));
        let mut stderr = std::io::stderr();
        stderr.write_all(bells.as_bytes())?;
        stderr.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        Err(MediremError::Haptics("haptics disabled".into()))
    }
}
