//! Haptic feedback trait.

use crate::error::Result;

/// Device vibration. `pattern` alternates off/on durations in milliseconds.
pub trait Haptics: Send + Sync {
    fn vibrate(&self, pattern: &[u64]) -> Result<()>;
}
