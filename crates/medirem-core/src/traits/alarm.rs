//! Alarm facility trait: one-shot wake registrations keyed by token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::WakePayload;

/// Timer precision requested from the alarm facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeClass {
    /// May be batched or deferred by power management.
    Inexact,
    /// Fire at the instant, even while the device is idle.
    ExactAllowWhileIdle,
}

/// Delivered when a registration fires.
#[derive(Debug, Clone, PartialEq)]
pub struct WakeSignal {
    pub token: i64,
    pub fire_at: DateTime<Utc>,
    pub payload: WakePayload,
}

/// A registration that has not fired yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAlarm {
    pub token: i64,
    pub fire_at: DateTime<Utc>,
    pub class: WakeClass,
    pub payload: WakePayload,
}

/// One-shot wake scheduling. At most one registration exists per token.
pub trait AlarmFacility: Send + Sync {
    /// Register a wake. Replaces any existing registration for `token`.
    fn register(
        &self,
        token: i64,
        fire_at: DateTime<Utc>,
        class: WakeClass,
        payload: WakePayload,
    ) -> Result<()>;

    /// Remove the registration for `token`, if any.
    fn cancel(&self, token: i64);

    /// Registrations that have not fired, ordered by token.
    fn pending(&self) -> Vec<PendingAlarm>;
}
