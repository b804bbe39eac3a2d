//! # MediRem Core
//!
//! Shared data model, facility traits, configuration, and error types for
//! the medicine and expense reminder apps.
//!
//! Everything platform-facing (record storage, alarms, notifications,
//! haptics) is a trait in [`traits`] so the scheduling core in
//! `medirem-scheduler` can be driven by real services or by test fakes.

pub mod config;
pub mod error;
pub mod notification;
pub mod record;
pub mod traits;

pub use config::MediremConfig;
pub use error::{MediremError, Result};
pub use notification::{Notification, NotifyPriority};
pub use record::{ReminderKind, ReminderRecord, TimeOfDay, WakePayload, Weekdays};
