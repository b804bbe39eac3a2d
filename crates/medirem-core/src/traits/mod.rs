//! Facility traits: the seams between the scheduling core and the platform.

pub mod alarm;
pub mod haptics;
pub mod notify;
pub mod store;

pub use alarm::{AlarmFacility, PendingAlarm, WakeClass, WakeSignal};
pub use haptics::Haptics;
pub use notify::NotificationFacility;
pub use store::RecordStore;
