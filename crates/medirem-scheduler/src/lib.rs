//! # MediRem Scheduler
//!
//! Daily reminder scheduling: one exact wake per active record, re-armed
//! every time it fires and rebuilt from the store on every start.
//!
//! ## Architecture
//! ```text
//! ReminderService (create / update / delete / toggle)
//!   ├── RecordStore (SQLite, live snapshots)
//!   └── AlarmScheduler ── next_fire ── AlarmFacility (SqliteAlarmClock)
//!                                          │ WakeSignal
//!                                          ▼
//! ReminderDispatcher ── 1. NotifyRouter (tray + webhooks)
//!                    ── 2. Haptics (best effort)
//!                    ── 3. re-read record → AlarmScheduler (next day)
//!
//! Reconciler (start, store change, interval) → reschedule_all + prune
//! ```

pub mod alarm;
pub mod alarm_clock;
pub mod clock;
pub mod dispatch;
pub mod haptics;
pub mod next_fire;
pub mod notify;
pub mod persistence;
pub mod reconcile;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use alarm::{AlarmScheduler, RescheduleSummary};
pub use alarm_clock::SqliteAlarmClock;
pub use clock::{Clock, SystemClock};
pub use dispatch::{DispatchReport, ReminderDispatcher};
pub use haptics::{NoHaptics, TerminalBell};
pub use next_fire::{next_fire, next_fire_on};
pub use notify::{NotifyRouter, NotifyTarget};
pub use persistence::SqliteRecordStore;
pub use reconcile::{ReconcileReport, Reconciler};
pub use service::ReminderService;
