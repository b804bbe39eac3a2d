//! Test doubles shared by the unit tests in this crate.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use medirem_core::traits::{
    AlarmFacility, Haptics, NotificationFacility, PendingAlarm, WakeClass, WakeSignal,
};
use medirem_core::{
    MediremError, Notification, ReminderKind, ReminderRecord, Result, TimeOfDay, WakePayload,
};

use crate::clock::Clock;

pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

pub fn local(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(year, month, day, hour, min, sec)
        .earliest()
        .expect("valid local time")
}

/// A fresh database path under the temp dir, unique per test name and process.
pub fn temp_db(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("medirem-{name}-{}", std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    dir.join("reminders.db")
}

pub fn medicine(id: i64, hour: u8, minute: u8, active: bool) -> ReminderRecord {
    let mut record = ReminderRecord::new(
        ReminderKind::medicine(&format!("Medicine {id}"), "1 tablet"),
        TimeOfDay::new(hour, minute).unwrap(),
    );
    record.id = id;
    record.active = active;
    record
}

/// Alarm facility that only records registrations.
#[derive(Default)]
pub struct RecordingAlarms {
    slots: Mutex<BTreeMap<i64, PendingAlarm>>,
    fail: AtomicBool,
}

impl RecordingAlarms {
    pub fn fail_registrations(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Simulate the registration for `token` going off.
    pub fn fire(&self, token: i64) -> Option<WakeSignal> {
        self.slots.lock().unwrap().remove(&token).map(|p| WakeSignal {
            token: p.token,
            fire_at: p.fire_at,
            payload: p.payload,
        })
    }
}

impl AlarmFacility for RecordingAlarms {
    fn register(
        &self,
        token: i64,
        fire_at: DateTime<Utc>,
        class: WakeClass,
        payload: WakePayload,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediremError::Alarm("alarm service unavailable".into()));
        }
        self.slots
            .lock()
            .unwrap()
            .insert(token, PendingAlarm { token, fire_at, class, payload });
        Ok(())
    }

    fn cancel(&self, token: i64) {
        self.slots.lock().unwrap().remove(&token);
    }

    fn pending(&self) -> Vec<PendingAlarm> {
        self.slots.lock().unwrap().values().cloned().collect()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub posted: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { posted: Mutex::default(), fail: AtomicBool::new(true) }
    }

    pub fn ids(&self) -> Vec<i64> {
        self.posted.lock().unwrap().iter().map(|n| n.id).collect()
    }
}

#[async_trait]
impl NotificationFacility for RecordingNotifier {
    async fn post(&self, notification: &Notification) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediremError::Notify("notification service missing".into()));
        }
        self.posted.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingHaptics(pub AtomicUsize);

impl Haptics for CountingHaptics {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FailingHaptics;

impl Haptics for FailingHaptics {
    fn vibrate(&self, _pattern: &[u64]) -> Result<()> {
        Err(MediremError::Haptics("no vibrator service".into()))
    }
}
