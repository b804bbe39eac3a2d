//! Reminder Dispatcher: what happens when a wake signal arrives.
//!
//! Three independent steps, in order: post the notification, buzz, then
//! re-arm tomorrow's wake if the record is still active. No step's failure
//! skips a later one; every failure is logged and the occurrence's side
//! effect is simply lost.

use std::sync::Arc;

use chrono::Local;
use medirem_core::config::NotifyConfig;
use medirem_core::traits::{Haptics, NotificationFacility, RecordStore, WakeSignal};
use medirem_core::Notification;

use crate::alarm::AlarmScheduler;

/// What a single dispatch achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub notified: bool,
    pub vibrated: bool,
    pub rescheduled: bool,
}

pub struct ReminderDispatcher<S: RecordStore> {
    store: Arc<S>,
    scheduler: Arc<AlarmScheduler>,
    notifier: Arc<dyn NotificationFacility>,
    haptics: Arc<dyn Haptics>,
    config: NotifyConfig,
}

impl<S: RecordStore> ReminderDispatcher<S> {
    pub fn new(
        store: Arc<S>,
        scheduler: Arc<AlarmScheduler>,
        notifier: Arc<dyn NotificationFacility>,
        haptics: Arc<dyn Haptics>,
        config: NotifyConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            notifier,
            haptics,
            config,
        }
    }

    pub async fn on_wake(&self, signal: WakeSignal) -> DispatchReport {
        tracing::info!("🔔 Reminder {} fired", signal.token);
        let mut report = DispatchReport::default();

        let notification = Notification::for_payload(&signal.payload, &self.config);
        match self.notifier.post(&notification).await {
            Ok(()) => report.notified = true,
            Err(e) => tracing::warn!("⚠️ Notification for reminder {} failed: {e}", signal.token),
        }

        match self.haptics.vibrate(&self.config.vibration_pattern) {
            Ok(()) => report.vibrated = true,
            Err(e) => tracing::debug!("Haptics skipped for reminder {}: {e}", signal.token),
        }

        report.rescheduled = self.rearm(&signal).await;
        report
    }

    async fn rearm(&self, signal: &WakeSignal) -> bool {
        let record = match self.store.get_by_id(signal.token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::info!("🗑️ Reminder {} no longer exists; not rescheduling", signal.token);
                return false;
            }
            Err(e) => {
                tracing::warn!("⚠️ Reminder {} may not fire again: {e}", signal.token);
                return false;
            }
        };
        if !record.active {
            tracing::info!("⏸️ Reminder {} is inactive; not rescheduling", signal.token);
            return false;
        }

        // Never earlier than the slot that just fired, so a timer that wakes
        // a little early cannot re-arm the same occurrence.
        let fired_at = signal.fire_at.with_timezone(&Local);
        let after = self.scheduler.now().max(fired_at);
        match self.scheduler.schedule_record_after(&record, after) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("⚠️ Reminder {} may not fire again: {e}", signal.token);
                false
            }
        }
    }
}
