//! Boot/Startup Reconciler: rebuilds pending alarms from the store.
//! Brings the alarm table back in line with the records after a restart,
//! a lost registration, or an edit that raced a delivery. Safe to run any
//! number of times.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use medirem_core::traits::{PendingAlarm, RecordStore};
use medirem_core::{ReminderRecord, Result};

use crate::alarm::AlarmScheduler;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scheduled: usize,
    pub failed: usize,
    /// Pending wakes cancelled because their record is gone or inactive.
    pub pruned: usize,
}

pub struct Reconciler<S: RecordStore> {
    store: Arc<S>,
    scheduler: Arc<AlarmScheduler>,
}

impl<S: RecordStore> Reconciler<S> {
    pub fn new(store: Arc<S>, scheduler: Arc<AlarmScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Re-register every active record and drop wakes nothing wants.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        // Only prune what was pending before the records were read; a
        // registration written after that belongs to a newer record.
        let before = self.scheduler.pending();
        let active = self.store.list_active().await?;
        Ok(self.apply(&active, &before))
    }

    fn apply(&self, active: &[ReminderRecord], before: &[PendingAlarm]) -> ReconcileReport {
        let summary = self.scheduler.reschedule_all(active);
        let wanted: HashSet<i64> = active.iter().map(|r| r.id).collect();
        let mut pruned = 0;
        for orphan in before.iter().filter(|p| !wanted.contains(&p.token)) {
            self.scheduler.cancel(orphan.token);
            pruned += 1;
        }
        let report = ReconcileReport {
            scheduled: summary.scheduled,
            failed: summary.failed,
            pruned,
        };
        tracing::debug!(
            "🔄 Reconciled: {} scheduled, {} failed, {} pruned",
            report.scheduled,
            report.failed,
            report.pruned
        );
        report
    }

    /// Reconcile at start, then on every store change and every `interval`.
    /// Each pass re-reads the store, since the change stream only carries
    /// this process's writes. Returns when the change stream ends.
    pub async fn run(&self, interval: Duration) {
        // Subscribe before the first pass so no change can slip in between.
        let mut changes = self.store.observe_active();
        if changes.next().await.is_none() {
            return;
        }
        match self.reconcile().await {
            Ok(report) => tracing::info!(
                "⏰ Startup reconcile: {} reminders armed, {} failed",
                report.scheduled,
                report.failed
            ),
            Err(e) => tracing::warn!("⚠️ Startup reconcile failed: {e}"),
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                snapshot = changes.next() => {
                    if snapshot.is_none() {
                        break;
                    }
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!("⚠️ Reconcile after store change failed: {e}");
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!("⚠️ Periodic reconcile failed: {e}");
                    }
                }
            }
        }
    }
}
