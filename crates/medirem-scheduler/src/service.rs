//! Reminder Service: the CRUD entry point a UI or CLI calls.
//! Keeps each record's alarm in step with its stored state: an active
//! record owns exactly one pending wake, and an inactive or deleted one
//! owns none by the time the call returns.

use std::sync::Arc;

use medirem_core::traits::RecordStore;
use medirem_core::{MediremError, ReminderRecord, Result};

use crate::alarm::AlarmScheduler;

pub struct ReminderService<S: RecordStore> {
    store: Arc<S>,
    scheduler: Arc<AlarmScheduler>,
}

impl<S: RecordStore> ReminderService<S> {
    pub fn new(store: Arc<S>, scheduler: Arc<AlarmScheduler>) -> Self {
        Self { store, scheduler }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate, store, and arm a new record. Returns it with its id.
    pub async fn create(&self, record: &ReminderRecord) -> Result<ReminderRecord> {
        let mut record = record.validate()?;
        record.id = self.store.insert(&record).await?;
        tracing::info!("📅 Reminder {} added at {}", record.id, record.time);
        if record.active {
            self.arm(&record);
        }
        Ok(record)
    }

    /// Store changes to an existing record and re-arm or cancel its wake.
    pub async fn update(&self, record: &ReminderRecord) -> Result<ReminderRecord> {
        let record = record.validate()?;
        if !record.active {
            self.scheduler.cancel(record.id);
        }
        self.store.update(&record).await?;
        if record.active {
            self.arm(&record);
        }
        Ok(record)
    }

    /// Cancel the wake, then delete. Returns whether the record existed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.scheduler.cancel(id);
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::info!("🗑️ Reminder {} deleted", id);
        }
        Ok(removed)
    }

    /// Toggle a record. Deactivation cancels before the store write.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<ReminderRecord> {
        if !active {
            self.scheduler.cancel(id);
        }
        if !self.store.set_active(id, active).await? {
            return Err(MediremError::NotFound(id));
        }
        let record = self.get(id).await?;
        if active {
            self.arm(&record);
        }
        Ok(record)
    }

    pub async fn get(&self, id: i64) -> Result<ReminderRecord> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(MediremError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<ReminderRecord>> {
        self.store.list().await
    }

    /// A failed registration leaves the stored record intact; the next
    /// reconcile pass retries it.
    fn arm(&self, record: &ReminderRecord) {
        if let Err(e) = self.scheduler.schedule_record(record) {
            tracing::warn!("⚠️ Reminder {} may not fire: {e}", record.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm_clock::SqliteAlarmClock;
    use crate::persistence::SqliteRecordStore;
    use crate::reconcile::Reconciler;
    use crate::testing::{FixedClock, RecordingAlarms, local, medicine, temp_db};
    use chrono::{Local, Timelike, Utc};
    use medirem_core::traits::AlarmFacility;
    use medirem_core::{ReminderKind, TimeOfDay};

    fn service() -> (ReminderService<SqliteRecordStore>, Arc<RecordingAlarms>) {
        let alarms = Arc::new(RecordingAlarms::default());
        let scheduler = Arc::new(AlarmScheduler::new(
            alarms.clone(),
            Arc::new(FixedClock(local(2026, 5, 10, 6, 0, 0))),
        ));
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        (ReminderService::new(store, scheduler), alarms)
    }

    #[tokio::test]
    async fn test_create_arms_active_record() {
        let (svc, alarms) = service();
        let created = svc.create(&medicine(0, 8, 0, true)).await.unwrap();
        assert!(created.id > 0);
        let pending = alarms.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].token, created.id);
    }

    #[tokio::test]
    async fn test_create_inactive_does_not_arm() {
        let (svc, alarms) = service();
        svc.create(&medicine(0, 8, 0, false)).await.unwrap();
        assert!(alarms.pending().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (svc, alarms) = service();
        let blank = ReminderRecord::new(ReminderKind::medicine("  ", ""), TimeOfDay::new(8, 0).unwrap());
        assert!(matches!(svc.create(&blank).await, Err(MediremError::Validation(_))));
        assert!(svc.list().await.unwrap().is_empty());
        assert!(alarms.pending().is_empty());
    }

    #[tokio::test]
    async fn test_update_time_replaces_wake() {
        let (svc, alarms) = service();
        let mut record = svc.create(&medicine(0, 8, 0, true)).await.unwrap();
        record.time = TimeOfDay::new(22, 15).unwrap();
        svc.update(&record).await.unwrap();

        let pending = alarms.pending();
        assert_eq!(pending.len(), 1);
        let at = pending[0].fire_at.with_timezone(&Local);
        assert_eq!((at.hour(), at.minute()), (22, 15));
    }

    #[tokio::test]
    async fn test_deactivate_then_reactivate() {
        let (svc, alarms) = service();
        let record = svc.create(&medicine(0, 8, 0, true)).await.unwrap();

        let paused = svc.set_active(record.id, false).await.unwrap();
        assert!(!paused.active);
        assert!(alarms.pending().is_empty());

        svc.set_active(record.id, true).await.unwrap();
        assert_eq!(alarms.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cancels_and_removes() {
        let (svc, alarms) = service();
        let record = svc.create(&medicine(0, 8, 0, true)).await.unwrap();
        assert!(svc.delete(record.id).await.unwrap());
        assert!(alarms.pending().is_empty());
        assert!(matches!(svc.get(record.id).await, Err(MediremError::NotFound(_))));
        assert!(!svc.delete(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_missing_record() {
        let (svc, _) = service();
        assert!(matches!(svc.set_active(404, true).await, Err(MediremError::NotFound(404))));
    }

    #[tokio::test]
    async fn test_schedule_failure_keeps_record() {
        let (svc, alarms) = service();
        alarms.fail_registrations(true);
        let record = svc.create(&medicine(0, 8, 0, true)).await.unwrap();
        assert!(svc.get(record.id).await.unwrap().active);
        assert!(alarms.pending().is_empty());
    }

    #[tokio::test]
    async fn test_changes_from_another_process_reach_the_daemon() {
        let path = temp_db("service-shared");
        let clock = || Arc::new(FixedClock(local(2026, 5, 10, 6, 0, 0)));

        // Daemon side: its own connections, scheduler and reconciler.
        let daemon_alarms = Arc::new(SqliteAlarmClock::open(&path).unwrap());
        let daemon_scheduler = Arc::new(AlarmScheduler::new(daemon_alarms.clone(), clock()));
        let daemon_store = Arc::new(SqliteRecordStore::open(&path).unwrap());
        let reconciler = Reconciler::new(daemon_store, daemon_scheduler.clone());

        // CLI side: a separate set of connections to the same file.
        let cli = ReminderService::new(
            Arc::new(SqliteRecordStore::open(&path).unwrap()),
            Arc::new(AlarmScheduler::new(
                Arc::new(SqliteAlarmClock::open(&path).unwrap()),
                clock(),
            )),
        );

        let record = cli.create(&medicine(0, 8, 0, true)).await.unwrap();
        reconciler.reconcile().await.unwrap();
        let armed: Vec<i64> = daemon_scheduler.pending().iter().map(|p| p.token).collect();
        assert_eq!(armed, vec![record.id]);

        cli.set_active(record.id, false).await.unwrap();
        assert!(daemon_scheduler.pending().is_empty());
        let far_future = Utc::now() + chrono::Duration::days(30);
        assert!(daemon_alarms.take_due(far_future).unwrap().is_empty());

        cli.set_active(record.id, true).await.unwrap();
        assert_eq!(daemon_scheduler.pending().len(), 1);

        assert!(cli.delete(record.id).await.unwrap());
        assert!(daemon_scheduler.pending().is_empty());
        assert_eq!(reconciler.reconcile().await.unwrap().scheduled, 0);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
