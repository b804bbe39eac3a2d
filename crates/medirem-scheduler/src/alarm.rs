//! Alarm Scheduler: programs one daily wake per reminder record.
//! Holds the alarm facility and clock as capabilities; keeps no state of
//! its own, so any number of callers can share one instance.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use medirem_core::config::SchedulerConfig;
use medirem_core::traits::{AlarmFacility, PendingAlarm, WakeClass};
use medirem_core::{MediremError, ReminderRecord, Result, TimeOfDay, WakePayload, Weekdays};

use crate::clock::Clock;
use crate::next_fire::{next_fire, next_fire_on};

/// Outcome of [`AlarmScheduler::reschedule_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescheduleSummary {
    pub scheduled: usize,
    pub failed: usize,
}

pub struct AlarmScheduler {
    alarms: Arc<dyn AlarmFacility>,
    clock: Arc<dyn Clock>,
    class: WakeClass,
    honor_weekdays: bool,
}

impl AlarmScheduler {
    pub fn new(alarms: Arc<dyn AlarmFacility>, clock: Arc<dyn Clock>) -> Self {
        Self {
            alarms,
            clock,
            class: WakeClass::ExactAllowWhileIdle,
            honor_weekdays: false,
        }
    }

    pub fn from_config(
        alarms: Arc<dyn AlarmFacility>,
        clock: Arc<dyn Clock>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            class: if config.exact_wake {
                WakeClass::ExactAllowWhileIdle
            } else {
                WakeClass::Inexact
            },
            honor_weekdays: config.honor_weekdays,
            ..Self::new(alarms, clock)
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Register the next daily wake for `id`, replacing any earlier one.
    pub fn schedule(&self, id: i64, time: TimeOfDay, payload: WakePayload) -> Result<DateTime<Utc>> {
        self.schedule_after(id, time, Weekdays::EVERY_DAY, payload, self.now(), true)
    }

    /// Schedule a stored record, honoring its weekdays when configured.
    pub fn schedule_record(&self, record: &ReminderRecord) -> Result<DateTime<Utc>> {
        self.schedule_record_after(record, self.now())
    }

    /// Schedule a stored record for the first slot strictly after `after`.
    pub fn schedule_record_after(
        &self,
        record: &ReminderRecord,
        after: DateTime<Local>,
    ) -> Result<DateTime<Utc>> {
        self.schedule_after(record.id, record.time, record.weekdays, record.wake_payload(), after, true)
    }

    fn schedule_after(
        &self,
        id: i64,
        time: TimeOfDay,
        weekdays: Weekdays,
        payload: WakePayload,
        after: DateTime<Local>,
        announce: bool,
    ) -> Result<DateTime<Utc>> {
        let fire_at = if self.honor_weekdays && !weekdays.is_every_day() {
            next_fire_on(time, weekdays, &after).ok_or_else(|| {
                MediremError::Alarm(format!("reminder {id} has no selected weekdays"))
            })?
        } else {
            next_fire(time, &after)
        };
        let fire_at = fire_at.with_timezone(&Utc);

        self.alarms.register(id, fire_at, self.class, payload)?;
        let local = fire_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        if announce {
            tracing::info!("⏰ Reminder {} scheduled for {}", id, local);
        } else {
            tracing::debug!("⏰ Reminder {} re-armed for {}", id, local);
        }
        Ok(fire_at)
    }

    /// Remove any pending wake for `id`. Cancelling nothing is fine.
    pub fn cancel(&self, id: i64) {
        self.alarms.cancel(id);
        tracing::info!("🔕 Reminder {} cancelled", id);
    }

    /// Schedule every active record. Failures are logged and counted, not
    /// retried; the next reconcile pass tries again.
    pub fn reschedule_all(&self, records: &[ReminderRecord]) -> RescheduleSummary {
        let now = self.now();
        let mut summary = RescheduleSummary::default();
        for record in records.iter().filter(|r| r.active) {
            let armed = self.schedule_after(
                record.id,
                record.time,
                record.weekdays,
                record.wake_payload(),
                now,
                false,
            );
            match armed {
                Ok(_) => summary.scheduled += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!("⚠️ Reminder {} may not fire: {e}", record.id);
                }
            }
        }
        summary
    }

    pub fn pending(&self) -> Vec<PendingAlarm> {
        self.alarms.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedClock, RecordingAlarms, local, medicine};
    use chrono::Timelike;

    fn scheduler(now: DateTime<Local>) -> (AlarmScheduler, Arc<RecordingAlarms>) {
        let alarms = Arc::new(RecordingAlarms::default());
        let scheduler = AlarmScheduler::new(alarms.clone(), Arc::new(FixedClock(now)));
        (scheduler, alarms)
    }

    #[test]
    fn test_schedule_today_and_tomorrow() {
        let (s, _) = scheduler(local(2026, 5, 10, 20, 59, 59));
        let record = medicine(5, 21, 0, true);
        let fire_at = s.schedule(5, record.time, record.wake_payload()).unwrap();
        assert_eq!(fire_at.with_timezone(&Local), local(2026, 5, 10, 21, 0, 0));

        let (s, _) = scheduler(local(2026, 5, 10, 21, 0, 1));
        let fire_at = s.schedule(5, record.time, record.wake_payload()).unwrap();
        assert_eq!(fire_at.with_timezone(&Local), local(2026, 5, 11, 21, 0, 0));
    }

    #[test]
    fn test_reschedule_same_id_keeps_one_registration() {
        let (s, alarms) = scheduler(local(2026, 5, 10, 6, 0, 0));
        let first = medicine(3, 8, 0, true);
        let second = medicine(3, 9, 30, true);
        s.schedule_record(&first).unwrap();
        s.schedule_record(&second).unwrap();

        let pending = alarms.pending();
        assert_eq!(pending.len(), 1);
        let fire_local = pending[0].fire_at.with_timezone(&Local);
        assert_eq!((fire_local.hour(), fire_local.minute()), (9, 30));
    }

    #[test]
    fn test_requests_exact_wake_by_default() {
        let (s, alarms) = scheduler(local(2026, 5, 10, 6, 0, 0));
        s.schedule_record(&medicine(1, 8, 0, true)).unwrap();
        assert_eq!(alarms.pending()[0].class, WakeClass::ExactAllowWhileIdle);
    }

    #[test]
    fn test_inexact_when_configured() {
        let alarms = Arc::new(RecordingAlarms::default());
        let config = SchedulerConfig { exact_wake: false, ..SchedulerConfig::default() };
        let s = AlarmScheduler::from_config(
            alarms.clone(),
            Arc::new(FixedClock(local(2026, 5, 10, 6, 0, 0))),
            &config,
        );
        s.schedule_record(&medicine(1, 8, 0, true)).unwrap();
        assert_eq!(alarms.pending()[0].class, WakeClass::Inexact);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (s, alarms) = scheduler(local(2026, 5, 10, 6, 0, 0));
        s.schedule_record(&medicine(1, 8, 0, true)).unwrap();
        s.cancel(1);
        s.cancel(1);
        s.cancel(42);
        assert!(alarms.pending().is_empty());
    }

    #[test]
    fn test_reschedule_all_only_active() {
        let (s, alarms) = scheduler(local(2026, 5, 10, 6, 0, 0));
        let records = vec![medicine(1, 8, 0, true), medicine(2, 9, 0, false)];
        let summary = s.reschedule_all(&records);
        assert_eq!(summary, RescheduleSummary { scheduled: 1, failed: 0 });
        let tokens: Vec<i64> = alarms.pending().iter().map(|p| p.token).collect();
        assert_eq!(tokens, vec![1]);
    }

    #[test]
    fn test_reschedule_all_counts_failures() {
        let (s, alarms) = scheduler(local(2026, 5, 10, 6, 0, 0));
        alarms.fail_registrations(true);
        let summary = s.reschedule_all(&[medicine(1, 8, 0, true), medicine(2, 9, 0, true)]);
        assert_eq!(summary, RescheduleSummary { scheduled: 0, failed: 2 });
    }

    #[test]
    fn test_honor_weekdays() {
        // 2026-05-08 is a Friday; weekday-only reminder moves to Monday.
        let alarms = Arc::new(RecordingAlarms::default());
        let config = SchedulerConfig { honor_weekdays: true, ..SchedulerConfig::default() };
        let s = AlarmScheduler::from_config(
            alarms.clone(),
            Arc::new(FixedClock(local(2026, 5, 8, 9, 0, 0))),
            &config,
        );
        let mut record = medicine(1, 8, 0, true);
        record.weekdays = "1,2,3,4,5".parse().unwrap();
        let fire_at = s.schedule_record(&record).unwrap();
        assert_eq!(fire_at.with_timezone(&Local), local(2026, 5, 11, 8, 0, 0));

        // Without the flag the stored weekdays are ignored.
        let (plain, _) = scheduler(local(2026, 5, 8, 9, 0, 0));
        let fire_at = plain.schedule_record(&record).unwrap();
        assert_eq!(fire_at.with_timezone(&Local), local(2026, 5, 9, 8, 0, 0));
    }
}
