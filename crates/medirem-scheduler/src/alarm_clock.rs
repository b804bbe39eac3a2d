//! Persistent alarm facility. Registrations live in an `alarms` table in
//! the reminder database, so the CLI and the daemon share one pending set:
//! a cancel in either process removes the wake the other would deliver.
//! Only [`SqliteAlarmClock::run`] delivers wakes.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use medirem_core::traits::{AlarmFacility, PendingAlarm, WakeClass, WakeSignal};
use medirem_core::{MediremError, Result, WakePayload};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::{Notify, mpsc};

/// How long a connection waits on a lock held by another process.
pub(crate) const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteAlarmClock {
    conn: Mutex<Connection>,
    /// Wakes the delivery loop when this process changes the table.
    changed: Notify,
}

impl SqliteAlarmClock {
    /// Open the alarm table in the database at `path`, creating it if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| MediremError::Alarm(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MediremError::Alarm(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| MediremError::Alarm(format!("Busy timeout: {e}")))?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS alarms (
                token INTEGER PRIMARY KEY,       -- reminder id
                fire_at_ms INTEGER NOT NULL,     -- unix millis, UTC
                class TEXT NOT NULL,             -- 'exact', 'inexact'
                payload TEXT NOT NULL            -- JSON WakePayload
            );
            CREATE INDEX IF NOT EXISTS idx_alarms_fire_at ON alarms(fire_at_ms);
            ",
        )
        .map_err(|e| MediremError::Alarm(format!("Migration: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            changed: Notify::new(),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| MediremError::Alarm("alarm table lock poisoned".into()))?;
        f(&conn)
    }

    /// Remove and return every registration due at or before `now`,
    /// earliest first. A row is handed out at most once.
    pub fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<WakeSignal>> {
        let mut due = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "DELETE FROM alarms WHERE fire_at_ms <= ?1
                     RETURNING token, fire_at_ms, class, payload",
                )
                .map_err(|e| MediremError::Alarm(format!("Take due: {e}")))?;
            let rows = stmt
                .query_map([now.timestamp_millis()], read_row)
                .map_err(|e| MediremError::Alarm(format!("Take due: {e}")))?;
            let alarms = collect_rows(rows);
            Ok(alarms)
        })?;
        due.sort_by_key(|p| p.fire_at);
        Ok(due
            .into_iter()
            .map(|p| WakeSignal {
                token: p.token,
                fire_at: p.fire_at,
                payload: p.payload,
            })
            .collect())
    }

    fn next_due(&self) -> Result<Option<DateTime<Utc>>> {
        let ms: Option<i64> = self.with_conn(|conn| {
            conn.query_row("SELECT MIN(fire_at_ms) FROM alarms", [], |row| row.get(0))
                .optional()
                .map(Option::flatten)
                .map_err(|e| MediremError::Alarm(format!("Next due: {e}")))
        })?;
        Ok(ms.and_then(DateTime::from_timestamp_millis))
    }

    /// Deliver due wakes on `wakes` until the receiver is dropped. Sleeps
    /// until the earliest registration but never longer than `poll`, so
    /// rows written by other processes are picked up.
    pub async fn run(&self, wakes: mpsc::UnboundedSender<WakeSignal>, poll: Duration) {
        tracing::info!("⏰ Alarm delivery started (checking every {}ms)", poll.as_millis());
        loop {
            match self.take_due(Utc::now()) {
                Ok(due) => {
                    for signal in due {
                        let token = signal.token;
                        if wakes.send(signal).is_err() {
                            tracing::warn!("⚠️ Wake for reminder {} dropped: no receiver", token);
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("⚠️ Alarm check failed: {e}"),
            }

            let wait = match self.next_due() {
                Ok(Some(at)) => (at - Utc::now()).to_std().unwrap_or_default().min(poll),
                Ok(None) => poll,
                Err(e) => {
                    tracing::warn!("⚠️ Alarm check failed: {e}");
                    poll
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.changed.notified() => {}
                _ = wakes.closed() => return,
            }
        }
    }
}

impl AlarmFacility for SqliteAlarmClock {
    fn register(
        &self,
        token: i64,
        fire_at: DateTime<Utc>,
        class: WakeClass,
        payload: WakePayload,
    ) -> Result<()> {
        let payload = serde_json::to_string(&payload)
            .map_err(|e| MediremError::Serialization(format!("wake payload: {e}")))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO alarms (token, fire_at_ms, class, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, fire_at.timestamp_millis(), class_label(class), payload],
            )
            .map_err(|e| MediremError::Alarm(format!("Register: {e}")))
        })?;
        self.changed.notify_one();
        Ok(())
    }

    fn cancel(&self, token: i64) {
        let result = self.with_conn(|conn| {
            conn.execute("DELETE FROM alarms WHERE token = ?1", [token])
                .map_err(|e| MediremError::Alarm(format!("Cancel: {e}")))
        });
        match result {
            Ok(_) => self.changed.notify_one(),
            Err(e) => tracing::warn!("⚠️ Cancel for reminder {} failed: {e}", token),
        }
    }

    fn pending(&self) -> Vec<PendingAlarm> {
        let result = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT token, fire_at_ms, class, payload FROM alarms ORDER BY token")
                .map_err(|e| MediremError::Alarm(format!("Pending: {e}")))?;
            let rows = stmt
                .query_map([], read_row)
                .map_err(|e| MediremError::Alarm(format!("Pending: {e}")))?;
            let alarms = collect_rows(rows);
            Ok(alarms)
        });
        result.unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not list pending alarms: {e}");
            Vec::new()
        })
    }
}

fn class_label(class: WakeClass) -> &'static str {
    match class {
        WakeClass::ExactAllowWhileIdle => "exact",
        WakeClass::Inexact => "inexact",
    }
}

/// Column values as stored.
struct RawAlarm {
    token: i64,
    fire_at_ms: i64,
    class: String,
    payload: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlarm> {
    Ok(RawAlarm {
        token: row.get(0)?,
        fire_at_ms: row.get(1)?,
        class: row.get(2)?,
        payload: row.get(3)?,
    })
}

impl RawAlarm {
    fn into_pending(self) -> Result<PendingAlarm> {
        let fire_at = DateTime::from_timestamp_millis(self.fire_at_ms)
            .ok_or_else(|| MediremError::Alarm(format!("alarm {} has a bad instant", self.token)))?;
        let payload: WakePayload = serde_json::from_str(&self.payload)
            .map_err(|e| MediremError::Serialization(format!("alarm {} payload: {e}", self.token)))?;
        Ok(PendingAlarm {
            token: self.token,
            fire_at,
            class: if self.class == "inexact" {
                WakeClass::Inexact
            } else {
                WakeClass::ExactAllowWhileIdle
            },
            payload,
        })
    }
}

fn collect_rows(
    rows: impl Iterator<Item = rusqlite::Result<RawAlarm>>,
) -> Vec<PendingAlarm> {
    let mut out = Vec::new();
    for row in rows {
        match row
            .map_err(|e| MediremError::Alarm(e.to_string()))
            .and_then(RawAlarm::into_pending)
        {
            Ok(alarm) => out.push(alarm),
            Err(e) => tracing::warn!("⚠️ Skipping unreadable alarm row: {e}"),
        }
    }
    out
}
