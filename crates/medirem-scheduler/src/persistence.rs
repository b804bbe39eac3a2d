//! SQLite-backed reminder record store.
//! Every successful mutation publishes a fresh snapshot on a watch channel,
//! which backs the live `observe_*` queries.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use medirem_core::traits::RecordStore;
use medirem_core::{MediremError, ReminderKind, ReminderRecord, Result, TimeOfDay, Weekdays};
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::alarm_clock::BUSY_TIMEOUT;

const SELECT_COLUMNS: &str =
    "SELECT id, kind, details, hour, minute, weekdays, active, created_at FROM reminders";

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    snapshots: watch::Sender<Vec<ReminderRecord>>,
}

impl SqliteRecordStore {
    /// Open or create the reminder database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| MediremError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MediremError::Store(format!("DB open: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| MediremError::Store(format!("Busy timeout: {e}")))?;
        migrate(&conn)?;
        let records = load_all(&conn)?;
        let (snapshots, _) = watch::channel(records);
        Ok(Self {
            conn: Mutex::new(conn),
            snapshots,
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| MediremError::store("connection lock poisoned"))?;
        f(&conn)
    }

    /// Run a mutation and publish the resulting snapshot.
    fn mutate<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let (out, records) = self.with_conn(|conn| {
            let out = f(conn)?;
            Ok((out, load_all(conn)?))
        })?;
        self.snapshots.send_replace(records);
        Ok(out)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,              -- 'medicine', 'expense_nudge'
            details TEXT NOT NULL,           -- JSON: descriptive fields
            hour INTEGER NOT NULL,
            minute INTEGER NOT NULL,
            weekdays TEXT NOT NULL DEFAULT '1,2,3,4,5,6,7',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_reminders_active ON reminders(active);
        ",
    )
    .map_err(|e| MediremError::Store(format!("Migration: {e}")))
}

fn load_all(conn: &Connection) -> Result<Vec<ReminderRecord>> {
    let mut stmt = conn
        .prepare(&format!("{SELECT_COLUMNS} ORDER BY hour ASC, minute ASC, id ASC"))
        .map_err(|e| MediremError::Store(format!("Load reminders: {e}")))?;
    let rows = stmt
        .query_map([], read_row)
        .map_err(|e| MediremError::Store(format!("Load reminders: {e}")))?;

    let mut records = Vec::new();
    for row in rows {
        match row {
            Ok(raw) => match raw.into_record() {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("⚠️ Skipping unreadable reminder row: {e}"),
            },
            Err(e) => tracing::warn!("⚠️ Skipping unreadable reminder row: {e}"),
        }
    }
    Ok(records)
}

/// Column values as stored, before domain validation.
struct RawRow {
    id: i64,
    details: String,
    hour: u8,
    minute: u8,
    weekdays: String,
    active: bool,
    created_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        details: row.get(2)?,
        hour: row.get(3)?,
        minute: row.get(4)?,
        weekdays: row.get(5)?,
        active: row.get::<_, i32>(6)? != 0,
        created_at: row.get(7)?,
    })
}

impl RawRow {
    fn into_record(self) -> Result<ReminderRecord> {
        let kind: ReminderKind = serde_json::from_str(&self.details)
            .map_err(|e| MediremError::Serialization(format!("reminder {} details: {e}", self.id)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(ReminderRecord {
            id: self.id,
            kind,
            time: TimeOfDay::new(self.hour, self.minute)?,
            active: self.active,
            weekdays: self.weekdays.parse().unwrap_or(Weekdays::EVERY_DAY),
            created_at,
        })
    }
}

fn details_json(record: &ReminderRecord) -> Result<String> {
    serde_json::to_string(&record.kind)
        .map_err(|e| MediremError::Serialization(format!("reminder details: {e}")))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &ReminderRecord) -> Result<i64> {
        let details = details_json(record)?;
        let id = self.mutate(|conn| {
            conn.execute(
                "INSERT INTO reminders (kind, details, hour, minute, weekdays, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.kind.label(),
                    details,
                    record.time.hour(),
                    record.time.minute(),
                    record.weekdays.to_string(),
                    record.active as i32,
                    record.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| MediremError::Store(format!("Insert reminder: {e}")))?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!("💾 Reminder {} stored", id);
        Ok(id)
    }

    async fn update(&self, record: &ReminderRecord) -> Result<()> {
        let details = details_json(record)?;
        let changed = self.mutate(|conn| {
            conn.execute(
                "UPDATE reminders SET kind = ?1, details = ?2, hour = ?3, minute = ?4,
                 weekdays = ?5, active = ?6 WHERE id = ?7",
                params![
                    record.kind.label(),
                    details,
                    record.time.hour(),
                    record.time.minute(),
                    record.weekdays.to_string(),
                    record.active as i32,
                    record.id,
                ],
            )
            .map_err(|e| MediremError::Store(format!("Update reminder: {e}")))
        })?;
        if changed == 0 {
            return Err(MediremError::NotFound(record.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.mutate(|conn| {
            conn.execute("DELETE FROM reminders WHERE id = ?1", [id])
                .map_err(|e| MediremError::Store(format!("Delete reminder: {e}")))
        })?;
        Ok(removed > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ReminderRecord>> {
        let raw = self.with_conn(|conn| {
            conn.query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], read_row)
                .optional()
                .map_err(|e| MediremError::Store(format!("Get reminder: {e}")))
        })?;
        raw.map(RawRow::into_record).transpose()
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let changed = self.mutate(|conn| {
            conn.execute(
                "UPDATE reminders SET active = ?1 WHERE id = ?2",
                params![active as i32, id],
            )
            .map_err(|e| MediremError::Store(format!("Set active: {e}")))
        })?;
        Ok(changed > 0)
    }

    async fn list(&self) -> Result<Vec<ReminderRecord>> {
        self.with_conn(load_all)
    }

    fn observe_all(&self) -> BoxStream<'static, Vec<ReminderRecord>> {
        WatchStream::new(self.snapshots.subscribe()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(name: &str, hour: u8, minute: u8) -> ReminderRecord {
        ReminderRecord::new(
            ReminderKind::medicine(name, "10mg"),
            TimeOfDay::new(hour, minute).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_open_and_migrate() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_file_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("medirem-store-test-{}", std::process::id()));
        let path = dir.join("reminders.db");
        {
            let store = SqliteRecordStore::open(&path).unwrap();
            store.insert(&medicine("Aspirin", 8, 0)).await.unwrap();
        }
        let store = SqliteRecordStore::open(&path).unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let id = store.insert(&medicine("Aspirin", 8, 0)).await.unwrap();
        assert!(id > 0);

        let mut loaded = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.kind, ReminderKind::medicine("Aspirin", "10mg"));
        assert!(loaded.active);

        loaded.time = TimeOfDay::new(21, 30).unwrap();
        loaded.weekdays = "6,7".parse().unwrap();
        store.update(&loaded).await.unwrap();
        let reloaded = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(reloaded.time.to_string(), "21:30");
        assert_eq!(reloaded.weekdays.to_string(), "6,7");

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let mut ghost = medicine("Ghost", 8, 0);
        ghost.id = 99;
        assert!(matches!(store.update(&ghost).await, Err(MediremError::NotFound(99))));
    }

    #[tokio::test]
    async fn test_set_active_and_list_active() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store.insert(&medicine("A", 8, 0)).await.unwrap();
        let b = store.insert(&medicine("B", 9, 0)).await.unwrap();
        assert!(store.set_active(a, false).await.unwrap());
        assert!(!store.set_active(404, false).await.unwrap());

        let active: Vec<i64> = store.list_active().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(active, vec![b]);
    }

    #[tokio::test]
    async fn test_list_ordered_by_time() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.insert(&medicine("Night", 22, 0)).await.unwrap();
        store.insert(&medicine("Morning", 7, 45)).await.unwrap();
        store.insert(&medicine("Noon", 12, 0)).await.unwrap();
        let times: Vec<String> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|r| r.time.to_string())
            .collect();
        assert_eq!(times, vec!["07:45", "12:00", "22:00"]);
    }

    #[tokio::test]
    async fn test_observe_emits_snapshots() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let mut all = store.observe_all();
        let mut active = store.observe_active();
        assert!(all.next().await.unwrap().is_empty());
        assert!(active.next().await.unwrap().is_empty());

        let id = store.insert(&medicine("Aspirin", 8, 0)).await.unwrap();
        assert_eq!(all.next().await.unwrap().len(), 1);
        assert_eq!(active.next().await.unwrap().len(), 1);

        store.set_active(id, false).await.unwrap();
        assert_eq!(all.next().await.unwrap().len(), 1);
        assert!(active.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expense_nudge_roundtrip() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let nudge = ReminderRecord::new(ReminderKind::expense_nudge(), TimeOfDay::new(21, 0).unwrap());
        let id = store.insert(&nudge).await.unwrap();
        let loaded = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded.kind, ReminderKind::expense_nudge());
    }
}
