//! Record store trait: persistence for reminder records.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::error::Result;
use crate::record::ReminderRecord;

/// Reminder record persistence keyed by integer id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record and return its assigned id. `record.id` is ignored.
    async fn insert(&self, record: &ReminderRecord) -> Result<i64>;

    /// Overwrite the record with `record.id`.
    async fn update(&self, record: &ReminderRecord) -> Result<()>;

    /// Delete by id. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ReminderRecord>>;

    /// Flip the active flag. Returns whether the record exists.
    async fn set_active(&self, id: i64, active: bool) -> Result<bool>;

    /// All records, ordered by time of day.
    async fn list(&self) -> Result<Vec<ReminderRecord>>;

    async fn list_active(&self) -> Result<Vec<ReminderRecord>> {
        Ok(self.list().await?.into_iter().filter(|r| r.active).collect())
    }

    /// Live query: the current snapshot, then a new snapshot after every change.
    fn observe_all(&self) -> BoxStream<'static, Vec<ReminderRecord>>;

    /// Live query restricted to active records.
    fn observe_active(&self) -> BoxStream<'static, Vec<ReminderRecord>> {
        self.observe_all()
            .map(|records| records.into_iter().filter(|r| r.active).collect())
            .boxed()
    }
}
