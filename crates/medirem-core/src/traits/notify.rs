//! Notification facility trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::notification::Notification;

/// Posts user notifications. A post with an id already shown replaces it.
#[async_trait]
pub trait NotificationFacility: Send + Sync {
    async fn post(&self, notification: &Notification) -> Result<()>;
}
