//! User-facing notification content.

use serde::{Deserialize, Serialize};

use crate::config::NotifyConfig;
use crate::record::{Category, WakePayload};

pub const MEDICINE_CHANNEL_ID: &str = "medicine_reminder_channel";
pub const EXPENSE_CHANNEL_ID: &str = "expense_reminder_channel";

/// A notification to post. `id` is the record id; posting the same id
/// again replaces the earlier notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    /// Expanded text shown when the notification is opened.
    pub big_text: String,
    pub priority: NotifyPriority,
    /// Play the default notification sound.
    pub sound: bool,
    pub vibration_pattern: Vec<u64>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Notification priority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotifyPriority {
    Low,
    Normal,
    High,
}

impl Notification {
    /// Render the reminder notification for a wake payload.
    pub fn for_payload(payload: &WakePayload, config: &NotifyConfig) -> Self {
        let (channel_id, title, body, big_text) = match payload.category {
            Category::Medicine => {
                let dose = if payload.detail.is_empty() {
                    String::new()
                } else {
                    format!(" - {}", payload.detail)
                };
                (
                    MEDICINE_CHANNEL_ID,
                    "💊 Time to take your medicine".to_string(),
                    format!("{}{dose}", payload.title),
                    format!("It's time to take: {}{dose}\n\nTap to open the app", payload.title),
                )
            }
            Category::Expense => {
                let body = if payload.detail.is_empty() {
                    "Don't forget to write down what you spent today".to_string()
                } else {
                    payload.detail.clone()
                };
                (
                    EXPENSE_CHANNEL_ID,
                    "💰 Did you log your expenses?".to_string(),
                    body,
                    "Keeping a daily record of your expenses matters. Tap here to log them!"
                        .to_string(),
                )
            }
        };

        Self {
            id: payload.record_id,
            channel_id: channel_id.to_string(),
            title,
            body,
            big_text,
            priority: NotifyPriority::High,
            sound: config.sound,
            vibration_pattern: config.vibration_pattern.clone(),
            timestamp: chrono::Utc::now(),
        }
    }
}
