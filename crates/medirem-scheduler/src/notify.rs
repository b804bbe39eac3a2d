//! Notification routing: the in-process notification tray plus outbound
//! webhooks. The tray holds one notification per record id, so re-posting
//! an id replaces what the user sees instead of stacking duplicates.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use medirem_core::config::NotifyConfig;
use medirem_core::traits::NotificationFacility;
use medirem_core::{MediremError, Notification, Result};

/// Where posted notifications are forwarded besides the tray.
#[derive(Debug, Clone)]
pub enum NotifyTarget {
    /// Generic HTTP webhook, POSTed a JSON body.
    Webhook {
        url: String,
        headers: Vec<(String, String)>,
    },
}

pub struct NotifyRouter {
    tray: Mutex<BTreeMap<i64, Notification>>,
    targets: Vec<NotifyTarget>,
    client: reqwest::Client,
}

impl NotifyRouter {
    pub fn new() -> Self {
        Self {
            tray: Mutex::new(BTreeMap::new()),
            targets: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Build the router with every webhook from config.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let mut router = Self::new();
        for webhook in config.webhooks.iter().filter(|w| !w.url.is_empty()) {
            router.add_target(NotifyTarget::Webhook {
                url: webhook.url.clone(),
                headers: webhook.headers.clone(),
            });
        }
        router
    }

    pub fn add_target(&mut self, target: NotifyTarget) {
        self.targets.push(target);
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Notifications currently shown, ordered by id.
    pub fn tray(&self) -> Vec<Notification> {
        self.tray
            .lock()
            .map(|tray| tray.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Dismiss the notification for `id`, if shown.
    pub fn dismiss(&self, id: i64) -> bool {
        self.tray
            .lock()
            .map(|mut tray| tray.remove(&id).is_some())
            .unwrap_or(false)
    }

    async fn send(&self, target: &NotifyTarget, notification: &Notification) -> Result<()> {
        match target {
            NotifyTarget::Webhook { url, headers } => {
                send_webhook(&self.client, url, headers, notification).await
            }
        }
    }
}

impl Default for NotifyRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationFacility for NotifyRouter {
    async fn post(&self, notification: &Notification) -> Result<()> {
        let replaced = {
            let mut tray = self
                .tray
                .lock()
                .map_err(|_| MediremError::Notify("tray lock poisoned".into()))?;
            tray.insert(notification.id, notification.clone()).is_some()
        };
        tracing::info!(
            "🔔 [{}] {} — {}{}",
            notification.channel_id,
            notification.title,
            notification.body,
            if replaced { " (replaced)" } else { "" }
        );

        let mut failures = Vec::new();
        for target in &self.targets {
            if let Err(e) = self.send(target, notification).await {
                tracing::warn!("⚠️ Notification {} not forwarded: {e}", notification.id);
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MediremError::Notify(failures.join("; ")))
        }
    }
}

/// Send notification via generic HTTP webhook.
async fn send_webhook(
    client: &reqwest::Client,
    url: &str,
    headers: &[(String, String)],
    notification: &Notification,
) -> Result<()> {
    let mut req = client
        .post(url)
        .json(&serde_json::json!({
            "record_id": notification.id,
            "channel": notification.channel_id,
            "title": notification.title,
            "body": notification.body,
            "priority": format!("{:?}", notification.priority),
            "timestamp": notification.timestamp.to_rfc3339(),
        }))
        .timeout(std::time::Duration::from_secs(10));

    for (key, value) in headers {
        req = req.header(key.as_str(), value.as_str());
    }

    let resp = req
        .send()
        .await
        .map_err(|e| MediremError::Notify(format!("Webhook send failed: {e}")))?;

    if resp.status().is_success() {
        tracing::debug!("✅ Webhook notification sent to {}: {}", url, notification.title);
        Ok(())
    } else {
        Err(MediremError::Notify(format!("Webhook error {}", resp.status())))
    }
}
