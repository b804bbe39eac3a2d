//! MediRem configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MediremError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediremConfig {
    /// Directory holding the database. `~` is expanded by the binary.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_db_file")]
    pub db_file: String,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub haptics: HapticsConfig,
}

fn default_data_dir() -> String { "~/.medirem".into() }
fn default_db_file() -> String { "reminders.db".into() }

impl Default for MediremConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file: default_db_file(),
            scheduler: SchedulerConfig::default(),
            notify: NotifyConfig::default(),
            haptics: HapticsConfig::default(),
        }
    }
}

impl MediremConfig {
    /// Load config from the default path (~/.medirem/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediremError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| MediremError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the MediRem home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".medirem")
    }
}

/// Alarm scheduling behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Skip days not listed in a record's weekdays. Off by default: the
    /// stored weekdays are informational unless this is set.
    #[serde(default)]
    pub honor_weekdays: bool,
    /// Request exact, idle-allowed wakes.
    #[serde(default = "bool_true")]
    pub exact_wake: bool,
    /// How often the daemon re-derives alarms from the store.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
    /// Longest the daemon waits before re-checking the alarm table for
    /// registrations written by other processes.
    #[serde(default = "default_alarm_poll")]
    pub alarm_poll_ms: u64,
}

fn bool_true() -> bool { true }
fn default_reconcile_interval() -> u64 { 60 }
fn default_alarm_poll() -> u64 { 1000 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            honor_weekdays: false,
            exact_wake: true,
            reconcile_interval_secs: default_reconcile_interval(),
            alarm_poll_ms: default_alarm_poll(),
        }
    }
}

/// Notification rendering and delivery targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "bool_true")]
    pub sound: bool,
    /// Alternating off/on durations in milliseconds.
    #[serde(default = "default_vibration_pattern")]
    pub vibration_pattern: Vec<u64>,
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

fn default_vibration_pattern() -> Vec<u64> { vec![0, 500, 200, 500, 200, 500] }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sound: true,
            vibration_pattern: default_vibration_pattern(),
            webhooks: Vec::new(),
        }
    }
}

/// Outbound HTTP webhook that receives every posted notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticsConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

impl Default for HapticsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
