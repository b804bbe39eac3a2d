//! Reminder records: the one table both apps schedule from.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MediremError, Result};

/// Wall-clock local time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 {
            return Err(MediremError::validation(format!("hour {hour} out of range 0-23")));
        }
        if minute > 59 {
            return Err(MediremError::validation(format!("minute {minute} out of range 0-59")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// The time with seconds and sub-seconds zeroed.
    pub fn naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.into(), self.minute.into(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = MediremError;

    /// Parses `HH:MM` (24h).
    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| MediremError::validation(format!("expected HH:MM, got '{s}'")))?;
        let hour = h
            .parse()
            .map_err(|_| MediremError::validation(format!("invalid hour '{h}'")))?;
        let minute = m
            .parse()
            .map_err(|_| MediremError::validation(format!("invalid minute '{m}'")))?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = MediremError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

/// Set of weekdays, written as ISO day numbers: "1,2,3,4,5" (1 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Weekdays(u8);

impl Weekdays {
    pub const EVERY_DAY: Weekdays = Weekdays(0b111_1111);

    pub fn none() -> Self {
        Weekdays(0)
    }

    pub fn with(self, day: Weekday) -> Self {
        Weekdays(self.0 | 1 << day.num_days_from_monday())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_every_day(&self) -> bool {
        *self == Self::EVERY_DAY
    }
}

impl Default for Weekdays {
    fn default() -> Self {
        Self::EVERY_DAY
    }
}

impl fmt::Display for Weekdays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = (1..=7u8)
            .filter(|d| self.0 & (1 << (d - 1)) != 0)
            .map(|d| d.to_string())
            .collect();
        f.write_str(&days.join(","))
    }
}

impl FromStr for Weekdays {
    type Err = MediremError;

    fn from_str(s: &str) -> Result<Self> {
        let mut mask = 0u8;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: u8 = part
                .parse()
                .map_err(|_| MediremError::validation(format!("invalid weekday '{part}'")))?;
            if !(1..=7).contains(&day) {
                return Err(MediremError::validation(format!("weekday {day} out of range 1-7")));
            }
            mask |= 1 << (day - 1);
        }
        if mask == 0 {
            return Err(MediremError::validation("at least one weekday is required"));
        }
        Ok(Weekdays(mask))
    }
}

impl TryFrom<String> for Weekdays {
    type Error = MediremError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Weekdays> for String {
    fn from(w: Weekdays) -> Self {
        w.to_string()
    }
}

/// What a reminder is about. Opaque to scheduling; only rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReminderKind {
    Medicine {
        name: String,
        #[serde(default)]
        dose: String,
        #[serde(default)]
        frequency: String,
        #[serde(default)]
        notes: String,
    },
    ExpenseNudge {
        #[serde(default)]
        note: String,
    },
}

/// Coarse reminder category, used for notification channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Medicine,
    Expense,
}

impl ReminderKind {
    pub fn medicine(name: &str, dose: &str) -> Self {
        ReminderKind::Medicine {
            name: name.to_string(),
            dose: dose.to_string(),
            frequency: "Daily".to_string(),
            notes: String::new(),
        }
    }

    pub fn expense_nudge() -> Self {
        ReminderKind::ExpenseNudge { note: String::new() }
    }

    pub fn category(&self) -> Category {
        match self {
            ReminderKind::Medicine { .. } => Category::Medicine,
            ReminderKind::ExpenseNudge { .. } => Category::Expense,
        }
    }

    /// Stored in the `kind` column.
    pub fn label(&self) -> &'static str {
        match self {
            ReminderKind::Medicine { .. } => "medicine",
            ReminderKind::ExpenseNudge { .. } => "expense_nudge",
        }
    }

    fn trimmed(&self) -> Self {
        match self {
            ReminderKind::Medicine { name, dose, frequency, notes } => ReminderKind::Medicine {
                name: name.trim().to_string(),
                dose: dose.trim().to_string(),
                frequency: frequency.trim().to_string(),
                notes: notes.trim().to_string(),
            },
            ReminderKind::ExpenseNudge { note } => ReminderKind::ExpenseNudge {
                note: note.trim().to_string(),
            },
        }
    }
}

/// A schedulable reminder: one medicine dose or the daily expense nudge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    /// Assigned by the store; 0 until inserted. Also the alarm token.
    pub id: i64,
    pub kind: ReminderKind,
    pub time: TimeOfDay,
    pub active: bool,
    #[serde(default)]
    pub weekdays: Weekdays,
    pub created_at: DateTime<Utc>,
}

impl ReminderRecord {
    /// A new, active, every-day reminder not yet stored.
    pub fn new(kind: ReminderKind, time: TimeOfDay) -> Self {
        Self {
            id: 0,
            kind,
            time,
            active: true,
            weekdays: Weekdays::EVERY_DAY,
            created_at: Utc::now(),
        }
    }

    /// Trim text fields and reject a blank medicine name.
    pub fn validate(&self) -> Result<Self> {
        let kind = self.kind.trimmed();
        if let ReminderKind::Medicine { name, .. } = &kind
            && name.is_empty()
        {
            return Err(MediremError::validation("medicine name must not be blank"));
        }
        if self.weekdays.is_empty() {
            return Err(MediremError::validation("at least one weekday is required"));
        }
        Ok(Self { kind, ..self.clone() })
    }

    /// Display fields captured into the wake signal at schedule time.
    pub fn wake_payload(&self) -> WakePayload {
        let (title, detail) = match &self.kind {
            ReminderKind::Medicine { name, dose, .. } => (name.clone(), dose.clone()),
            ReminderKind::ExpenseNudge { note } => ("Expenses".to_string(), note.clone()),
        };
        WakePayload {
            record_id: self.id,
            category: self.kind.category(),
            title,
            detail,
        }
    }
}

/// Denormalized display fields delivered with a wake signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakePayload {
    pub record_id: i64,
    pub category: Category,
    pub title: String,
    pub detail: String,
}
