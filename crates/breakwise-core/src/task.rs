//! To-do task types with optional scheduling.
//!
//! A task may carry a due date, a recurrence rule and a reminder lead
//! time. `next_due_at` is the due date used for the *next* reminder
//! computation; it is advanced only by the engine (on completion), never
//! directly by the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// How a task repeats after completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceKind {
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    /// Repeats on an explicit set of weekdays (1 = Monday .. 7 = Sunday).
    CustomDays,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::None => "NONE",
            RecurrenceKind::Daily => "DAILY",
            RecurrenceKind::Weekly => "WEEKLY",
            RecurrenceKind::Biweekly => "BIWEEKLY",
            RecurrenceKind::Monthly => "MONTHLY",
            RecurrenceKind::CustomDays => "CUSTOM_DAYS",
        }
    }
}

impl Default for RecurrenceKind {
    fn default() -> Self {
        RecurrenceKind::None
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(RecurrenceKind::None),
            "DAILY" => Ok(RecurrenceKind::Daily),
            "WEEKLY" => Ok(RecurrenceKind::Weekly),
            "BIWEEKLY" => Ok(RecurrenceKind::Biweekly),
            "MONTHLY" => Ok(RecurrenceKind::Monthly),
            "CUSTOM_DAYS" => Ok(RecurrenceKind::CustomDays),
            other => Err(format!("unknown recurrence kind: {other}")),
        }
    }
}

/// Recurrence rule: a kind plus, for `CustomDays`, the weekday set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Recurrence {
    pub kind: RecurrenceKind,
    /// ISO weekday numbers (1 = Monday .. 7 = Sunday). Only meaningful for
    /// `CustomDays`, where it must be non-empty.
    #[serde(default)]
    pub days_of_week: BTreeSet<u8>,
}

impl Recurrence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(kind: RecurrenceKind) -> Self {
        Self {
            kind,
            days_of_week: BTreeSet::new(),
        }
    }

    pub fn custom_days(days: impl IntoIterator<Item = u8>) -> Self {
        Self {
            kind: RecurrenceKind::CustomDays,
            days_of_week: days.into_iter().collect(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.kind != RecurrenceKind::None
    }

    /// Enforce the rule invariants: `CustomDays` needs a non-empty set of
    /// valid ISO weekdays.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.kind == RecurrenceKind::CustomDays {
            if self.days_of_week.is_empty() {
                return Err(ValidationError::EmptyCollection(
                    "recurrence.days_of_week".into(),
                ));
            }
            if let Some(day) = self.days_of_week.iter().find(|d| !(1..=7).contains(*d)) {
                return Err(ValidationError::InvalidValue {
                    field: "recurrence.days_of_week".into(),
                    message: format!("weekday {day} outside 1..=7"),
                });
            }
        }
        Ok(())
    }

    /// Serialize the weekday set as stored in the database ("1,3,5").
    pub fn days_as_str(&self) -> Option<String> {
        if self.days_of_week.is_empty() {
            None
        } else {
            Some(
                self.days_of_week
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
    }

    /// Parse a stored weekday set ("1,3,5"); unknown fragments are dropped.
    pub fn days_from_str(s: &str) -> BTreeSet<u8> {
        s.split(',')
            .filter_map(|part| part.trim().parse::<u8>().ok())
            .filter(|d| (1..=7).contains(d))
            .collect()
    }
}

/// Category used to group and decorate tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Sport,
    Walk,
    Bike,
    Shopping,
    Health,
    Relax,
    Sauna,
    Work,
    Study,
    Home,
    Food,
    Travel,
    Other,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Sport => "SPORT",
            TaskCategory::Walk => "WALK",
            TaskCategory::Bike => "BIKE",
            TaskCategory::Shopping => "SHOPPING",
            TaskCategory::Health => "HEALTH",
            TaskCategory::Relax => "RELAX",
            TaskCategory::Sauna => "SAUNA",
            TaskCategory::Work => "WORK",
            TaskCategory::Study => "STUDY",
            TaskCategory::Home => "HOME",
            TaskCategory::Food => "FOOD",
            TaskCategory::Travel => "TRAVEL",
            TaskCategory::Other => "OTHER",
        }
    }
}

impl Default for TaskCategory {
    fn default() -> Self {
        TaskCategory::Other
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SPORT" => Ok(TaskCategory::Sport),
            "WALK" => Ok(TaskCategory::Walk),
            "BIKE" => Ok(TaskCategory::Bike),
            "SHOPPING" => Ok(TaskCategory::Shopping),
            "HEALTH" => Ok(TaskCategory::Health),
            "RELAX" => Ok(TaskCategory::Relax),
            "SAUNA" => Ok(TaskCategory::Sauna),
            "WORK" => Ok(TaskCategory::Work),
            "STUDY" => Ok(TaskCategory::Study),
            "HOME" => Ok(TaskCategory::Home),
            "FOOD" => Ok(TaskCategory::Food),
            "TRAVEL" => Ok(TaskCategory::Travel),
            "OTHER" => Ok(TaskCategory::Other),
            other => Err(format!("unknown task category: {other}")),
        }
    }
}

/// A to-do item with optional scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub paused: bool,
    pub recurrence: Recurrence,
    pub reminder_enabled: bool,
    /// Minutes before the due date at which the reminder fires.
    pub reminder_lead_minutes: i64,
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Due date used for the next reminder computation. Advanced only by
    /// the engine on completion of a recurring task.
    pub next_due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with a fresh id and no scheduling.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            category: TaskCategory::Other,
            due_date: None,
            completed: false,
            paused: false,
            recurrence: Recurrence::none(),
            reminder_enabled: false,
            reminder_lead_minutes: 15,
            last_completed_at: None,
            next_due_at: None,
            created_at: Utc::now(),
        }
    }

    /// Set a due date; the first reminder computation starts from it.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self.next_due_at = Some(due);
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn with_reminder(mut self, lead_minutes: i64) -> Self {
        self.reminder_enabled = true;
        self.reminder_lead_minutes = lead_minutes.max(0);
        self
    }

    /// The due date the next reminder is computed from.
    pub fn effective_due(&self) -> Option<DateTime<Utc>> {
        self.next_due_at.or(self.due_date)
    }

    /// Whether a reminder may be armed for this task at all.
    pub fn reminder_eligible(&self) -> bool {
        self.reminder_enabled && !self.completed && !self.paused && self.effective_due().is_some()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reminder_lead_minutes < 0 {
            return Err(ValidationError::InvalidValue {
                field: "reminder_lead_minutes".into(),
                message: "must be >= 0".into(),
            });
        }
        self.recurrence.validate()
    }
}
