//! Break activity types.
//!
//! An activity is a candidate break action ("stand up and stretch",
//! "drink a glass of water"). Activities carry a relative selection weight
//! and a time-of-day bucket that restricts when they are eligible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named segment of the day used to filter candidate activities.
///
/// `Any` doubles as the catch-all bucket for night hours and as the
/// wildcard on activities that are eligible at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    EarlyMorning,
    LateMorning,
    Midday,
    Afternoon,
    Evening,
    LateEvening,
    Any,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::EarlyMorning => "EARLY_MORNING",
            TimeOfDay::LateMorning => "LATE_MORNING",
            TimeOfDay::Midday => "MIDDAY",
            TimeOfDay::Afternoon => "AFTERNOON",
            TimeOfDay::Evening => "EVENING",
            TimeOfDay::LateEvening => "LATE_EVENING",
            TimeOfDay::Any => "ANY",
        }
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        TimeOfDay::Any
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EARLY_MORNING" => Ok(TimeOfDay::EarlyMorning),
            "LATE_MORNING" => Ok(TimeOfDay::LateMorning),
            "MIDDAY" => Ok(TimeOfDay::Midday),
            "AFTERNOON" => Ok(TimeOfDay::Afternoon),
            "EVENING" => Ok(TimeOfDay::Evening),
            "LATE_EVENING" => Ok(TimeOfDay::LateEvening),
            "ANY" => Ok(TimeOfDay::Any),
            other => Err(format!("unknown time of day: {other}")),
        }
    }
}

/// A candidate break action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Relative selection probability; always >= 1.
    pub weight: i64,
    pub time_of_day: TimeOfDay,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Create a new activity with a fresh id and default weight/bucket.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            weight: 1,
            time_of_day: TimeOfDay::Any,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight.max(1);
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = time_of_day;
        self
    }
}
