//! Daily active window gate.
//!
//! Reminders only fire inside a configured daily time window. The gate is
//! a pure function over wall-clock time; callers pass the current local
//! time explicitly.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Daily window in which reminders may fire, inclusive on both ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveWindow {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub start_minute: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default)]
    pub end_minute: u32,
}

fn default_start_hour() -> u32 {
    9
}
fn default_end_hour() -> u32 {
    18
}

impl Default for ActiveWindow {
    fn default() -> Self {
        Self {
            start_hour: 9,
            start_minute: 0,
            end_hour: 18,
            end_minute: 0,
        }
    }
}

impl ActiveWindow {
    pub fn start_minutes(&self) -> u32 {
        self.start_hour * 60 + self.start_minute
    }

    pub fn end_minutes(&self) -> u32 {
        self.end_hour * 60 + self.end_minute
    }

    /// Reject out-of-range hour/minute fields at settings-write time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("window.start_hour", self.start_hour, 23),
            ("window.start_minute", self.start_minute, 59),
            ("window.end_hour", self.end_hour, 23),
            ("window.end_minute", self.end_minute, 59),
        ];
        for (key, value, max) in fields {
            if value > max {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("{value} exceeds {max}"),
                });
            }
        }
        Ok(())
    }
}

/// Whether `now` falls inside the window, inclusive on both ends.
///
/// The comparison is deliberately non-wrapping: a window whose start lies
/// after its end (e.g. 22:00-06:00) is never active. Midnight-crossing
/// windows are unsupported.
pub fn is_active(now: NaiveTime, window: &ActiveWindow) -> bool {
    let now_minutes = now.hour() * 60 + now.minute();
    window.start_minutes() <= now_minutes && now_minutes <= window.end_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(sh: u32, sm: u32, eh: u32, em: u32) -> ActiveWindow {
        ActiveWindow {
            start_hour: sh,
            start_minute: sm,
            end_hour: eh,
            end_minute: em,
        }
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn inclusive_on_both_ends() {
        let w = window(9, 0, 18, 0);
        assert!(is_active(at(9, 0), &w));
        assert!(is_active(at(18, 0), &w));
        assert!(is_active(at(12, 30), &w));
        assert!(!is_active(at(8, 59), &w));
        assert!(!is_active(at(18, 1), &w));
    }

    #[test]
    fn minutes_matter() {
        let w = window(9, 30, 17, 45);
        assert!(!is_active(at(9, 29), &w));
        assert!(is_active(at(9, 30), &w));
        assert!(is_active(at(17, 45), &w));
        assert!(!is_active(at(17, 46), &w));
    }

    #[test]
    fn midnight_crossing_window_is_never_active() {
        let w = window(22, 0, 6, 0);
        assert!(!is_active(at(23, 0), &w));
        assert!(!is_active(at(3, 0), &w));
        assert!(!is_active(at(22, 0), &w));
    }

    #[test]
    fn degenerate_single_minute_window() {
        let w = window(12, 0, 12, 0);
        assert!(is_active(at(12, 0), &w));
        assert!(!is_active(at(12, 1), &w));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(window(24, 0, 18, 0).validate().is_err());
        assert!(window(9, 60, 18, 0).validate().is_err());
        assert!(window(9, 0, 18, 0).validate().is_ok());
    }
}
