//! SQLite-based storage for activities, tasks and statistics.
//!
//! The connection sits behind a mutex so read-modify-write sequences on a
//! record serialize; `mutate_task` performs load-apply-save under a single
//! lock hold to prevent lost updates from concurrent completions.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use super::data_dir;
use crate::activity::{Activity, TimeOfDay};
use crate::error::DatabaseError;
use crate::task::{Recurrence, Task};

/// Kind of completed item a statistics row refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Break,
    Todo,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Break => "BREAK",
            ActivityType::Todo => "TODO",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BREAK" => Ok(ActivityType::Break),
            "TODO" => Ok(ActivityType::Todo),
            other => Err(format!("unknown activity type: {other}")),
        }
    }
}

/// Append-only completion log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub id: i64,
    pub activity_title: String,
    pub activity_type: ActivityType,
    pub completed_at: DateTime<Utc>,
}

/// Parse datetime from RFC3339 string with fallback to current time.
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_datetime(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

fn row_to_activity(row: &rusqlite::Row) -> Result<Activity, rusqlite::Error> {
    let time_of_day: String = row.get(4)?;
    Ok(Activity {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        weight: row.get(3)?,
        time_of_day: time_of_day.parse().unwrap_or(TimeOfDay::Any),
        active: row.get(5)?,
        created_at: parse_datetime_fallback(&row.get::<_, String>(6)?),
    })
}

fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
    let category: String = row.get(3)?;
    let recurrence_kind: String = row.get(7)?;
    let recurrence_days: Option<String> = row.get(8)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: category.parse().unwrap_or_default(),
        due_date: parse_optional_datetime(row.get(4)?),
        completed: row.get(5)?,
        paused: row.get(6)?,
        recurrence: Recurrence {
            kind: recurrence_kind.parse().unwrap_or_default(),
            days_of_week: recurrence_days
                .map(|s| Recurrence::days_from_str(&s))
                .unwrap_or_default(),
        },
        reminder_enabled: row.get(9)?,
        reminder_lead_minutes: row.get(10)?,
        last_completed_at: parse_optional_datetime(row.get(11)?),
        next_due_at: parse_optional_datetime(row.get(12)?),
        created_at: parse_datetime_fallback(&row.get::<_, String>(13)?),
    })
}

const TASK_COLUMNS: &str = "id, title, description, category, due_date, is_completed, is_paused, \
     recurrence_kind, recurrence_days, reminder_enabled, reminder_lead_min, \
     last_completed_at, next_due_at, created_at";

/// SQLite database for activities, tasks and statistics.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/breakwise/breakwise.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?
            .join("breakwise.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and ephemeral runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.lock()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS activities (
                    id          TEXT PRIMARY KEY,
                    title       TEXT NOT NULL,
                    description TEXT,
                    weight      INTEGER NOT NULL DEFAULT 1,
                    time_of_day TEXT NOT NULL DEFAULT 'ANY',
                    is_active   INTEGER NOT NULL DEFAULT 1,
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id                TEXT PRIMARY KEY,
                    title             TEXT NOT NULL,
                    description       TEXT,
                    category          TEXT NOT NULL DEFAULT 'OTHER',
                    due_date          TEXT,
                    is_completed      INTEGER NOT NULL DEFAULT 0,
                    is_paused         INTEGER NOT NULL DEFAULT 0,
                    recurrence_kind   TEXT NOT NULL DEFAULT 'NONE',
                    recurrence_days   TEXT,
                    reminder_enabled  INTEGER NOT NULL DEFAULT 0,
                    reminder_lead_min INTEGER NOT NULL DEFAULT 15,
                    last_completed_at TEXT,
                    next_due_at       TEXT,
                    created_at        TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS statistics (
                    id             INTEGER PRIMARY KEY AUTOINCREMENT,
                    activity_title TEXT NOT NULL,
                    activity_type  TEXT NOT NULL DEFAULT 'BREAK',
                    completed_at   TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_activities_active_tod
                    ON activities(is_active, time_of_day);
                CREATE INDEX IF NOT EXISTS idx_tasks_completed_paused
                    ON tasks(is_completed, is_paused);
                CREATE INDEX IF NOT EXISTS idx_statistics_completed_at
                    ON statistics(completed_at);
                CREATE INDEX IF NOT EXISTS idx_statistics_type
                    ON statistics(activity_type, completed_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Activities ───────────────────────────────────────────────────

    /// Insert or fully replace an activity.
    pub fn insert_activity(&self, activity: &Activity) -> Result<(), DatabaseError> {
        self.lock().execute(
            "INSERT OR REPLACE INTO activities
             (id, title, description, weight, time_of_day, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                activity.id,
                activity.title,
                activity.description,
                activity.weight,
                activity.time_of_day.as_str(),
                activity.active,
                activity.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_activity(&self, id: &str) -> Result<bool, DatabaseError> {
        let changed = self
            .lock()
            .execute("DELETE FROM activities WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn activity(&self, id: &str) -> Result<Option<Activity>, DatabaseError> {
        let conn = self.lock();
        let result = conn
            .query_row(
                "SELECT id, title, description, weight, time_of_day, is_active, created_at
                 FROM activities WHERE id = ?1",
                params![id],
                row_to_activity,
            )
            .optional()?;
        Ok(result)
    }

    /// All activities, newest first. `active_only` filters to enabled ones.
    pub fn activities(&self, active_only: bool) -> Result<Vec<Activity>, DatabaseError> {
        let conn = self.lock();
        let sql = if active_only {
            "SELECT id, title, description, weight, time_of_day, is_active, created_at
             FROM activities WHERE is_active = 1 ORDER BY created_at DESC"
        } else {
            "SELECT id, title, description, weight, time_of_day, is_active, created_at
             FROM activities ORDER BY created_at DESC"
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], row_to_activity)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Active activities eligible for `bucket` (its own bucket or ANY),
    /// in insertion order so weighted draws are stable.
    pub fn activities_for_bucket(&self, bucket: TimeOfDay) -> Result<Vec<Activity>, DatabaseError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, weight, time_of_day, is_active, created_at
             FROM activities
             WHERE is_active = 1 AND (time_of_day = ?1 OR time_of_day = 'ANY')
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![bucket.as_str()], row_to_activity)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn activity_count(conn: &Connection) -> Result<i64, rusqlite::Error> {
        conn.query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))
    }

    /// Seed the default activity catalog on first run.
    ///
    /// A no-op whenever any activity already exists, so user edits are
    /// never overwritten. Returns the number of activities inserted.
    pub fn ensure_default_activities(&self) -> Result<usize, DatabaseError> {
        let mut conn = self.lock();
        if Self::activity_count(&conn)? > 0 {
            return Ok(0);
        }

        let defaults = default_activities();
        let tx = conn.transaction()?;
        for activity in &defaults {
            tx.execute(
                "INSERT INTO activities
                 (id, title, description, weight, time_of_day, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    activity.id,
                    activity.title,
                    activity.description,
                    activity.weight,
                    activity.time_of_day.as_str(),
                    activity.active,
                    activity.created_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(defaults.len())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    fn put_task(conn: &Connection, task: &Task) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT OR REPLACE INTO tasks
             (id, title, description, category, due_date, is_completed, is_paused,
              recurrence_kind, recurrence_days, reminder_enabled, reminder_lead_min,
              last_completed_at, next_due_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                task.id,
                task.title,
                task.description,
                task.category.as_str(),
                task.due_date.map(|d| d.to_rfc3339()),
                task.completed,
                task.paused,
                task.recurrence.kind.as_str(),
                task.recurrence.days_as_str(),
                task.reminder_enabled,
                task.reminder_lead_minutes,
                task.last_completed_at.map(|d| d.to_rfc3339()),
                task.next_due_at.map(|d| d.to_rfc3339()),
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_task(conn: &Connection, id: &str) -> Result<Option<Task>, rusqlite::Error> {
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            row_to_task,
        )
        .optional()
    }

    /// Insert or fully replace a task.
    pub fn save_task(&self, task: &Task) -> Result<(), DatabaseError> {
        Ok(Self::put_task(&self.lock(), task)?)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool, DatabaseError> {
        let changed = self
            .lock()
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn task(&self, id: &str) -> Result<Option<Task>, DatabaseError> {
        Ok(Self::get_task(&self.lock(), id)?)
    }

    /// All tasks, newest first.
    pub fn tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], row_to_task)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Tasks that are not completed (paused ones included; the scheduler
    /// filters those itself).
    pub fn pending_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE is_completed = 0 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], row_to_task)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Load-apply-save a task under a single lock hold.
    ///
    /// Two concurrent mutations of the same task serialize here, so
    /// neither update is lost. Returns the updated task, or `None` when
    /// the id is unknown.
    pub fn mutate_task<F>(&self, id: &str, apply: F) -> Result<Option<Task>, DatabaseError>
    where
        F: FnOnce(&mut Task),
    {
        let conn = self.lock();
        let Some(mut task) = Self::get_task(&conn, id)? else {
            return Ok(None);
        };
        apply(&mut task);
        Self::put_task(&conn, &task)?;
        Ok(Some(task))
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Append a completion record. Records are never mutated.
    pub fn append_statistics(
        &self,
        activity_title: &str,
        activity_type: ActivityType,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO statistics (activity_title, activity_type, completed_at)
             VALUES (?1, ?2, ?3)",
            params![
                activity_title,
                activity_type.as_str(),
                completed_at.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Records at or after `since`, newest first.
    pub fn statistics_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatisticsRecord>, DatabaseError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, activity_title, activity_type, completed_at
             FROM statistics WHERE completed_at >= ?1
             ORDER BY completed_at DESC",
        )?;
        let rows = stmt.query_map(params![since.to_rfc3339()], |row| {
            let activity_type: String = row.get(2)?;
            Ok(StatisticsRecord {
                id: row.get(0)?,
                activity_title: row.get(1)?,
                activity_type: activity_type.parse().unwrap_or(ActivityType::Break),
                completed_at: parse_datetime_fallback(&row.get::<_, String>(3)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Number of records at or after `since`, optionally restricted to a
    /// type.
    pub fn completed_count_since(
        &self,
        since: DateTime<Utc>,
        activity_type: Option<ActivityType>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.lock();
        let count = match activity_type {
            Some(t) => conn.query_row(
                "SELECT COUNT(*) FROM statistics
                 WHERE completed_at >= ?1 AND activity_type = ?2",
                params![since.to_rfc3339(), t.as_str()],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                "SELECT COUNT(*) FROM statistics WHERE completed_at >= ?1",
                params![since.to_rfc3339()],
                |row| row.get(0),
            )?,
        };
        Ok(count)
    }

    /// Per-weekday completion counts since `since`, Monday first.
    pub fn weekly_histogram(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, i64)>, DatabaseError> {
        let records = self.statistics_since(since)?;
        let mut counts = [0i64; 7];
        for record in records {
            let idx = record.completed_at.weekday().num_days_from_monday() as usize;
            counts[idx] += 1;
        }
        const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        Ok(DAYS.iter().copied().zip(counts).collect())
    }

    /// Per-type completion counts since `since`.
    pub fn type_breakdown_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(ActivityType, i64)>, DatabaseError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT activity_type, COUNT(*) FROM statistics
             WHERE completed_at >= ?1 GROUP BY activity_type",
        )?;
        let rows = stmt.query_map(params![since.to_rfc3339()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut breakdown = Vec::new();
        for row in rows {
            let (type_str, count) = row?;
            if let Ok(activity_type) = type_str.parse::<ActivityType>() {
                breakdown.push((activity_type, count));
            }
        }
        Ok(breakdown)
    }

    /// Delete records older than `before`. Retention cadence is the
    /// caller's concern; this is just the query.
    pub fn prune_statistics_before(&self, before: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let deleted = self.lock().execute(
            "DELETE FROM statistics WHERE completed_at < ?1",
            params![before.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}

/// The seed catalog inserted on first run: a spread of short break actions
/// across the day's buckets, heavier weights on the habit-forming ones.
fn default_activities() -> Vec<Activity> {
    let entry = |title: &str, description: &str, weight: i64, tod: TimeOfDay| {
        Activity::new(title)
            .with_description(description)
            .with_weight(weight)
            .with_time_of_day(tod)
    };
    vec![
        entry("Morning stretch", "Ten squats to wake the body up", 5, TimeOfDay::EarlyMorning),
        entry("30-second plank", "Core hold before the day starts", 4, TimeOfDay::EarlyMorning),
        entry("Desk push-ups", "Ten incline push-ups against the desk", 4, TimeOfDay::EarlyMorning),
        entry("Glass of water", "Kick-start your metabolism", 5, TimeOfDay::EarlyMorning),
        entry("Shoulder rolls", "Loosen up before the first meeting", 4, TimeOfDay::LateMorning),
        entry("Eye break", "Focus on something 20 meters away for 20 seconds", 5, TimeOfDay::LateMorning),
        entry("Walk to the window", "Two minutes of daylight", 3, TimeOfDay::LateMorning),
        entry("Lunchtime walk", "Ten minutes outside after eating", 5, TimeOfDay::Midday),
        entry("Neck stretch", "Slow circles, both directions", 4, TimeOfDay::Midday),
        entry("Stand and breathe", "Five deep breaths away from the screen", 3, TimeOfDay::Midday),
        entry("Stair climb", "Two flights, easy pace", 4, TimeOfDay::Afternoon),
        entry("Wrist stretch", "Relief for typing hands", 4, TimeOfDay::Afternoon),
        entry("Posture check", "Reset your chair and shoulders", 3, TimeOfDay::Afternoon),
        entry("Evening walk", "Wind down with a short stroll", 5, TimeOfDay::Evening),
        entry("Light stretching", "Hips and hamstrings after sitting", 4, TimeOfDay::Evening),
        entry("Tidy one surface", "Two minutes, one desk or shelf", 2, TimeOfDay::Evening),
        entry("Screen-free pause", "Put the phone down for five minutes", 4, TimeOfDay::LateEvening),
        entry("Gentle yoga", "A few calm poses before bed", 3, TimeOfDay::LateEvening),
        entry("Stand up and stretch", "Reach for the ceiling, ten seconds", 5, TimeOfDay::Any),
        entry("Drink some water", "Small sips count", 4, TimeOfDay::Any),
    ]
}
