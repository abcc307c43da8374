//! Named-job scheduler.
//!
//! Manages exactly two job kinds: the recurring break tick and per-task
//! one-shot reminders, each under a stable name that guarantees at most
//! one outstanding job per key. The scheduler owns no threads -- the host
//! is responsible for calling `poll()` periodically and dispatching the
//! fires it returns, in the same caller-driven style as a wall-clock
//! timer engine.
//!
//! Job names:
//! - `"break"` -- the periodic break reminder
//! - `"break:postpone"` -- a postponed break reminder (one-shot)
//! - `"todo:<taskId>"` -- a task reminder (one-shot)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::recurrence::fire_time;
use crate::storage::Settings;
use crate::task::Task;

/// Name of the periodic break job.
pub const BREAK_JOB: &str = "break";
/// Name of the one-shot job armed when a break reminder is postponed.
pub const BREAK_POSTPONE_JOB: &str = "break:postpone";
/// Prefix of per-task one-shot job names.
pub const TODO_JOB_PREFIX: &str = "todo:";

/// Job name for a task's reminder.
pub fn todo_job_name(task_id: &str) -> String {
    format!("{TODO_JOB_PREFIX}{task_id}")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Periodic,
    OneShot,
}

/// A live entry in the job table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub name: String,
    pub kind: JobKind,
    pub fire_at: DateTime<Utc>,
    /// Cadence for periodic jobs; `None` for one-shots.
    pub interval_minutes: Option<u64>,
    /// Task id for one-shot task reminders.
    pub payload: Option<String>,
}

/// A due job handed to the host for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFire {
    pub name: String,
    pub payload: Option<String>,
    /// The fire time the job was armed for (not the poll instant).
    pub fire_at: DateTime<Utc>,
}

/// Thread-safe job table. Enqueue/cancel/replace on a given name are
/// atomic with respect to each other: there is no window in which two
/// jobs with the same name are simultaneously live.
pub struct Scheduler {
    jobs: Mutex<HashMap<String, ScheduledJob>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue or update the periodic job under `name` (UPDATE policy).
    ///
    /// An existing periodic job keeps its next fire boundary; only the
    /// interval changes, so a new cadence takes effect from the next tick.
    /// A fresh job first fires one full interval from `now`.
    pub fn enqueue_periodic(&self, name: &str, interval_minutes: u64, now: DateTime<Utc>) {
        let interval_minutes = interval_minutes.max(1);
        let mut jobs = self.lock();
        match jobs.get_mut(name) {
            Some(job) if job.kind == JobKind::Periodic => {
                job.interval_minutes = Some(interval_minutes);
            }
            _ => {
                jobs.insert(
                    name.to_string(),
                    ScheduledJob {
                        name: name.to_string(),
                        kind: JobKind::Periodic,
                        fire_at: now + Duration::minutes(interval_minutes as i64),
                        interval_minutes: Some(interval_minutes),
                        payload: None,
                    },
                );
            }
        }
    }

    /// Enqueue a one-shot job under `name` (REPLACE policy): any existing
    /// job under the name is cancelled and the new one installed as a
    /// single transition.
    pub fn enqueue_one_shot(
        &self,
        name: &str,
        fire_at: DateTime<Utc>,
        payload: Option<String>,
    ) {
        let mut jobs = self.lock();
        jobs.insert(
            name.to_string(),
            ScheduledJob {
                name: name.to_string(),
                kind: JobKind::OneShot,
                fire_at,
                interval_minutes: None,
                payload,
            },
        );
    }

    /// Arm (or re-arm) the reminder one-shot for `task`.
    ///
    /// Computes the fire time from the task's effective due date and lead
    /// minutes. A fire time not strictly in the future is silently
    /// skipped; returns whether a job was armed.
    pub fn schedule_task_reminder(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if !task.reminder_eligible() {
            return false;
        }
        let Some(due) = task.effective_due() else {
            return false;
        };
        let fire_at = fire_time(due, task.reminder_lead_minutes);
        if fire_at <= now {
            tracing::debug!(task = %task.id, %fire_at, "reminder fire time already passed, skipping");
            return false;
        }
        self.enqueue_one_shot(&todo_job_name(&task.id), fire_at, Some(task.id.clone()));
        true
    }

    /// Cancel the job under `name`. Returns whether a job was removed.
    /// A cancelled name never fires after this call returns.
    pub fn cancel(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    /// Cancel every job whose name starts with `prefix`. Returns the
    /// number of jobs removed.
    pub fn cancel_all(&self, prefix: &str) -> usize {
        let mut jobs = self.lock();
        let names: Vec<String> = jobs
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in &names {
            jobs.remove(name);
        }
        names.len()
    }

    /// Collect jobs due at `now`.
    ///
    /// Due one-shots are removed from the table; due periodic jobs are
    /// re-armed one full interval past `now` (a tick that fires late does
    /// not cause a catch-up burst). Fires are returned oldest first.
    pub fn poll(&self, now: DateTime<Utc>) -> Vec<JobFire> {
        let mut jobs = self.lock();
        let due: Vec<String> = jobs
            .values()
            .filter(|job| job.fire_at <= now)
            .map(|job| job.name.clone())
            .collect();

        let mut fires = Vec::with_capacity(due.len());
        for name in due {
            let Some(kind) = jobs.get(&name).map(|job| job.kind) else {
                continue;
            };
            match kind {
                JobKind::OneShot => {
                    if let Some(job) = jobs.remove(&name) {
                        fires.push(JobFire {
                            name: job.name,
                            payload: job.payload,
                            fire_at: job.fire_at,
                        });
                    }
                }
                JobKind::Periodic => {
                    if let Some(job) = jobs.get_mut(&name) {
                        fires.push(JobFire {
                            name: job.name.clone(),
                            payload: None,
                            fire_at: job.fire_at,
                        });
                        let interval = job.interval_minutes.unwrap_or(1).max(1);
                        job.fire_at = now + Duration::minutes(interval as i64);
                    }
                }
            }
        }

        fires.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then(a.name.cmp(&b.name)));
        fires
    }

    /// Rebuild the job table from persisted state after a process restart.
    ///
    /// Re-enqueues the periodic break job when the master switch is on,
    /// and a one-shot for every non-completed, non-paused task with an
    /// enabled reminder and a computable future fire time.
    pub fn rehydrate(&self, settings: &Settings, tasks: &[Task], now: DateTime<Utc>) {
        if settings.reminders.enabled {
            self.enqueue_periodic(BREAK_JOB, settings.reminders.interval_minutes, now);
        }
        let mut armed = 0usize;
        for task in tasks {
            if self.schedule_task_reminder(task, now) {
                armed += 1;
            }
        }
        tracing::debug!(tasks = armed, "scheduler rehydrated");
    }

    /// Snapshot of the job under `name`, if live.
    pub fn job(&self, name: &str) -> Option<ScheduledJob> {
        self.lock().get(name).cloned()
    }

    /// Number of live jobs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn one_shot_replaces_not_duplicates() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_one_shot("todo:1", at(10, 0), Some("1".into()));
        scheduler.enqueue_one_shot("todo:1", at(11, 0), Some("1".into()));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.job("todo:1").unwrap().fire_at, at(11, 0));
    }

    #[test]
    fn periodic_update_keeps_fire_boundary() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_periodic(BREAK_JOB, 30, at(9, 0));
        let first_boundary = scheduler.job(BREAK_JOB).unwrap().fire_at;
        assert_eq!(first_boundary, at(9, 30));

        // Interval change does not reset the pending boundary.
        scheduler.enqueue_periodic(BREAK_JOB, 60, at(9, 10));
        let job = scheduler.job(BREAK_JOB).unwrap();
        assert_eq!(job.fire_at, first_boundary);
        assert_eq!(job.interval_minutes, Some(60));

        // New cadence applies from the next tick onward.
        let fires = scheduler.poll(at(9, 30));
        assert_eq!(fires.len(), 1);
        assert_eq!(scheduler.job(BREAK_JOB).unwrap().fire_at, at(10, 30));
    }

    #[test]
    fn poll_removes_due_one_shots() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_one_shot("todo:1", at(10, 0), Some("1".into()));
        scheduler.enqueue_one_shot("todo:2", at(12, 0), Some("2".into()));

        let fires = scheduler.poll(at(10, 0));
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].name, "todo:1");
        assert_eq!(fires[0].payload.as_deref(), Some("1"));
        assert_eq!(scheduler.len(), 1);

        // Firing is one-shot: polling again yields nothing for that name.
        assert!(scheduler.poll(at(10, 0)).is_empty());
    }

    #[test]
    fn poll_returns_fires_oldest_first() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_one_shot("todo:b", at(11, 0), None);
        scheduler.enqueue_one_shot("todo:a", at(10, 0), None);
        let fires = scheduler.poll(at(12, 0));
        let names: Vec<&str> = fires.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["todo:a", "todo:b"]);
    }

    #[test]
    fn periodic_rearms_relative_to_poll_instant() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_periodic(BREAK_JOB, 30, at(9, 0));
        // Host polls late; no catch-up burst.
        let fires = scheduler.poll(at(10, 45));
        assert_eq!(fires.len(), 1);
        assert_eq!(scheduler.job(BREAK_JOB).unwrap().fire_at, at(11, 15));
    }

    #[test]
    fn cancel_prevents_future_fires() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_one_shot("todo:1", at(10, 0), None);
        assert!(scheduler.cancel("todo:1"));
        assert!(!scheduler.cancel("todo:1"));
        assert!(scheduler.poll(at(23, 59)).is_empty());
    }

    #[test]
    fn cancel_all_by_prefix() {
        let scheduler = Scheduler::new();
        scheduler.enqueue_one_shot("todo:1", at(10, 0), None);
        scheduler.enqueue_one_shot("todo:2", at(10, 0), None);
        scheduler.enqueue_periodic(BREAK_JOB, 30, at(9, 0));
        assert_eq!(scheduler.cancel_all(TODO_JOB_PREFIX), 2);
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.job(BREAK_JOB).is_some());
    }

    #[test]
    fn task_reminder_skips_past_fire_times() {
        use crate::task::Task;
        let scheduler = Scheduler::new();
        let due = at(10, 0);
        let task = Task::new("Old task").with_due_date(due).with_reminder(15);
        // Fire time 09:45 is already behind "now": nothing is armed.
        assert!(!scheduler.schedule_task_reminder(&task, at(9, 45)));
        assert!(scheduler.is_empty());

        // Strictly future fire time arms the job.
        assert!(scheduler.schedule_task_reminder(&task, at(9, 44)));
        assert_eq!(
            scheduler.job(&todo_job_name(&task.id)).unwrap().fire_at,
            at(9, 45)
        );
    }

    #[test]
    fn rehydrate_rebuilds_from_persisted_state() {
        use crate::storage::Settings;
        use crate::task::Task;

        let scheduler = Scheduler::new();
        let settings = Settings::default();
        let due = at(18, 0);
        let live = Task::new("Live").with_due_date(due).with_reminder(15);
        let mut paused = Task::new("Paused").with_due_date(due).with_reminder(15);
        paused.paused = true;
        let mut done = Task::new("Done").with_due_date(due).with_reminder(15);
        done.completed = true;

        scheduler.rehydrate(&settings, &[live.clone(), paused, done], at(9, 0));

        assert_eq!(scheduler.len(), 2); // periodic + one live task
        assert!(scheduler.job(BREAK_JOB).is_some());
        assert!(scheduler.job(&todo_job_name(&live.id)).is_some());
    }

    #[test]
    fn rehydrate_honors_master_switch() {
        use crate::storage::Settings;

        let scheduler = Scheduler::new();
        let mut settings = Settings::default();
        settings.reminders.enabled = false;
        scheduler.rehydrate(&settings, &[], at(9, 0));
        assert!(scheduler.is_empty());
    }
}
