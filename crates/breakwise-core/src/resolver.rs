//! Action resolver.
//!
//! Consumes user actions on a fired reminder (complete / postpone) and
//! settings/task toggles, applying the corresponding state transition and
//! re-arming the scheduler where needed. Subjects are resolved by durable
//! id; titles are only ever used as display labels in the statistics log.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::dispatch::ReminderKind;
use crate::error::Result;
use crate::recurrence::next_occurrence;
use crate::scheduler::{todo_job_name, Scheduler, BREAK_JOB, BREAK_POSTPONE_JOB};
use crate::storage::{ActivityType, Database, Settings};
use crate::task::Task;

/// User action on a fired reminder. Dismissing without action needs no
/// transition and never reaches the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Complete,
    Postpone,
}

/// Delay applied when a reminder is postponed.
pub const POSTPONE_DELAY_MINUTES: i64 = 10;

/// Applies reminder actions and lifecycle toggles.
pub struct ActionResolver {
    db: Arc<Database>,
    scheduler: Arc<Scheduler>,
}

impl ActionResolver {
    pub fn new(db: Arc<Database>, scheduler: Arc<Scheduler>) -> Self {
        Self { db, scheduler }
    }

    /// Apply `action` to the reminder subject identified by `subject_id`.
    ///
    /// A stale subject (deleted or already completed) is a quiet no-op.
    /// All transitions are idempotent.
    pub fn resolve(
        &self,
        kind: ReminderKind,
        action: ReminderAction,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match (kind, action) {
            (ReminderKind::Break, ReminderAction::Complete) => self.complete_break(subject_id, now),
            (ReminderKind::Todo, ReminderAction::Complete) => self.complete_todo(subject_id, now),
            (ReminderKind::Break, ReminderAction::Postpone) => {
                // Independent of the periodic job, which keeps its cadence.
                self.scheduler.enqueue_one_shot(
                    BREAK_POSTPONE_JOB,
                    now + Duration::minutes(POSTPONE_DELAY_MINUTES),
                    None,
                );
                Ok(())
            }
            (ReminderKind::Todo, ReminderAction::Postpone) => {
                self.scheduler.enqueue_one_shot(
                    &todo_job_name(subject_id),
                    now + Duration::minutes(POSTPONE_DELAY_MINUTES),
                    Some(subject_id.to_string()),
                );
                Ok(())
            }
        }
    }

    fn complete_break(&self, subject_id: &str, now: DateTime<Utc>) -> Result<()> {
        // The statistics log wants a display label; fall back to the raw
        // subject for reminders whose activity has been deleted meanwhile.
        let title = self
            .db
            .activity(subject_id)?
            .map(|a| a.title)
            .unwrap_or_else(|| subject_id.to_string());
        self.db
            .append_statistics(&title, ActivityType::Break, now)?;
        Ok(())
    }

    fn complete_todo(&self, task_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut was_completed = false;
        let updated = self.db.mutate_task(task_id, |task| {
            was_completed = task.completed;
            if was_completed {
                return;
            }
            task.last_completed_at = Some(now);
            if task.recurrence.is_recurring() {
                if let Some(due) = task.effective_due() {
                    task.next_due_at = Some(next_occurrence(due, &task.recurrence));
                }
            } else {
                task.completed = true;
            }
        })?;

        let Some(task) = updated else {
            tracing::debug!(task = task_id, "complete for unknown task, ignoring");
            return Ok(());
        };
        if was_completed {
            tracing::debug!(task = task_id, "task already completed, ignoring");
            return Ok(());
        }

        if task.recurrence.is_recurring() {
            self.scheduler.schedule_task_reminder(&task, now);
        } else {
            self.scheduler.cancel(&todo_job_name(&task.id));
        }

        self.db
            .append_statistics(&task.title, ActivityType::Todo, now)?;
        Ok(())
    }

    /// Synchronize the periodic job with the master switch.
    ///
    /// Disabling cancels only the periodic break job; already-armed task
    /// one-shots stay live (they are gated separately by the todo
    /// notifications toggle at fire time). Enabling re-enqueues the
    /// periodic job at the current interval.
    pub fn apply_master_switch(&self, settings: &Settings, now: DateTime<Utc>) {
        if settings.reminders.enabled {
            self.scheduler
                .enqueue_periodic(BREAK_JOB, settings.reminders.interval_minutes, now);
        } else {
            self.scheduler.cancel(BREAK_JOB);
        }
    }

    /// Toggle a task's paused flag, cancelling or re-arming its reminder.
    pub fn set_task_paused(
        &self,
        task_id: &str,
        paused: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>> {
        let updated = self.db.mutate_task(task_id, |task| {
            task.paused = paused;
        })?;

        let Some(task) = updated else {
            return Ok(None);
        };
        if paused {
            self.scheduler.cancel(&todo_job_name(&task.id));
        } else {
            self.scheduler.schedule_task_reminder(&task, now);
        }
        Ok(Some(task))
    }

    /// Remove a task and cancel its outstanding reminder.
    pub fn remove_task(&self, task_id: &str) -> Result<bool> {
        self.scheduler.cancel(&todo_job_name(task_id));
        Ok(self.db.delete_task(task_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use crate::recurrence::fire_time;
    use crate::task::{Recurrence, RecurrenceKind};
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    fn resolver() -> (Arc<Database>, Arc<Scheduler>, ActionResolver) {
        let db = Arc::new(Database::open_memory().unwrap());
        let scheduler = Arc::new(Scheduler::new());
        let resolver = ActionResolver::new(db.clone(), scheduler.clone());
        (db, scheduler, resolver)
    }

    #[test]
    fn complete_break_appends_statistics() {
        let (db, _, resolver) = resolver();
        let activity = Activity::new("Stretch");
        db.insert_activity(&activity).unwrap();

        resolver
            .resolve(
                ReminderKind::Break,
                ReminderAction::Complete,
                &activity.id,
                at(2, 10, 0),
            )
            .unwrap();

        let records = db.statistics_since(at(1, 0, 0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].activity_title, "Stretch");
        assert_eq!(records[0].activity_type, ActivityType::Break);
    }

    #[test]
    fn complete_non_recurring_task_marks_done() {
        let (db, scheduler, resolver) = resolver();
        let task = Task::new("One-off").with_due_date(at(2, 18, 0)).with_reminder(15);
        db.save_task(&task).unwrap();
        scheduler.schedule_task_reminder(&task, at(2, 9, 0));
        assert_eq!(scheduler.len(), 1);

        resolver
            .resolve(
                ReminderKind::Todo,
                ReminderAction::Complete,
                &task.id,
                at(2, 17, 50),
            )
            .unwrap();

        let loaded = db.task(&task.id).unwrap().unwrap();
        assert!(loaded.completed);
        assert_eq!(loaded.last_completed_at, Some(at(2, 17, 50)));
        assert!(scheduler.is_empty());

        let records = db.statistics_since(at(1, 0, 0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].activity_type, ActivityType::Todo);
    }

    #[test]
    fn complete_weekly_task_advances_and_rearms() {
        let (db, scheduler, resolver) = resolver();
        let due = at(2, 18, 0);
        let task = Task::new("Weekly review")
            .with_due_date(due)
            .with_recurrence(Recurrence::of(RecurrenceKind::Weekly))
            .with_reminder(15);
        db.save_task(&task).unwrap();

        resolver
            .resolve(
                ReminderKind::Todo,
                ReminderAction::Complete,
                &task.id,
                at(2, 17, 50),
            )
            .unwrap();

        let loaded = db.task(&task.id).unwrap().unwrap();
        assert!(!loaded.completed);
        assert_eq!(loaded.next_due_at, Some(at(9, 18, 0)));
        assert_eq!(loaded.last_completed_at, Some(at(2, 17, 50)));

        let job = scheduler.job(&todo_job_name(&task.id)).unwrap();
        assert_eq!(job.fire_at, fire_time(at(9, 18, 0), 15));
        assert_eq!(job.fire_at, at(9, 17, 45));
    }

    #[test]
    fn double_complete_is_idempotent() {
        let (db, _, resolver) = resolver();
        let task = Task::new("Once");
        db.save_task(&task).unwrap();

        for _ in 0..2 {
            resolver
                .resolve(
                    ReminderKind::Todo,
                    ReminderAction::Complete,
                    &task.id,
                    at(2, 12, 0),
                )
                .unwrap();
        }

        assert!(db.task(&task.id).unwrap().unwrap().completed);
        // Only the first completion is recorded.
        assert_eq!(db.statistics_since(at(1, 0, 0)).unwrap().len(), 1);
    }

    #[test]
    fn complete_unknown_task_is_quiet_noop() {
        let (db, _, resolver) = resolver();
        resolver
            .resolve(
                ReminderKind::Todo,
                ReminderAction::Complete,
                "gone",
                at(2, 12, 0),
            )
            .unwrap();
        assert!(db.statistics_since(at(1, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn postpone_break_arms_dedicated_one_shot() {
        let (_, scheduler, resolver) = resolver();
        let now = at(2, 10, 0);
        resolver
            .resolve(ReminderKind::Break, ReminderAction::Postpone, "ignored", now)
            .unwrap();

        let job = scheduler.job(BREAK_POSTPONE_JOB).unwrap();
        assert_eq!(job.fire_at, at(2, 10, 10));

        // Postponing again replaces, never duplicates.
        resolver
            .resolve(
                ReminderKind::Break,
                ReminderAction::Postpone,
                "ignored",
                at(2, 10, 5),
            )
            .unwrap();
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.job(BREAK_POSTPONE_JOB).unwrap().fire_at, at(2, 10, 15));
    }

    #[test]
    fn postpone_todo_rearms_task_job() {
        let (db, scheduler, resolver) = resolver();
        let task = Task::new("Later").with_due_date(at(2, 18, 0)).with_reminder(15);
        db.save_task(&task).unwrap();
        scheduler.schedule_task_reminder(&task, at(2, 9, 0));

        resolver
            .resolve(
                ReminderKind::Todo,
                ReminderAction::Postpone,
                &task.id,
                at(2, 17, 50),
            )
            .unwrap();

        assert_eq!(scheduler.len(), 1);
        let job = scheduler.job(&todo_job_name(&task.id)).unwrap();
        assert_eq!(job.fire_at, at(2, 18, 0));
        assert_eq!(job.payload.as_deref(), Some(task.id.as_str()));
    }

    #[test]
    fn master_switch_leaves_task_jobs_intact() {
        let (db, scheduler, resolver) = resolver();
        let task = Task::new("Survives").with_due_date(at(2, 18, 0)).with_reminder(15);
        db.save_task(&task).unwrap();

        let mut settings = Settings::default();
        resolver.apply_master_switch(&settings, at(2, 9, 0));
        scheduler.schedule_task_reminder(&task, at(2, 9, 0));
        assert_eq!(scheduler.len(), 2);

        settings.reminders.enabled = false;
        resolver.apply_master_switch(&settings, at(2, 9, 30));
        assert!(scheduler.job(BREAK_JOB).is_none());
        assert!(scheduler.job(&todo_job_name(&task.id)).is_some());

        settings.reminders.enabled = true;
        resolver.apply_master_switch(&settings, at(2, 9, 45));
        assert!(scheduler.job(BREAK_JOB).is_some());
    }

    #[test]
    fn pause_cancels_and_resume_rearms() {
        let (db, scheduler, resolver) = resolver();
        let task = Task::new("Pausable").with_due_date(at(2, 18, 0)).with_reminder(15);
        db.save_task(&task).unwrap();
        scheduler.schedule_task_reminder(&task, at(2, 9, 0));

        let paused = resolver
            .set_task_paused(&task.id, true, at(2, 9, 30))
            .unwrap()
            .unwrap();
        assert!(paused.paused);
        assert!(scheduler.job(&todo_job_name(&task.id)).is_none());
        // Advancing past the original fire time produces no fires.
        assert!(scheduler.poll(at(2, 23, 0)).is_empty());

        let resumed = resolver
            .set_task_paused(&task.id, false, at(2, 9, 45))
            .unwrap()
            .unwrap();
        assert!(!resumed.paused);
        assert_eq!(
            scheduler.job(&todo_job_name(&task.id)).unwrap().fire_at,
            at(2, 17, 45)
        );
    }

    #[test]
    fn remove_task_cancels_job() {
        let (db, scheduler, resolver) = resolver();
        let task = Task::new("Gone").with_due_date(at(2, 18, 0)).with_reminder(15);
        db.save_task(&task).unwrap();
        scheduler.schedule_task_reminder(&task, at(2, 9, 0));

        assert!(resolver.remove_task(&task.id).unwrap());
        assert!(scheduler.is_empty());
        assert!(db.task(&task.id).unwrap().is_none());
    }
}
