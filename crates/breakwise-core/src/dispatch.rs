//! Reminder dispatcher.
//!
//! Handles each periodic tick and one-shot fire: consults the window
//! gate, the weighted selector and the persisted task state, and decides
//! whether a reminder is presented. Presentation and messenger delivery
//! go through injected seams; their failures are logged and contained to
//! the current firing.

use chrono::{DateTime, Local, Timelike, Utc};
use rand::Rng;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::messenger::{format_break_message, format_todo_message, Messenger};
use crate::picker::{bucket_for, select};
use crate::scheduler::{JobFire, BREAK_JOB, BREAK_POSTPONE_JOB, TODO_JOB_PREFIX};
use crate::storage::{ActivityType, Database, Settings};
use crate::window::is_active;

/// What kind of reminder a dispatch or user action refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Break,
    Todo,
}

/// Why a firing produced no reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Master switch or break notifications off.
    Disabled,
    /// Outside the configured daily window.
    OutOfWindow,
    /// No eligible activity for the current bucket.
    NoCandidates,
    /// Todo notifications off.
    NotificationsOff,
    /// The job's subject was completed, paused or deleted between
    /// enqueue and fire. Expected, not an error.
    StaleSubject,
}

/// Outcome of a single tick or one-shot fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Shown {
        kind: ReminderKind,
        title: String,
        description: Option<String>,
    },
    Skipped(SkipReason),
}

/// External notification renderer. The engine decides *that* and *what*
/// to present; rendering itself lives outside.
pub trait ReminderSink: Send + Sync {
    fn present_reminder(
        &self,
        kind: ReminderKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<()>;

    fn dismiss_reminder(&self, _kind: ReminderKind) -> Result<()> {
        Ok(())
    }
}

/// Dispatches periodic ticks and one-shot fires.
pub struct Dispatcher {
    db: Arc<Database>,
    sink: Arc<dyn ReminderSink>,
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        sink: Arc<dyn ReminderSink>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            db,
            sink,
            messenger,
        }
    }

    /// Handle one firing of the periodic break job.
    ///
    /// The statistics record is appended before the reminder is presented
    /// so a shown reminder is never left unrecorded; a record without a
    /// successful render can happen when the sink fails, which is the
    /// accepted direction of that asymmetry.
    pub fn on_break_tick<R: Rng + ?Sized>(
        &self,
        settings: &Settings,
        now: DateTime<Local>,
        rng: &mut R,
    ) -> Result<DispatchOutcome> {
        if !settings.reminders.enabled || !settings.reminders.break_notifications_enabled {
            return Ok(DispatchOutcome::Skipped(SkipReason::Disabled));
        }
        if !is_active(now.time(), &settings.window) {
            return Ok(DispatchOutcome::Skipped(SkipReason::OutOfWindow));
        }

        let bucket = bucket_for(now.hour());
        let candidates = self.db.activities_for_bucket(bucket)?;
        let Some(activity) = select(bucket, &candidates, rng) else {
            return Ok(DispatchOutcome::Skipped(SkipReason::NoCandidates));
        };

        self.db.append_statistics(
            &activity.title,
            ActivityType::Break,
            now.with_timezone(&Utc),
        )?;

        if let Err(err) = self.sink.present_reminder(
            ReminderKind::Break,
            &activity.title,
            activity.description.as_deref(),
        ) {
            tracing::warn!(error = %err, "break reminder render failed");
        }

        let message = format_break_message(&activity.title, activity.description.as_deref());
        self.messenger.deliver(settings, &message);

        Ok(DispatchOutcome::Shown {
            kind: ReminderKind::Break,
            title: activity.title.clone(),
            description: activity.description.clone(),
        })
    }

    /// Handle the fire of a task's one-shot reminder.
    ///
    /// Reloads the task's persisted state first: a job that fires after
    /// its task was completed, paused or deleted is skipped quietly.
    /// Statistics are only appended on explicit completion, never here.
    pub fn on_todo_fire(&self, settings: &Settings, task_id: &str) -> Result<DispatchOutcome> {
        let Some(task) = self.db.task(task_id)? else {
            return Ok(DispatchOutcome::Skipped(SkipReason::StaleSubject));
        };
        if task.completed || task.paused {
            return Ok(DispatchOutcome::Skipped(SkipReason::StaleSubject));
        }
        if !settings.reminders.todo_notifications_enabled {
            return Ok(DispatchOutcome::Skipped(SkipReason::NotificationsOff));
        }

        if let Err(err) = self.sink.present_reminder(
            ReminderKind::Todo,
            &task.title,
            task.description.as_deref(),
        ) {
            tracing::warn!(error = %err, "todo reminder render failed");
        }

        let message = format_todo_message(&task.title, task.description.as_deref());
        self.messenger.deliver(settings, &message);

        Ok(DispatchOutcome::Shown {
            kind: ReminderKind::Todo,
            title: task.title,
            description: task.description,
        })
    }

    /// Route a due job to its handler by name.
    pub fn handle_fire<R: Rng + ?Sized>(
        &self,
        fire: &JobFire,
        settings: &Settings,
        now: DateTime<Local>,
        rng: &mut R,
    ) -> Result<DispatchOutcome> {
        if fire.name == BREAK_JOB || fire.name == BREAK_POSTPONE_JOB {
            return self.on_break_tick(settings, now, rng);
        }
        if let Some(task_id) = fire
            .payload
            .as_deref()
            .or_else(|| fire.name.strip_prefix(TODO_JOB_PREFIX))
        {
            return self.on_todo_fire(settings, task_id);
        }
        tracing::warn!(job = %fire.name, "fire for unknown job name");
        Err(CoreError::Custom(format!("unknown job name: {}", fire.name)))
    }
}
