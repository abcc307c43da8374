//! To-do task commands for CLI.
//!
//! `complete` and `postpone` go through the action resolver so the state
//! transitions match what a notification action would do. The daemon
//! process picks persisted changes up through its stale-subject checks
//! and periodic task resync.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::Subcommand;

use breakwise_core::{
    ActionResolver, Database, Recurrence, RecurrenceKind, ReminderAction, ReminderKind, Scheduler,
    Task, TaskCategory,
};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Due date, local time ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        due: Option<String>,
        /// Recurrence: none, daily, weekly, biweekly, monthly, custom_days
        #[arg(long, default_value = "none")]
        recurrence: String,
        /// Weekdays for custom_days recurrence ("1,3,5"; 1 = Monday)
        #[arg(long)]
        days: Option<String>,
        /// Arm a reminder this many minutes before the due date
        #[arg(long)]
        remind_before: Option<i64>,
        /// Category (sport, walk, work, home, ... default: other)
        #[arg(long, default_value = "other")]
        category: String,
    },
    /// List tasks
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Complete a task (advances recurring tasks to their next due date)
    Complete {
        /// Task ID
        id: String,
    },
    /// Postpone a task's reminder by 10 minutes
    Postpone {
        /// Task ID
        id: String,
    },
    /// Pause a task: its reminder is cancelled until resumed
    Pause {
        /// Task ID
        id: String,
    },
    /// Resume a paused task and re-arm its reminder
    Resume {
        /// Task ID
        id: String,
    },
    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },
}

fn parse_due(s: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M")
        .map_err(|e| format!("cannot parse due date '{s}': {e}"))?;
    let local = Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("ambiguous local time '{s}'"))?;
    Ok(local.with_timezone(&Utc))
}

fn resolver(db: Arc<Database>) -> ActionResolver {
    // One-shot CLI invocations carry a throwaway job table; the daemon
    // rebuilds its own from the persisted state these commands mutate.
    ActionResolver::new(db, Arc::new(Scheduler::new()))
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(Database::open()?);

    match action {
        TaskAction::Add {
            title,
            description,
            due,
            recurrence,
            days,
            remind_before,
            category,
        } => {
            let mut task = Task::new(title);
            task.description = description;
            task.category = category.to_ascii_uppercase().parse::<TaskCategory>()?;
            if let Some(due) = due.as_deref() {
                task = task.with_due_date(parse_due(due)?);
            }
            let kind = recurrence.to_ascii_uppercase().parse::<RecurrenceKind>()?;
            task.recurrence = match kind {
                RecurrenceKind::CustomDays => {
                    let days = days.as_deref().unwrap_or_default();
                    Recurrence::custom_days(Recurrence::days_from_str(days))
                }
                kind => Recurrence::of(kind),
            };
            if let Some(lead) = remind_before {
                task = task.with_reminder(lead);
            }
            task.validate()?;
            db.save_task(&task)?;
            println!("added task {} ({})", task.title, task.id);
        }
        TaskAction::List { all } => {
            let tasks = if all { db.tasks()? } else { db.pending_tasks()? };
            if tasks.is_empty() {
                println!("no tasks");
                return Ok(());
            }
            for t in tasks {
                let due = t
                    .effective_due()
                    .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into());
                let mut flags = String::new();
                if t.completed {
                    flags.push_str(" done");
                }
                if t.paused {
                    flags.push_str(" paused");
                }
                println!(
                    "{}  due {}  {}{}  {}",
                    t.id, due, t.recurrence.kind, flags, t.title,
                );
            }
        }
        TaskAction::Complete { id } => {
            resolver(db.clone()).resolve(
                ReminderKind::Todo,
                ReminderAction::Complete,
                &id,
                Utc::now(),
            )?;
            match db.task(&id)? {
                Some(task) if task.completed => println!("completed '{}'", task.title),
                Some(task) => println!(
                    "completed '{}', next due {}",
                    task.title,
                    task.next_due_at
                        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".into())
                ),
                None => println!("no task with id {id}"),
            }
        }
        TaskAction::Postpone { id } => {
            resolver(db).resolve(
                ReminderKind::Todo,
                ReminderAction::Postpone,
                &id,
                Utc::now(),
            )?;
            println!("postponed reminder for {id} by 10 minutes");
        }
        TaskAction::Pause { id } => {
            match resolver(db).set_task_paused(&id, true, Utc::now())? {
                Some(task) => println!("paused '{}'", task.title),
                None => return Err(format!("no task with id {id}").into()),
            }
        }
        TaskAction::Resume { id } => {
            match resolver(db).set_task_paused(&id, false, Utc::now())? {
                Some(task) => println!("resumed '{}'", task.title),
                None => return Err(format!("no task with id {id}").into()),
            }
        }
        TaskAction::Remove { id } => {
            if resolver(db).remove_task(&id)? {
                println!("removed {id}");
            } else {
                return Err(format!("no task with id {id}").into());
            }
        }
    }

    Ok(())
}
