//! The reminder daemon and test-notification commands.
//!
//! The daemon drives the core the way a host platform would: rehydrate
//! the scheduler from persisted state, then poll it in a loop and hand
//! every due fire to the dispatcher. Telegram delivery is spawned on a
//! tokio runtime so a tick never blocks on network I/O.

use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Local, Utc};

use breakwise_core::scheduler::{todo_job_name, BREAK_JOB};
use breakwise_core::{
    Database, DispatchOutcome, Dispatcher, Messenger, ReminderKind, ReminderSink, Scheduler,
    Settings, TelegramClient,
};

/// Renders reminders to the terminal.
struct TerminalSink;

impl ReminderSink for TerminalSink {
    fn present_reminder(
        &self,
        kind: ReminderKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<(), breakwise_core::CoreError> {
        let label = match kind {
            ReminderKind::Break => "break",
            ReminderKind::Todo => "to-do",
        };
        println!("🔔 [{label}] {title}");
        if let Some(description) = description {
            println!("   {description}");
        }
        Ok(())
    }
}

/// Telegram delivery spawned fire-and-forget on the daemon's runtime.
struct SpawningTelegram {
    client: TelegramClient,
    handle: tokio::runtime::Handle,
}

impl Messenger for SpawningTelegram {
    fn deliver(&self, settings: &Settings, message: &str) {
        if !settings.telegram.is_configured() {
            return;
        }
        let client = self.client.clone();
        let token = settings.telegram.bot_token.clone();
        let chat_id = settings.telegram.chat_id.clone();
        let message = message.to_string();
        self.handle.spawn(async move {
            client.send(&token, &chat_id, &message).await;
        });
    }
}

/// Arm reminders for tasks created or edited outside this process.
///
/// Only fills in missing jobs: an armed job (possibly postponed) is left
/// alone, and jobs whose subject went stale are skipped at fire time by
/// the dispatcher.
fn resync_task_reminders(scheduler: &Scheduler, db: &Database) {
    let now = Utc::now();
    match db.pending_tasks() {
        Ok(tasks) => {
            for task in tasks {
                if task.reminder_eligible() && scheduler.job(&todo_job_name(&task.id)).is_none() {
                    scheduler.schedule_task_reminder(&task, now);
                }
            }
        }
        Err(err) => tracing::warn!(error = %err, "task resync failed"),
    }
}

pub fn run(once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let db = Arc::new(Database::open()?);
    db.ensure_default_activities()?;

    let scheduler = Arc::new(Scheduler::new());
    let settings = Settings::load_or_default();
    let tasks = db.pending_tasks()?;
    scheduler.rehydrate(&settings, &tasks, Utc::now());

    let dispatcher = Dispatcher::new(
        db.clone(),
        Arc::new(TerminalSink),
        Arc::new(SpawningTelegram {
            client: TelegramClient::new(),
            handle: runtime.handle().clone(),
        }),
    );

    let mut rng = rand::thread_rng();
    tracing::info!(
        interval = settings.reminders.interval_minutes,
        "breakwise daemon started"
    );

    let mut ticks: u64 = 0;
    loop {
        // Settings are re-read every iteration so toggles and interval
        // changes apply without a restart.
        let settings = Settings::load_or_default();
        if settings.reminders.enabled {
            scheduler.enqueue_periodic(BREAK_JOB, settings.reminders.interval_minutes, Utc::now());
        } else {
            scheduler.cancel(BREAK_JOB);
        }
        if ticks % 30 == 0 {
            resync_task_reminders(&scheduler, &db);
        }

        for fire in scheduler.poll(Utc::now()) {
            match dispatcher.handle_fire(&fire, &settings, Local::now(), &mut rng) {
                Ok(DispatchOutcome::Shown { title, .. }) => {
                    tracing::info!(job = %fire.name, %title, "reminder shown");
                }
                Ok(DispatchOutcome::Skipped(reason)) => {
                    tracing::debug!(job = %fire.name, ?reason, "fire skipped");
                }
                // A failed fire is a no-op for this occurrence; the next
                // cadence is unaffected.
                Err(err) => tracing::warn!(job = %fire.name, error = %err, "job fire failed"),
            }
        }

        if once {
            break;
        }
        ticks += 1;
        thread::sleep(StdDuration::from_secs(1));
    }

    Ok(())
}

/// Fire a single reminder immediately, bypassing the scheduler.
pub fn test_notify(kind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let db = Arc::new(Database::open()?);
    db.ensure_default_activities()?;
    let settings = Settings::load_or_default();

    let dispatcher = Dispatcher::new(
        db.clone(),
        Arc::new(TerminalSink),
        Arc::new(SpawningTelegram {
            client: TelegramClient::new(),
            handle: runtime.handle().clone(),
        }),
    );

    let outcome = match kind {
        "break" => {
            dispatcher.on_break_tick(&settings, Local::now(), &mut rand::thread_rng())?
        }
        "todo" => {
            let Some(task) = db.pending_tasks()?.into_iter().next() else {
                return Err("no pending tasks to notify about".into());
            };
            dispatcher.on_todo_fire(&settings, &task.id)?
        }
        other => return Err(format!("unknown reminder kind: {other}").into()),
    };

    match outcome {
        DispatchOutcome::Shown { .. } => {}
        DispatchOutcome::Skipped(reason) => println!("skipped: {reason:?}"),
    }

    // Give spawned deliveries a moment before the runtime drops.
    runtime.shutdown_timeout(StdDuration::from_secs(5));
    Ok(())
}
