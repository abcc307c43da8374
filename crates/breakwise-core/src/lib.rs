//! # Breakwise Core Library
//!
//! This library provides the core business logic for Breakwise, a break
//! and to-do reminder engine. It implements a CLI-first philosophy where
//! all operations are available via a standalone CLI binary; any GUI is a
//! thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Scheduler**: A named-job table with at-most-one-job-per-name
//!   semantics. It owns no threads -- the host polls it and dispatches
//!   the fires it returns.
//! - **Dispatcher**: Decides, per firing, whether a reminder is shown:
//!   window gate, weighted time-of-day selection, stale-subject checks.
//! - **Action Resolver**: Applies complete/postpone/pause transitions to
//!   tasks and the statistics log, re-arming the scheduler as needed.
//! - **Storage**: SQLite for activities, tasks and statistics; TOML for
//!   settings.
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Job table with UPDATE/REPLACE enqueue policies
//! - [`Dispatcher`]: Tick and one-shot fire handler
//! - [`ActionResolver`]: Reminder action state machine
//! - [`Database`]: Activity/task/statistics persistence
//! - [`Settings`]: Application configuration management

pub mod activity;
pub mod dispatch;
pub mod error;
pub mod messenger;
pub mod picker;
pub mod recurrence;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod window;

pub use activity::{Activity, TimeOfDay};
pub use dispatch::{DispatchOutcome, Dispatcher, ReminderKind, ReminderSink, SkipReason};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use messenger::{Messenger, NullMessenger, TelegramClient};
pub use resolver::{ActionResolver, ReminderAction};
pub use scheduler::{JobFire, JobKind, ScheduledJob, Scheduler};
pub use storage::{ActivityType, Database, Settings, StatisticsRecord};
pub use task::{Recurrence, RecurrenceKind, Task, TaskCategory};
