//! Completion statistics commands for CLI.

use chrono::{Duration, Local, TimeZone, Utc};
use clap::Subcommand;

use breakwise_core::{ActivityType, Database};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Completions today
    Today,
    /// Completions over the last 7 days, with a per-weekday breakdown
    Week,
    /// Delete statistics older than the given number of days
    Prune {
        /// Age threshold in days
        #[arg(long, default_value = "90")]
        days: i64,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today => {
            let midnight = Local::now().date_naive().and_hms_opt(0, 0, 0)
                .and_then(|naive| Local.from_local_datetime(&naive).single())
                .map(|local| local.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let breaks = db.completed_count_since(midnight, Some(ActivityType::Break))?;
            let todos = db.completed_count_since(midnight, Some(ActivityType::Todo))?;
            println!("today: {breaks} breaks, {todos} tasks");
        }
        StatsAction::Week => {
            let since = Utc::now() - Duration::days(7);
            let total = db.completed_count_since(since, None)?;
            println!("last 7 days: {total} completions");
            for (activity_type, count) in db.type_breakdown_since(since)? {
                println!("  {activity_type}: {count}");
            }
            for (day, count) in db.weekly_histogram(since)? {
                println!("  {day}: {count}");
            }
        }
        StatsAction::Prune { days } => {
            let before = Utc::now() - Duration::days(days);
            let deleted = db.prune_statistics_before(before)?;
            println!("pruned {deleted} records older than {days} days");
        }
    }
    Ok(())
}
