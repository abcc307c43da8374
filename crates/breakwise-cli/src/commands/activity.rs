//! Break activity commands for CLI.

use clap::Subcommand;

use breakwise_core::{Activity, Database, TimeOfDay};

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Add a new break activity
    Add {
        /// Activity title
        title: String,
        /// Activity description
        #[arg(long)]
        description: Option<String>,
        /// Selection weight (>= 1, default: 1)
        #[arg(long, default_value = "1")]
        weight: i64,
        /// Time-of-day bucket: early_morning, late_morning, midday,
        /// afternoon, evening, late_evening or any (default: any)
        #[arg(long, default_value = "any")]
        bucket: String,
    },
    /// List activities
    List {
        /// Only show active activities
        #[arg(long)]
        active: bool,
    },
    /// Enable an activity
    Enable {
        /// Activity ID
        id: String,
    },
    /// Disable an activity (it stays in the catalog)
    Disable {
        /// Activity ID
        id: String,
    },
    /// Remove an activity
    Remove {
        /// Activity ID
        id: String,
    },
    /// Seed the default activity catalog if the table is empty
    Seed,
}

fn parse_bucket(s: &str) -> Result<TimeOfDay, Box<dyn std::error::Error>> {
    // Accept both the CLI-friendly lowercase form and the stored form.
    let normalized = s.trim().to_ascii_uppercase();
    Ok(normalized.parse::<TimeOfDay>()?)
}

fn set_active(db: &Database, id: &str, active: bool) -> Result<(), Box<dyn std::error::Error>> {
    let Some(mut activity) = db.activity(id)? else {
        return Err(format!("no activity with id {id}").into());
    };
    activity.active = active;
    db.insert_activity(&activity)?;
    println!(
        "{} '{}'",
        if active { "enabled" } else { "disabled" },
        activity.title
    );
    Ok(())
}

pub fn run(action: ActivityAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ActivityAction::Add {
            title,
            description,
            weight,
            bucket,
        } => {
            let mut activity = Activity::new(title)
                .with_weight(weight)
                .with_time_of_day(parse_bucket(&bucket)?);
            activity.description = description;
            db.insert_activity(&activity)?;
            println!("added activity {} ({})", activity.title, activity.id);
        }
        ActivityAction::List { active } => {
            let activities = db.activities(active)?;
            if activities.is_empty() {
                println!("no activities");
                return Ok(());
            }
            for a in activities {
                println!(
                    "{}  [{}] w={} {}  {}",
                    a.id,
                    a.time_of_day,
                    a.weight,
                    if a.active { "on " } else { "off" },
                    a.title,
                );
            }
        }
        ActivityAction::Enable { id } => set_active(&db, &id, true)?,
        ActivityAction::Disable { id } => set_active(&db, &id, false)?,
        ActivityAction::Remove { id } => {
            if db.delete_activity(&id)? {
                println!("removed {id}");
            } else {
                return Err(format!("no activity with id {id}").into());
            }
        }
        ActivityAction::Seed => {
            let inserted = db.ensure_default_activities()?;
            if inserted == 0 {
                println!("catalog already populated");
            } else {
                println!("seeded {inserted} default activities");
            }
        }
    }

    Ok(())
}
