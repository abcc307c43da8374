//! Settings commands for CLI.

use clap::Subcommand;

use breakwise_core::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a settings value by dot-path key (e.g. reminders.interval_minutes)
    Get {
        /// Settings key
        key: String,
    },
    /// Set a settings value (validated before saving)
    Set {
        /// Settings key
        key: String,
        /// New value
        value: String,
    },
    /// Show the full settings file
    Show,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let settings = Settings::load()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown settings key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load()?;
            settings.set(&key, &value)?;
            println!("{key} = {value}");
        }
        ConfigAction::Show => {
            let settings = Settings::load()?;
            print!("{}", toml::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}
