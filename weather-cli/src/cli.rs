use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select};
use weather_core::{
    Config, Coordinates, FetchOutcome, IpLocationProvider, UnitSystem, WeatherSession,
    client_from_config,
};

use crate::{display::render_snapshot, interactive};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Unit system for this run: metric or imperial. Defaults to the configured one.
    #[arg(long, global = true)]
    pub units: Option<UnitSystem>,

    /// Print the snapshot as JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and default unit system.
    Configure,

    /// Show current weather for a city.
    Show {
        /// City name, optionally with country code, e.g. "Paris,FR".
        city: String,
    },

    /// Show current weather for a latitude/longitude pair.
    Coords {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },

    /// Show current weather for the approximate location of this machine.
    Here,

    /// Search, locate and switch units in a loop.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        let units = self.units.unwrap_or(config.units);
        let json = self.json;

        // Everything except `configure` needs a credential.
        let session = || -> Result<_> {
            Ok(WeatherSession::new(client_from_config(&config)?, units))
        };

        let outcome = match self.command {
            Command::Configure => return configure(&mut config),
            Command::Show { city } => session()?.search(&city).await,
            Command::Coords { lat, lon } => session()?.fetch_at(Coordinates::new(lat, lon)).await,
            Command::Here => session()?.locate(&IpLocationProvider::new()).await,
            Command::Interactive => return interactive::run(session()?).await,
        };

        print_outcome(outcome, json)
    }
}

/// Print a one-shot result. Failures become an error whose top line is the
/// user-facing message.
fn print_outcome(outcome: FetchOutcome, json: bool) -> Result<()> {
    let snapshot = outcome.map_err(|err| {
        let message = err.user_message();
        anyhow::Error::new(err).context(message)
    })?;

    if json {
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize snapshot to JSON")?;
        println!("{json}");
    } else {
        print!("{}", render_snapshot(&snapshot));
    }

    Ok(())
}

fn configure(config: &mut Config) -> Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let units = Select::new("Default units:", UnitSystem::all().to_vec())
        .with_starting_cursor(if config.units == UnitSystem::Imperial { 1 } else { 0 })
        .prompt()
        .context("Failed to read unit system")?;

    config.set_api_key(api_key.trim().to_string());
    config.set_units(units);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
