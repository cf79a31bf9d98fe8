use anyhow::Result;
use inquire::{InquireError, Select, Text};
use std::fmt;
use tracing::debug;
use weather_core::{IpLocationProvider, UnitSystem, WeatherClient, WeatherSession};

use crate::display::render_state;

#[derive(Debug, Clone, Copy)]
enum MenuItem {
    Search,
    UseMyLocation,
    SwitchUnits(UnitSystem),
    Quit,
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Search => f.write_str("Search for a city"),
            MenuItem::UseMyLocation => f.write_str("Use my location"),
            MenuItem::SwitchUnits(units) => write!(f, "Switch to {}", units.temperature_symbol()),
            MenuItem::Quit => f.write_str("Quit"),
        }
    }
}

/// Menu loop over a single session. Failures are shown and the loop goes on;
/// Esc or Ctrl-C leaves.
pub async fn run<C: WeatherClient>(session: WeatherSession<C>) -> Result<()> {
    let locator = IpLocationProvider::new();

    println!("{}", render_state(&session.state().await));

    loop {
        let next_units = session.units().await.toggled();
        let items = vec![
            MenuItem::Search,
            MenuItem::UseMyLocation,
            MenuItem::SwitchUnits(next_units),
            MenuItem::Quit,
        ];

        let choice = match Select::new("What next?", items).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let outcome = match choice {
            MenuItem::Search => {
                let city = match Text::new("City:").prompt() {
                    Ok(city) => city,
                    Err(InquireError::OperationCanceled) => continue,
                    Err(InquireError::OperationInterrupted) => break,
                    Err(e) => return Err(e.into()),
                };
                Some(session.search(&city).await)
            }
            MenuItem::UseMyLocation => Some(session.locate(&locator).await),
            MenuItem::SwitchUnits(units) => session.set_units(units).await,
            MenuItem::Quit => break,
        };

        if let Some(Err(err)) = outcome {
            debug!(error = %err, "Fetch failed");
        }

        println!("{}", render_state(&session.state().await));
    }

    Ok(())
}
