//! Human-friendly rendering of snapshots and session state.

use weather_core::{SessionState, WeatherSnapshot};

const GETTING_STARTED: &str = "Search for a city or use your location to get started!";

pub fn render_snapshot(snapshot: &WeatherSnapshot) -> String {
    let units = snapshot.units;
    let temp = units.temperature_symbol();

    let mut out = format!(
        "{}, {}\n{}\n\n{}{temp} (feels like {}{temp})\n",
        snapshot.location_name,
        snapshot.country,
        capitalize_words(&snapshot.description),
        round(snapshot.temperature),
        round(snapshot.feels_like),
    );

    out.push_str(&format!("Humidity:   {}%\n", snapshot.humidity_pct));
    out.push_str(&format!(
        "Wind:       {} {}\n",
        round(snapshot.wind_speed),
        units.speed_symbol()
    ));
    out.push_str(&format!(
        "Visibility: {:.1} km\n",
        f64::from(snapshot.visibility_m) / 1000.0
    ));
    out.push_str(&format!("Pressure:   {} hPa\n", round(snapshot.pressure_hpa)));
    out.push_str(&format!("Icon:       {}\n", snapshot.icon_url()));

    if let Some(observed) = snapshot.observed_at {
        out.push_str(&format!(
            "Observed:   {}\n",
            observed.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    out
}

pub fn render_state(state: &SessionState) -> String {
    let mut out = String::new();

    if let Some(error) = state.error() {
        out.push_str(&format!("! {error}\n\n"));
    }

    match state.snapshot() {
        Some(snapshot) => out.push_str(&render_snapshot(snapshot)),
        None if state.error().is_none() && !state.is_loading() => {
            out.push_str(GETTING_STARTED);
            out.push('\n');
        }
        None => {}
    }

    out
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

fn capitalize_words(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
