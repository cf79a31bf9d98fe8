use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::FetchError;

/// A resolved position on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// What the user asked for: a place name or a pair of coordinates.
///
/// Variants may hold values that break the invariants (blank name, latitude
/// out of range); [`LocationQuery::validate`] is what the client runs before
/// touching the network.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    ByName(String),
    ByCoordinates(Coordinates),
}

impl LocationQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    pub fn by_coordinates(lat: f64, lon: f64) -> Self {
        Self::ByCoordinates(Coordinates::new(lat, lon))
    }

    pub fn is_by_name(&self) -> bool {
        matches!(self, Self::ByName(_))
    }

    /// Returns the normalized query (name trimmed) or `InvalidInput`.
    pub fn validate(&self) -> Result<Self, FetchError> {
        match self {
            Self::ByName(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(FetchError::InvalidInput("city name is empty".to_string()));
                }
                Ok(Self::ByName(trimmed.to_string()))
            }
            Self::ByCoordinates(coords) => {
                if !coords.is_valid() {
                    return Err(FetchError::InvalidInput(format!(
                        "coordinates out of range: lat={}, lon={}",
                        coords.lat, coords.lon
                    )));
                }
                Ok(Self::ByCoordinates(*coords))
            }
        }
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => f.write_str(name),
            Self::ByCoordinates(coords) => write!(f, "({coords})"),
        }
    }
}

/// Unit system requested from the provider. Only temperature and wind speed
/// depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value of the provider's `units` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    pub const fn all() -> &'static [UnitSystem] {
        &[UnitSystem::Metric, UnitSystem::Imperial]
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "°C",
            UnitSystem::Imperial => "°F",
        }
    }

    pub fn speed_symbol(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "m/s",
            UnitSystem::Imperial => "mph",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitSystem {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "metric" | "c" | "celsius" => Ok(UnitSystem::Metric),
            "imperial" | "f" | "fahrenheit" => Ok(UnitSystem::Imperial),
            _ => Err(anyhow::anyhow!(
                "Unknown unit system '{value}'. Supported: metric, imperial."
            )),
        }
    }
}

/// One fully populated reading for a single location and unit system.
///
/// Values are stored exactly as the provider reported them; rounding is left
/// to whoever renders the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub country: String,
    pub description: String,
    pub icon: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: f64,
    pub wind_speed: f64,
    pub visibility_m: u32,
    pub units: UnitSystem,
    /// Position the provider resolved the query to. Used to re-fetch in a
    /// different unit system.
    pub coordinates: Option<Coordinates>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherSnapshot {
    pub fn icon_url(&self) -> String {
        crate::provider::icon_url(&self.icon)
    }
}
