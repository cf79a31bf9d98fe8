//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The current-weather client for OpenWeatherMap and the snapshot it produces
//! - The failure taxonomy shared by every fetch
//! - Location collaborators (IP lookup, fixed coordinates)
//! - The session that owns the current snapshot and re-fetches on unit changes
//! - Configuration & credentials handling
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod provider;
pub mod session;

pub use config::Config;
pub use error::{FailureKind, FetchError, FetchOutcome};
pub use geolocation::{FixedLocation, IpLocationProvider, LocationError, LocationProvider};
pub use model::{Coordinates, LocationQuery, UnitSystem, WeatherSnapshot};
pub use provider::{WeatherClient, client_from_config, icon_url, openweather::OpenWeatherClient};
pub use session::{SessionState, WeatherSession};
