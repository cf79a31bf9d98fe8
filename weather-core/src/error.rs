use thiserror::Error;

use crate::{geolocation::LocationError, model::WeatherSnapshot};

/// Result of a single fetch attempt. There is no partial state.
pub type FetchOutcome = Result<WeatherSnapshot, FetchError>;

/// Why a fetch produced no snapshot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Blank city name or out-of-range coordinates. No request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider answered with a non-success status. `by_name` records
    /// whether the lookup was for a city name or for coordinates.
    #[error("Location not found (HTTP {status}): {body}")]
    NotFound {
        status: u16,
        body: String,
        by_name: bool,
    },

    /// The request never produced a readable response.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The provider answered 2xx but the body is missing expected fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The location collaborator could not produce coordinates.
    #[error("Location unavailable: {0}")]
    LocationUnavailable(#[from] LocationError),
}

/// Field-less view of [`FetchError`], handy for matching and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidInput,
    NotFound,
    NetworkError,
    MalformedResponse,
    LocationUnavailable,
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidInput(_) => FailureKind::InvalidInput,
            FetchError::NotFound { .. } => FailureKind::NotFound,
            FetchError::NetworkError(_) => FailureKind::NetworkError,
            FetchError::MalformedResponse(_) => FailureKind::MalformedResponse,
            FetchError::LocationUnavailable(_) => FailureKind::LocationUnavailable,
        }
    }

    /// Short message meant for the person at the keyboard.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::InvalidInput(_) => "Please enter a city name",
            FetchError::NotFound { by_name: true, .. } => "City not found",
            FetchError::NotFound { by_name: false, .. } => "Unable to fetch weather data",
            FetchError::NetworkError(_) => "Failed to fetch weather data",
            FetchError::MalformedResponse(_) => "Unexpected response from the weather service",
            FetchError::LocationUnavailable(LocationError::Unsupported) => {
                "Geolocation is not supported on this machine"
            }
            FetchError::LocationUnavailable(_) => "Unable to retrieve your location",
        }
    }
}
