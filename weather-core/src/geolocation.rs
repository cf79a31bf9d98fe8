//! Location collaborators.
//!
//! The weather client only ever sees resolved [`Coordinates`]; obtaining
//! them is the job of a [`LocationProvider`]. Each call is a single attempt
//! and is never retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::model::Coordinates;

pub const IPINFO_URL: &str = "https://ipinfo.io/json";

const IPINFO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("location access was denied")]
    PermissionDenied,

    #[error("location lookup is not supported here")]
    Unsupported,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Coordinates known up front, e.g. passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    coords: Coordinates,
}

impl FixedLocation {
    pub fn new(coords: Coordinates) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.coords)
    }
}

/// Approximates the device position from the public IP via ipinfo.io.
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    http: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
    city: Option<String>,
    /// Set for private and reserved addresses, which have no position.
    #[serde(default)]
    bogon: bool,
}

impl IpLocationProvider {
    pub fn new() -> Self {
        Self::with_endpoint(IPINFO_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(IPINFO_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build location HTTP client, using defaults");
                Client::new()
            });

        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    #[instrument(skip(self))]
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        let res = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| {
                LocationError::Unavailable(format!("lookup failed: {}", e.without_url()))
            })?;

        let status = res.status();
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LocationError::PermissionDenied);
        }
        if !status.is_success() {
            return Err(LocationError::Unavailable(format!("lookup returned HTTP {status}")));
        }

        let info: IpInfoResponse = res
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(format!("unreadable lookup response: {e}")))?;

        if info.bogon {
            debug!("Public address is private or reserved, IP lookup cannot locate it");
            return Err(LocationError::Unsupported);
        }

        let loc = info
            .loc
            .ok_or_else(|| LocationError::Unavailable("lookup response has no position".into()))?;
        let coords = parse_loc(&loc)?;

        debug!(city = ?info.city, %coords, "Resolved position from IP");
        Ok(coords)
    }
}

/// Parse ipinfo's `"lat,lon"` field.
fn parse_loc(loc: &str) -> Result<Coordinates, LocationError> {
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| LocationError::Unavailable(format!("invalid position format: {loc}")))?;

    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| LocationError::Unavailable(format!("invalid latitude: {e}")))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| LocationError::Unavailable(format!("invalid longitude: {e}")))?;

    let coords = Coordinates::new(lat, lon);
    if !coords.is_valid() {
        return Err(LocationError::Unavailable(format!("position out of range: {loc}")));
    }
    Ok(coords)
}
