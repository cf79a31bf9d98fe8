use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::{FetchError, FetchOutcome},
    model::{Coordinates, LocationQuery, UnitSystem, WeatherSnapshot},
};

use super::{OPENWEATHER_BASE_URL, WeatherClient};

/// Client for OpenWeatherMap's `/weather` (current conditions) endpoint.
///
/// Uses the transport's default timeouts and issues exactly one request per
/// call; nothing is cached or retried.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENWEATHER_BASE_URL)
    }

    /// Point the client at another host, e.g. a mock server in tests.
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            api_key,
            base_url,
            http: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/weather", self.base_url)
    }

    fn query_params(
        &self,
        query: &LocationQuery,
        units: UnitSystem,
    ) -> Vec<(&'static str, String)> {
        let mut params = match query {
            LocationQuery::ByName(name) => vec![("q", name.clone())],
            LocationQuery::ByCoordinates(c) => {
                vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())]
            }
        };
        params.push(("appid", self.api_key.clone()));
        params.push(("units", units.as_str().to_string()));
        params
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    sys: OwSys,
    weather: Vec<OwWeather>,
    main: OwMain,
    wind: OwWind,
    visibility: u32,
    coord: Option<OwCoord>,
    dt: Option<i64>,
}

/// Turn a current-conditions body into a snapshot.
pub(crate) fn parse_current(body: &str, units: UnitSystem) -> FetchOutcome {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    let condition = parsed.weather.into_iter().next().ok_or_else(|| {
        FetchError::MalformedResponse("response contained no weather conditions".to_string())
    })?;

    Ok(WeatherSnapshot {
        location_name: parsed.name,
        country: parsed.sys.country,
        description: condition.description,
        icon: condition.icon,
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        pressure_hpa: parsed.main.pressure,
        wind_speed: parsed.wind.speed,
        visibility_m: parsed.visibility,
        units,
        coordinates: parsed.coord.map(|c| Coordinates::new(c.lat, c.lon)),
        observed_at: parsed.dt.and_then(unix_to_utc),
    })
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip_all, fields(units = %units))]
    async fn fetch_weather(&self, query: &LocationQuery, units: UnitSystem) -> FetchOutcome {
        let query = query.validate()?;

        debug!(%query, "Requesting current weather from OpenWeather");

        let res = self
            .http
            .get(self.endpoint())
            .query(&self.query_params(&query, units))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenWeather request failed to send");
                FetchError::NetworkError(e.without_url().to_string())
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            warn!(error = %e, "Failed to read OpenWeather response body");
            FetchError::NetworkError(e.without_url().to_string())
        })?;

        if !status.is_success() {
            warn!(%status, "OpenWeather returned a non-success status");
            return Err(FetchError::NotFound {
                status: status.as_u16(),
                body: truncate_body(&body),
                by_name: query.is_by_name(),
            });
        }

        parse_current(&body, units)
            .inspect_err(|e| warn!(error = %e, "Unusable OpenWeather body"))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
