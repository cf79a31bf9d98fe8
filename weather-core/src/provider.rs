use crate::{
    Config,
    error::FetchOutcome,
    model::{LocationQuery, UnitSystem},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const ICON_URL_TEMPLATE: &str = "https://openweathermap.org/img/wn/{icon}@4x.png";

/// Fetches and normalizes current conditions for one location.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    /// Blank names and out-of-range coordinates fail with `InvalidInput`
    /// before any request is made.
    async fn fetch_weather(&self, query: &LocationQuery, units: UnitSystem) -> FetchOutcome;
}

/// Image URL for a provider icon code such as `01d`. The code is used as an
/// opaque path segment.
pub fn icon_url(icon_code: &str) -> String {
    ICON_URL_TEMPLATE.replace("{icon}", icon_code)
}

/// Construct the OpenWeather client from the resolved configuration.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
             Hint: run `weather configure` or set {}.",
            Config::API_KEY_ENV
        )
    })?;

    let client = match config.base_url.as_deref() {
        Some(base) => OpenWeatherClient::with_base_url(api_key.to_owned(), base),
        None => OpenWeatherClient::new(api_key.to_owned()),
    };

    Ok(client)
}
