//! Forecast provider: one HTTP GET per fetch, XML body parsed into a series.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::document::parse_forecast;
use crate::error::{FetchError, WeatherError};
use crate::types::ForecastSeries;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FORECAST_DOCUMENT: &str = "forecast.xml";

/// Settings for building a [`WeatherProvider`]
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ProviderOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: format!("skycache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
}

impl WeatherProvider {
    pub fn new(options: &ProviderOptions) -> Result<Self, WeatherError> {
        let base_url = Url::parse(&options.base_url)
            .map_err(|e| WeatherError::Config(format!("base url '{}': {}", options.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(WeatherError::Config(format!(
                "base url '{}' cannot take a path",
                options.base_url
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(FetchError::from)?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
        })
    }

    /// Provider with default timeout and user agent
    pub fn with_base_url(base_url: &str) -> Result<Self, WeatherError> {
        Self::new(&ProviderOptions::new(base_url))
    }

    /// `{base_url}/{place}/forecast.xml`, one path segment per place component
    pub fn forecast_url(&self, place: &str) -> Result<Url, FetchError> {
        let place = normalize_place(place);
        if place.is_empty() {
            return Err(FetchError::InvalidPlace(place.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidPlace(place.to_string()))?
            .pop_if_empty()
            .extend(place.split('/').filter(|s| !s.is_empty()))
            .push(FORECAST_DOCUMENT);
        Ok(url)
    }

    /// Fetch and parse the forecast for `place`.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, place: &str) -> Result<ForecastSeries, FetchError> {
        let url = self.forecast_url(place)?;
        tracing::debug!("Fetching forecast from {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Forecast request returned status {}", status);
            return Err(FetchError::Http {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let series = parse_forecast(&body)?;

        tracing::debug!("Parsed {} forecast entries", series.len());
        Ok(series)
    }
}

/// Strip surrounding whitespace and slashes from a place path.
pub fn normalize_place(place: &str) -> &str {
    place.trim().trim_matches('/').trim()
}
