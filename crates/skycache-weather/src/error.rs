//! Weather-specific error types.

use thiserror::Error;

/// Why a single forecast fetch failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid place: {0:?}")]
    InvalidPlace(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Could not fetch forecast. Response code was: {code}")]
    Http { code: u16 },

    #[error("Could not parse forecast XML: {0}")]
    Parse(String),

    #[error("No forecast data found: {0}")]
    Schema(String),
}

impl FetchError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidPlace(_) => "No place configured for this feed.".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Http { code } => {
                format!("Could not fetch temperature. Response code was: {}", code)
            }
            Self::Parse(_) => "Could not fetch XML data.".to_string(),
            Self::Schema(_) => "No forecast data found.".to_string(),
        }
    }
}

/// Forecast cache storage failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Could not encode cache record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt cache record for {source_id}: {message}")]
    Corrupt { source_id: String, message: String },

    #[error("Could not prepare cache location: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Cache error: {0}")]
    Store(#[from] StoreError),

    #[error("No current forecast")]
    NotFound,

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid provider configuration: {0}")]
    Config(String),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Fetch(e) => e.user_message(),
            Self::Store(_) => "Weather data may be outdated.".to_string(),
            Self::NotFound => "No fresh weather data found.".to_string(),
            Self::InvalidSchedule(msg) => format!("Invalid schedule: {}", msg),
            Self::Config(msg) => format!("Invalid weather settings: {}", msg),
        }
    }
}
