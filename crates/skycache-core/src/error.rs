//! Centralized error types for SkyCache.
//!
//! Every failure that reaches the binary is converted into [`AppError`];
//! `user_message()` gives the short text shown next to a feed.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display next to a forecast.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The forecast service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "Could not fetch the forecast.",
            NetworkError::InvalidResponse(_) => "Could not read the forecast data.",
        }
    }
}

/// Cache storage errors (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => {
                "Unable to open the forecast cache. Check the storage path."
            }
            DatabaseError::QueryFailed(_) => "A cache operation failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "The forecast cache may be corrupted. Consider purging it."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown feed: {0}")]
    UnknownFeed(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::UnknownFeed(_) => "No feed with that id is configured.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Invalid place: {0}")]
    InvalidPlace(String),

    #[error("Forecast document error: {0}")]
    Document(String),

    #[error("No current forecast")]
    NoFreshData,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::InvalidPlace(_) => "No place configured for this feed.",
            WeatherError::Document(_) => "No forecast data found.",
            WeatherError::NoFreshData => "No fresh weather data found.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() || self.is_body() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                DatabaseError::ConnectionFailed(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_non_empty() {
        let errors: Vec<AppError> = vec![
            NetworkError::Timeout.into(),
            DatabaseError::QueryFailed("test".into()).into(),
            ConfigError::Invalid("test".into()).into(),
            WeatherError::NoFreshData.into(),
            std::io::Error::new(std::io::ErrorKind::Other, "disk").into(),
        ];

        for err in errors {
            assert!(!err.user_message().is_empty(), "empty message for {}", err);
        }
    }

    #[test]
    fn test_app_error_conversion() {
        let weather_err = WeatherError::NoFreshData;
        let app_err: AppError = weather_err.into();
        assert!(matches!(app_err, AppError::Weather(WeatherError::NoFreshData)));
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Weather(WeatherError::NoFreshData);
        assert_eq!(app_err.user_message(), "No fresh weather data found.");
    }

    #[test]
    fn test_server_error_message_depends_on_status() {
        let server = NetworkError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        let client = NetworkError::ServerError {
            status: 404,
            message: "missing".into(),
        };
        assert!(server.user_message().contains("try again later"));
        assert_eq!(client.user_message(), "Could not fetch the forecast.");
    }

    #[test]
    fn test_rusqlite_query_error_maps_to_query_failed() {
        let err = rusqlite::Error::QueryReturnedNoRows.into_database_error();
        assert!(matches!(err, DatabaseError::QueryFailed(_)));
    }
}
