//! Maps weather crate errors to skycache_core::AppError for consistent user-facing messages.

use skycache_core::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
    WeatherError as CoreWeatherError,
};
use skycache_weather::{FetchError, StoreError, WeatherError};

pub fn from_fetch(e: FetchError) -> AppError {
    match e {
        FetchError::InvalidPlace(place) => {
            AppError::Weather(CoreWeatherError::InvalidPlace(place))
        }
        FetchError::Network(e) => AppError::Network(e.into_network_error()),
        FetchError::Http { code } => AppError::Network(NetworkError::ServerError {
            status: code,
            message: format!("forecast request returned {}", code),
        }),
        FetchError::Parse(msg) | FetchError::Schema(msg) => {
            AppError::Weather(CoreWeatherError::Document(msg))
        }
    }
}

pub fn from_store(e: StoreError) -> AppError {
    match e {
        StoreError::Sqlite(e) => AppError::Database(e.into_database_error()),
        StoreError::Corrupt { source_id, message } => AppError::Database(
            DatabaseError::Corruption(format!("{}: {}", source_id, message)),
        ),
        StoreError::Encode(e) => AppError::Database(DatabaseError::QueryFailed(e.to_string())),
        StoreError::Io(e) => AppError::Io(e),
    }
}

pub fn from_weather(e: WeatherError) -> AppError {
    match e {
        WeatherError::Fetch(e) => from_fetch(e),
        WeatherError::Store(e) => from_store(e),
        WeatherError::NotFound => AppError::Weather(CoreWeatherError::NoFreshData),
        WeatherError::InvalidSchedule(msg) | WeatherError::Config(msg) => {
            AppError::Config(ConfigError::Invalid(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_user_message() {
        let app = from_weather(WeatherError::NotFound);
        assert!(matches!(app, AppError::Weather(CoreWeatherError::NoFreshData)));
        assert_eq!(app.user_message(), "No fresh weather data found.");
    }

    #[test]
    fn test_http_maps_to_server_error() {
        let app = from_weather(FetchError::Http { code: 503 }.into());
        assert!(matches!(
            app,
            AppError::Network(NetworkError::ServerError { status: 503, .. })
        ));
    }

    #[test]
    fn test_document_errors() {
        for e in [FetchError::Parse("eof".into()), FetchError::Schema("no tabular".into())] {
            assert!(matches!(
                from_fetch(e),
                AppError::Weather(CoreWeatherError::Document(_))
            ));
        }
        assert!(matches!(
            from_fetch(FetchError::InvalidPlace(String::new())),
            AppError::Weather(CoreWeatherError::InvalidPlace(_))
        ));
    }

    #[test]
    fn test_store_errors() {
        let app = from_store(StoreError::Corrupt {
            source_id: "w1".into(),
            message: "bad json".into(),
        });
        assert!(matches!(app, AppError::Database(DatabaseError::Corruption(ref m)) if m.contains("w1")));

        let app = from_weather(WeatherError::InvalidSchedule("zero interval".into()));
        assert!(matches!(app, AppError::Config(ConfigError::Invalid(_))));
    }
}
