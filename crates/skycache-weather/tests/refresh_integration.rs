//! Integration tests for the refresh pipeline using wiremock and an on-disk
//! SQLite cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use skycache_weather::{
    ForecastStore, RefreshOutcome, Refresher, Schedule, ScheduleRegistry, Scheduler,
    SqliteForecastStore, WeatherError, WeatherProvider,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to build a forecast document from (from, celsius, symbol) rows
fn forecast_xml(rows: &[(&str, f64, &str)]) -> String {
    let times: String = rows
        .iter()
        .map(|(from, temp, symbol)| {
            format!(
                r#"<time from="{}"><symbol var="{}"/><temperature unit="celsius" value="{}"/></time>"#,
                from, symbol, temp
            )
        })
        .collect();
    format!(
        "<weatherdata><forecast><tabular>{}</tabular></forecast></weatherdata>",
        times
    )
}

fn refresher(server: &MockServer, store: Arc<SqliteForecastStore>) -> Arc<Refresher> {
    let provider = WeatherProvider::with_base_url(&server.uri()).unwrap();
    Arc::new(Refresher::new(provider, store, Arc::new(ScheduleRegistry::new())))
}

#[tokio::test]
async fn test_scheduled_refresh_survives_restart() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Norway/Oslo/Oslo/Oslo/forecast.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(forecast_xml(&[
            ("2000-01-01T06:00:00", -2.0, "04"),
            ("2099-01-01T12:00:00", 5.0, "01d"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("forecast_cache.db");

    {
        let store = Arc::new(SqliteForecastStore::open(&db_path).unwrap());
        let scheduler = Scheduler::new(refresher(&mock_server, store.clone()));
        scheduler
            .register(Schedule::new(
                "widget-1",
                "Norway/Oslo/Oslo/Oslo",
                Duration::from_secs(3600),
            ))
            .unwrap();

        let mut cached = false;
        for _ in 0..100 {
            if store.get("widget-1").unwrap().is_some() {
                cached = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(cached, "first tick never wrote the cache");
        scheduler.shutdown().await;
    }

    // Reopened store answers without another fetch
    let store = Arc::new(SqliteForecastStore::open(&db_path).unwrap());
    let refresher = refresher(&mock_server, store);
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let entry = refresher
        .get_current_at("widget-1", "Norway/Oslo/Oslo/Oslo", now)
        .await
        .unwrap();

    assert_eq!(entry.temperature(), 5.0);
    assert_eq!(entry.symbol_code(), "01d");
}

#[tokio::test]
async fn test_refresh_replaces_whole_series() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oslo/forecast.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(forecast_xml(&[
            ("2099-01-01T00:00:00", 1.0, "01d"),
            ("2099-01-01T06:00:00", 2.0, "02d"),
            ("2099-01-01T12:00:00", 3.0, "03d"),
        ])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oslo/forecast.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(forecast_xml(&[("2099-01-02T00:00:00", 9.0, "09")])),
        )
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteForecastStore::in_memory().unwrap());
    let refresher = refresher(&mock_server, store.clone());
    refresher
        .registry()
        .insert(Schedule::new("w1", "oslo", Duration::from_secs(3600)));

    assert_eq!(
        refresher.refresh("w1", "oslo").await,
        RefreshOutcome::Updated { entries: 3 }
    );
    assert_eq!(
        refresher.refresh("w1", "oslo").await,
        RefreshOutcome::Updated { entries: 1 }
    );

    let record = store.get("w1").unwrap().unwrap();
    let symbols: Vec<_> = record.series.iter().map(|e| e.symbol_code()).collect();
    assert_eq!(symbols, vec!["09"]);
}

#[tokio::test]
async fn test_all_stale_cache_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oslo/forecast.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(forecast_xml(&[
            ("2024-05-01T00:00:00", 1.0, "01d"),
            ("2024-05-01T06:00:00", 2.0, "02d"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteForecastStore::in_memory().unwrap());
    let refresher = refresher(&mock_server, store.clone());
    refresher
        .registry()
        .insert(Schedule::new("w1", "oslo", Duration::from_secs(3600)));
    refresher.refresh("w1", "oslo").await;
    let before = store.get("w1").unwrap();

    let now = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
    let err = refresher.get_current_at("w1", "oslo", now).await.unwrap_err();

    assert!(matches!(err, WeatherError::NotFound));
    assert_eq!(err.user_message(), "No fresh weather data found.");
    assert_eq!(store.get("w1").unwrap(), before);
}

#[tokio::test]
async fn test_cancel_does_not_purge() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oslo/forecast.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(forecast_xml(&[("2099-01-01T00:00:00", 1.0, "01d")])),
        )
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteForecastStore::in_memory().unwrap());
    let refresher = refresher(&mock_server, store.clone());
    refresher
        .registry()
        .insert(Schedule::new("w1", "oslo", Duration::from_secs(3600)));
    refresher.refresh("w1", "oslo").await;

    let scheduler = Scheduler::new(refresher.clone());
    assert!(scheduler.cancel("w1"));
    assert!(store.get("w1").unwrap().is_some());

    assert!(refresher.purge("w1").unwrap());
    assert!(store.get("w1").unwrap().is_none());
}
