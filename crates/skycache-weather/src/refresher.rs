//! Refresh and read paths over the provider, the cache store and the
//! schedule registry.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{FetchError, WeatherError};
use crate::filter::{current_entry, filter_future};
use crate::provider::{normalize_place, WeatherProvider};
use crate::schedule::ScheduleRegistry;
use crate::store::ForecastStore;
use crate::types::{CacheRecord, ForecastEntry, ForecastSeries};

/// Why a refresh did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source has no active schedule.
    Inactive,
    /// The schedule has no place to fetch.
    NoPlace,
}

/// Result of one scheduled refresh. Never an error: failures are reported
/// here and the previous cache record is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated { entries: usize },
    Skipped(SkipReason),
    Failed(String),
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { entries } => write!(f, "updated ({} entries)", entries),
            Self::Skipped(SkipReason::Inactive) => write!(f, "skipped (not scheduled)"),
            Self::Skipped(SkipReason::NoPlace) => write!(f, "skipped (no place)"),
            Self::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

pub struct Refresher {
    provider: WeatherProvider,
    store: Arc<dyn ForecastStore>,
    registry: Arc<ScheduleRegistry>,
}

impl Refresher {
    pub fn new(
        provider: WeatherProvider,
        store: Arc<dyn ForecastStore>,
        registry: Arc<ScheduleRegistry>,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ScheduleRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn ForecastStore> {
        &self.store
    }

    /// Fetch `place` and replace the cached record for `source_id`.
    ///
    /// Does nothing unless `source_id` is still scheduled. A failed fetch or
    /// write leaves the cached record as it was; the next tick is the retry.
    #[instrument(skip(self), level = "debug")]
    pub async fn refresh(&self, source_id: &str, place: &str) -> RefreshOutcome {
        if !self.registry.is_active(source_id) {
            tracing::debug!("Skipping refresh for inactive source {}", source_id);
            return RefreshOutcome::Skipped(SkipReason::Inactive);
        }

        let place = normalize_place(place);
        if place.is_empty() {
            tracing::info!("No place configured for {}, skipping refresh", source_id);
            return RefreshOutcome::Skipped(SkipReason::NoPlace);
        }

        let series = match self.provider.fetch(place).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("Forecast refresh for {} failed: {}", source_id, e);
                return RefreshOutcome::Failed(e.to_string());
            }
        };

        let entries = series.len();
        let record = CacheRecord::new(place, series, Utc::now());
        if let Err(e) = self.store.put(source_id, &record) {
            tracing::warn!("Could not store forecast for {}: {}", source_id, e);
            return RefreshOutcome::Failed(e.to_string());
        }

        tracing::debug!("Cached {} forecast entries for {}", entries, source_id);
        RefreshOutcome::Updated { entries }
    }

    /// Earliest forecast entry that has not started yet.
    pub async fn get_current(
        &self,
        source_id: &str,
        place: &str,
    ) -> Result<ForecastEntry, WeatherError> {
        self.get_current_at(source_id, place, Utc::now()).await
    }

    /// [`get_current`](Self::get_current) with an explicit reference time.
    ///
    /// Falls back to a one-off fetch when nothing is cached. That fetch is
    /// not written back; only scheduled refreshes write the cache.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_current_at(
        &self,
        source_id: &str,
        place: &str,
        now: DateTime<Utc>,
    ) -> Result<ForecastEntry, WeatherError> {
        let series = match self.store.get(source_id)? {
            Some(record) => record.series,
            None => {
                tracing::debug!("No cached forecast for {}, fetching inline", source_id);
                self.provider.fetch(place).await?
            }
        };

        current_entry(&series, now).ok_or(WeatherError::NotFound)
    }

    /// One-off fetch of the entries for `place` that start at or after `now`.
    pub async fn fetch_future(
        &self,
        place: &str,
        now: DateTime<Utc>,
    ) -> Result<ForecastSeries, FetchError> {
        let series = self.provider.fetch(place).await?;
        Ok(filter_future(&series, now))
    }

    /// Source ids that currently have a cached record, sorted.
    pub fn cached_sources(&self) -> Result<Vec<String>, WeatherError> {
        Ok(self.store.source_ids()?)
    }

    /// Drop the cached record for `source_id`. Returns whether one existed.
    pub fn purge(&self, source_id: &str) -> Result<bool, WeatherError> {
        let removed = self.store.remove(source_id)?;
        if removed {
            tracing::info!("Purged cached forecast for {}", source_id);
        }
        Ok(removed)
    }
}
