use chrono::{DateTime, Utc};

use crate::types::{ForecastEntry, ForecastSeries};

/// Drop entries that start before `now`, keeping order.
///
/// An empty result means "no current data", not an error.
pub fn filter_future(series: &ForecastSeries, now: DateTime<Utc>) -> ForecastSeries {
    let fresh: Vec<ForecastEntry> = series
        .iter()
        .filter(|entry| !entry.is_stale(now))
        .cloned()
        .collect();
    // Already ordered; from_entries' stable sort leaves it as is.
    ForecastSeries::from_entries(fresh)
}

/// Earliest entry starting at or after `now`.
pub fn current_entry(series: &ForecastSeries, now: DateTime<Utc>) -> Option<ForecastEntry> {
    filter_future(series, now).first().cloned()
}
