use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit a forecast temperature is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Kelvin,
}

impl TemperatureUnit {
    /// Short suffix for display ("°C" / "K")
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Kelvin => "K",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => write!(f, "celsius"),
            Self::Kelvin => write!(f, "kelvin"),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "celsius" => Ok(Self::Celsius),
            "kelvin" => Ok(Self::Kelvin),
            other => Err(format!("unsupported temperature unit '{}'", other)),
        }
    }
}

/// One forecast period. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    temperature: f64,
    temperature_unit: TemperatureUnit,
    valid_at: DateTime<Utc>,
    symbol_code: String,
}

impl ForecastEntry {
    pub fn new(
        temperature: f64,
        temperature_unit: TemperatureUnit,
        valid_at: DateTime<Utc>,
        symbol_code: impl Into<String>,
    ) -> Self {
        Self {
            temperature,
            temperature_unit,
            valid_at,
            symbol_code: symbol_code.into(),
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        self.temperature_unit
    }

    pub fn valid_at(&self) -> DateTime<Utc> {
        self.valid_at
    }

    pub fn symbol_code(&self) -> &str {
        &self.symbol_code
    }

    /// True if this entry starts before `now`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.valid_at < now
    }
}

/// Forecast entries from a single fetch, ascending by `valid_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastSeries(Vec<ForecastEntry>);

impl ForecastSeries {
    /// Build a series, ordering entries by start time.
    ///
    /// The sort is stable, so entries sharing a start time keep document order.
    pub fn from_entries(mut entries: Vec<ForecastEntry>) -> Self {
        entries.sort_by_key(|e| e.valid_at);
        Self(entries)
    }

    pub fn entries(&self) -> &[ForecastEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Earliest entry, if any
    pub fn first(&self) -> Option<&ForecastEntry> {
        self.0.first()
    }

    pub fn into_entries(self) -> Vec<ForecastEntry> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a ForecastEntry;
    type IntoIter = std::slice::Iter<'a, ForecastEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What the cache holds for one source: a whole series from one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub place: String,
    pub fetched_at: DateTime<Utc>,
    pub series: ForecastSeries,
}

impl CacheRecord {
    pub fn new(place: impl Into<String>, series: ForecastSeries, fetched_at: DateTime<Utc>) -> Self {
        Self {
            place: place.into(),
            fetched_at,
            series,
        }
    }
}
