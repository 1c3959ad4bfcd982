//! Value formatting for whatever renders the current forecast.

use std::fmt::Write;

use crate::provider::normalize_place;
use crate::types::ForecastEntry;

pub const ATTRIBUTION: &str =
    "Weather forecast from Yr, delivered by the Norwegian Meteorological Institute and NRK.";

/// Formats forecast values as display strings.
#[derive(Debug, Clone)]
pub struct ForecastDisplay {
    symbol_base_url: String,
    date_format: String,
}

impl ForecastDisplay {
    pub fn new(symbol_base_url: impl Into<String>, date_format: impl Into<String>) -> Self {
        Self {
            symbol_base_url: symbol_base_url.into(),
            date_format: date_format.into(),
        }
    }

    /// "5.0 °C" or "280.4 K"
    pub fn temperature_label(&self, entry: &ForecastEntry) -> String {
        format!(
            "{:.1} {}",
            entry.temperature(),
            entry.temperature_unit().symbol()
        )
    }

    pub fn symbol_url(&self, entry: &ForecastEntry) -> String {
        format!(
            "{}/{}.png",
            self.symbol_base_url.trim_end_matches('/'),
            entry.symbol_code()
        )
    }

    /// Start time in UTC using the configured chrono format.
    ///
    /// A format string chrono rejects falls back to RFC 3339.
    pub fn time_label(&self, entry: &ForecastEntry) -> String {
        let mut label = String::new();
        match write!(label, "{}", entry.valid_at().format(&self.date_format)) {
            Ok(()) => label,
            Err(_) => {
                tracing::debug!("Invalid date format {:?}", self.date_format);
                entry.valid_at().to_rfc3339()
            }
        }
    }

    /// "Norway/Oslo/Oslo" becomes "Norway » Oslo » Oslo".
    pub fn place_breadcrumb(&self, place: &str) -> String {
        normalize_place(place)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace('_', " "))
            .collect::<Vec<_>>()
            .join(" » ")
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }
}
