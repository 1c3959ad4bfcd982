//! Forecast XML document parser.
//!
//! Only the tabular forecast is read:
//!
//! ```xml
//! <weatherdata>
//!   <forecast>
//!     <tabular>
//!       <time from="2024-05-01T12:00:00" to="2024-05-01T18:00:00">
//!         <symbol var="01d" />
//!         <temperature unit="celsius" value="5" />
//!       </time>
//!     </tabular>
//!   </forecast>
//! </weatherdata>
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FetchError;
use crate::types::{ForecastEntry, ForecastSeries, TemperatureUnit};

/// Offset-less timestamp layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Default)]
struct PendingEntry {
    from: Option<String>,
    temperature: Option<String>,
    unit: Option<String>,
    symbol: Option<String>,
}

#[derive(Default)]
struct ParseState {
    saw_forecast: bool,
    saw_tabular: bool,
    pending: Option<PendingEntry>,
    entries: Vec<ForecastEntry>,
}

/// Parse a forecast document into a series ordered by start time.
pub fn parse_forecast(xml: &str) -> Result<ForecastSeries, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut state = ParseState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                saw_root = true;
                open_element(e, &path, &mut state)?;
                path.push(e.name().as_ref().to_vec());
            }
            Ok(Event::Empty(ref e)) => {
                saw_root = true;
                open_element(e, &path, &mut state)?;
                close_element(e.name().as_ref(), &path, &mut state)?;
            }
            Ok(Event::End(ref e)) => {
                path.pop();
                close_element(e.name().as_ref(), &path, &mut state)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "{} at position {}",
                    e,
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(FetchError::Parse("document has no root element".to_string()));
    }
    if !path.is_empty() {
        return Err(FetchError::Parse("unexpected end of document".to_string()));
    }
    if !state.saw_forecast || !state.saw_tabular {
        return Err(FetchError::Schema(
            "document has no forecast/tabular section".to_string(),
        ));
    }

    Ok(ForecastSeries::from_entries(state.entries))
}

/// True if the innermost open elements are `names`, outermost first.
fn parent_is(path: &[Vec<u8>], names: &[&str]) -> bool {
    path.len() >= names.len()
        && path[path.len() - names.len()..]
            .iter()
            .zip(names)
            .all(|(have, want)| have.as_slice() == want.as_bytes())
}

fn open_element(e: &BytesStart, path: &[Vec<u8>], state: &mut ParseState) -> Result<(), FetchError> {
    match e.name().as_ref() {
        b"forecast" if path.len() == 1 => state.saw_forecast = true,
        b"tabular" if parent_is(path, &["forecast"]) => state.saw_tabular = true,
        b"time" if parent_is(path, &["forecast", "tabular"]) => {
            state.pending = Some(PendingEntry {
                from: get_attr(e, b"from")?,
                ..PendingEntry::default()
            });
        }
        b"temperature" if parent_is(path, &["tabular", "time"]) => {
            if let Some(pending) = state.pending.as_mut() {
                pending.temperature = get_attr(e, b"value")?;
                pending.unit = get_attr(e, b"unit")?;
            }
        }
        b"symbol" if parent_is(path, &["tabular", "time"]) => {
            if let Some(pending) = state.pending.as_mut() {
                pending.symbol = get_attr(e, b"var")?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn close_element(name: &[u8], path: &[Vec<u8>], state: &mut ParseState) -> Result<(), FetchError> {
    if name == b"time" && parent_is(path, &["forecast", "tabular"]) {
        if let Some(pending) = state.pending.take() {
            let index = state.entries.len();
            state.entries.push(finish_entry(pending, index)?);
        }
    }
    Ok(())
}

fn finish_entry(pending: PendingEntry, index: usize) -> Result<ForecastEntry, FetchError> {
    let missing = |what: &str| FetchError::Schema(format!("time[{}] has no {}", index, what));

    let from = pending.from.ok_or_else(|| missing("'from' attribute"))?;
    let valid_at = parse_timestamp(&from).ok_or_else(|| {
        FetchError::Schema(format!("time[{}] has invalid start time '{}'", index, from))
    })?;

    let value = pending.temperature.ok_or_else(|| missing("temperature value"))?;
    let temperature = value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| {
            FetchError::Schema(format!("time[{}] has non-numeric temperature '{}'", index, value))
        })?;

    let unit: TemperatureUnit = pending
        .unit
        .ok_or_else(|| missing("temperature unit"))?
        .parse()
        .map_err(|e| FetchError::Schema(format!("time[{}]: {}", index, e)))?;

    let symbol = pending
        .symbol
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("symbol"))?;

    Ok(ForecastEntry::new(temperature, unit, valid_at, symbol.trim()))
}

/// Parse an ISO-like timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn get_attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>, FetchError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| FetchError::Parse(format!("Invalid attribute: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| FetchError::Parse(format!("Invalid attribute value: {}", e)))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}
