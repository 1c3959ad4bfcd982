//! Scheduled forecast cache for SkyCache
//!
//! Fetches tabular XML forecasts per place, keeps the latest series per
//! source in a persistent cache, and answers "what is the current forecast"
//! from that cache.

pub mod display;
pub mod document;
pub mod error;
pub mod filter;
pub mod provider;
pub mod refresher;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod types;

pub use display::{ForecastDisplay, ATTRIBUTION};
pub use document::parse_forecast;
pub use error::{FetchError, StoreError, WeatherError};
pub use filter::{current_entry, filter_future};
pub use provider::{ProviderOptions, WeatherProvider};
pub use refresher::{RefreshOutcome, Refresher, SkipReason};
pub use schedule::{Schedule, ScheduleRegistry};
pub use scheduler::Scheduler;
pub use store::{ForecastStore, MemoryForecastStore, SqliteForecastStore};
pub use types::*;
