//! Schedules and the registry of active ones.
//!
//! The registry is the single source of truth for "is this feed still
//! scheduled". Both the scheduler and the refresher hold it.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::WeatherError;

/// A recurring refresh of one source's forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub source_id: String,
    pub place: String,
    pub interval: Duration,
}

impl Schedule {
    pub fn new(source_id: impl Into<String>, place: impl Into<String>, interval: Duration) -> Self {
        Self {
            source_id: source_id.into(),
            place: place.into(),
            interval,
        }
    }

    /// An empty place is allowed; ticks for it are skipped.
    pub fn validate(&self) -> Result<(), WeatherError> {
        if self.source_id.trim().is_empty() {
            return Err(WeatherError::InvalidSchedule(
                "source id cannot be empty".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(WeatherError::InvalidSchedule(format!(
                "interval for '{}' must be greater than zero",
                self.source_id
            )));
        }
        Ok(())
    }
}

/// Active schedules keyed by source id.
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    schedules: RwLock<HashMap<String, Schedule>>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns the previous schedule for the same source.
    pub fn insert(&self, schedule: Schedule) -> Option<Schedule> {
        self.schedules
            .write()
            .insert(schedule.source_id.clone(), schedule)
    }

    pub fn remove(&self, source_id: &str) -> Option<Schedule> {
        self.schedules.write().remove(source_id)
    }

    pub fn is_active(&self, source_id: &str) -> bool {
        self.schedules.read().contains_key(source_id)
    }

    /// Snapshot of active schedules, ordered by source id.
    pub fn active(&self) -> Vec<Schedule> {
        let mut schedules: Vec<Schedule> = self.schedules.read().values().cloned().collect();
        schedules.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        schedules
    }

    pub fn len(&self) -> usize {
        self.schedules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.read().is_empty()
    }

    pub fn clear(&self) {
        self.schedules.write().clear();
    }
}
