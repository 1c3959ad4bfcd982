//! Timer-driven refresh scheduling.
//!
//! Each registered schedule gets its own task that ticks immediately and then
//! every `interval`. Cancellation is cooperative: a tick already running
//! finishes (and may write the cache) before the task stops.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::WeatherError;
use crate::refresher::{RefreshOutcome, Refresher};
use crate::schedule::{Schedule, ScheduleRegistry};

struct Timer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    refresher: Arc<Refresher>,
    registry: Arc<ScheduleRegistry>,
    timers: Mutex<HashMap<String, Timer>>,
    root: CancellationToken,
}

impl Scheduler {
    pub fn new(refresher: Arc<Refresher>) -> Self {
        let registry = refresher.registry().clone();
        Self {
            refresher,
            registry,
            timers: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    pub fn refresher(&self) -> &Arc<Refresher> {
        &self.refresher
    }

    /// Activate `schedule` and arm its timer, first tick now.
    ///
    /// An existing timer for the same source is discarded, never resumed.
    /// Must be called from within a tokio runtime.
    pub fn register(&self, schedule: Schedule) -> Result<(), WeatherError> {
        schedule.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            WeatherError::InvalidSchedule("scheduler needs a running tokio runtime".to_string())
        })?;

        let mut timers = self.timers.lock();
        if let Some(old) = timers.remove(&schedule.source_id) {
            tracing::debug!("Re-arming schedule for {}", schedule.source_id);
            old.token.cancel();
        }

        self.registry.insert(schedule.clone());

        let token = self.root.child_token();
        let source_id = schedule.source_id.clone();
        tracing::info!(
            "Scheduled {} ({:?}) every {:?}",
            source_id,
            schedule.place,
            schedule.interval
        );
        let handle = runtime.spawn(run_timer(self.refresher.clone(), schedule, token.clone()));
        timers.insert(source_id, Timer { token, handle });
        Ok(())
    }

    /// Deactivate `source_id` and stop its timer. Returns whether it was active.
    ///
    /// The cached record is left in place; see [`Refresher::purge`].
    pub fn cancel(&self, source_id: &str) -> bool {
        let removed = self.registry.remove(source_id).is_some();
        if let Some(timer) = self.timers.lock().remove(source_id) {
            timer.token.cancel();
        }
        if removed {
            tracing::info!("Cancelled schedule for {}", source_id);
        }
        removed
    }

    /// Active schedules, ordered by source id.
    pub fn active(&self) -> Vec<Schedule> {
        self.registry.active()
    }

    pub fn is_active(&self, source_id: &str) -> bool {
        self.registry.is_active(source_id)
    }

    /// Stop every timer and wait for in-flight ticks to finish.
    pub async fn shutdown(&self) {
        self.root.cancel();
        self.registry.clear();

        let timers: Vec<(String, Timer)> = self.timers.lock().drain().collect();
        for (source_id, timer) in timers {
            if let Err(e) = timer.handle.await {
                tracing::warn!("Timer task for {} ended abnormally: {}", source_id, e);
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn run_timer(refresher: Arc<Refresher>, schedule: Schedule, token: CancellationToken) {
    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Cancellation wins over a tick that is ready at the same time
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                // Runs to completion even if cancelled meanwhile
                match refresher.refresh(&schedule.source_id, &schedule.place).await {
                    RefreshOutcome::Updated { entries } => {
                        tracing::info!("Refreshed {}: {} entries", schedule.source_id, entries);
                    }
                    RefreshOutcome::Failed(_) | RefreshOutcome::Skipped(_) => {}
                }
            }
        }
    }
    tracing::debug!("Timer for {} stopped", schedule.source_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::WeatherProvider;
    use crate::store::{ForecastStore, MemoryForecastStore};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FORECAST: &str = r#"<weatherdata><forecast><tabular>
        <time from="2099-01-01T12:00:00"><symbol var="01d"/><temperature unit="celsius" value="5.0"/></time>
    </tabular></forecast></weatherdata>"#;

    async fn mount(server: &MockServer, place: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/forecast.xml", place)))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST))
            .mount(server)
            .await;
    }

    fn setup(server: &MockServer) -> (Scheduler, Arc<MemoryForecastStore>) {
        let store = Arc::new(MemoryForecastStore::new());
        let provider = WeatherProvider::with_base_url(&server.uri()).unwrap();
        let refresher = Refresher::new(provider, store.clone(), Arc::new(ScheduleRegistry::new()));
        (Scheduler::new(Arc::new(refresher)), store)
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check()
    }

    fn place_of(store: &MemoryForecastStore, source_id: &str) -> Option<String> {
        store.get(source_id).unwrap().map(|record| record.place)
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_first_tick_is_immediate() {
        let server = MockServer::start().await;
        mount(&server, "oslo").await;
        let (scheduler, store) = setup(&server);

        scheduler
            .register(Schedule::new("w1", "oslo", Duration::from_secs(3600)))
            .unwrap();

        assert!(eventually(|| store.get("w1").unwrap().is_some()).await);
        assert_eq!(request_count(&server).await, 1);
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_stops_ticks_and_keeps_cache() {
        let server = MockServer::start().await;
        mount(&server, "oslo").await;
        let (scheduler, store) = setup(&server);

        scheduler
            .register(Schedule::new("w1", "oslo", Duration::from_millis(50)))
            .unwrap();
        assert!(eventually(|| store.get("w1").unwrap().is_some()).await);

        assert!(scheduler.cancel("w1"));
        assert!(!scheduler.is_active("w1"));
        assert!(!scheduler.cancel("w1"));

        // Let any in-flight tick settle before counting
        tokio::time::sleep(Duration::from_millis(100)).await;
        let after_cancel = request_count(&server).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(request_count(&server).await, after_cancel);

        assert!(store.get("w1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_register_rearms_with_new_place() {
        let server = MockServer::start().await;
        mount(&server, "oslo").await;
        mount(&server, "bergen").await;
        let (scheduler, store) = setup(&server);

        scheduler
            .register(Schedule::new("w1", "oslo", Duration::from_secs(3600)))
            .unwrap();
        assert!(eventually(|| place_of(&store, "w1").as_deref() == Some("oslo")).await);

        scheduler
            .register(Schedule::new("w1", "bergen", Duration::from_secs(3600)))
            .unwrap();
        assert!(eventually(|| place_of(&store, "w1").as_deref() == Some("bergen")).await);

        let active = scheduler.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].place, "bergen");
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_timer_never_starts_a_tick() {
        let server = MockServer::start().await;
        mount(&server, "oslo").await;
        let (scheduler, store) = setup(&server);

        let schedule = Schedule::new("w1", "oslo", Duration::from_millis(10));
        scheduler.refresher().registry().insert(schedule.clone());
        let token = CancellationToken::new();
        token.cancel();

        // First tick is ready immediately, but the token is already cancelled
        for _ in 0..20 {
            run_timer(scheduler.refresher().clone(), schedule.clone(), token.clone()).await;
        }

        assert_eq!(request_count(&server).await, 0);
        assert!(store.get("w1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected() {
        let server = MockServer::start().await;
        let (scheduler, _) = setup(&server);

        let err = scheduler
            .register(Schedule::new("w1", "oslo", Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidSchedule(_)));
        assert!(scheduler.active().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_clears_everything() {
        let server = MockServer::start().await;
        mount(&server, "oslo").await;
        let (scheduler, _) = setup(&server);

        scheduler
            .register(Schedule::new("w1", "oslo", Duration::from_secs(3600)))
            .unwrap();
        scheduler
            .register(Schedule::new("w2", "", Duration::from_secs(3600)))
            .unwrap();
        assert_eq!(scheduler.active().len(), 2);

        scheduler.shutdown().await;
        assert!(scheduler.active().is_empty());
        assert!(!scheduler.refresher().registry().is_active("w1"));
    }
}
