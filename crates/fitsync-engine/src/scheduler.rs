//! Periodic background sync.
//!
//! The scheduler calls a sync function on a jittered interval. After a
//! failure it backs off exponentially, and never retries sooner than a
//! rate-limit `retry_after` the failure carried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::EngineError;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between syncs.
    pub sync_interval: Duration,
    /// Maximum jitter to add to sync interval (as fraction 0.0-1.0).
    pub jitter_fraction: f64,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(3600),
            jitter_fraction: 0.1,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(3600),
            backoff_multiplier: 2.0,
        }
    }
}

impl SchedulerConfig {
    pub fn new(sync_interval: Duration) -> Self {
        Self {
            sync_interval,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// The regular interval with jitter applied.
    pub fn next_sync_delay(&self) -> Duration {
        let base = self.sync_interval.as_secs_f64();
        let jitter = rand_jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Backoff after `consecutive_failures` failures in a row.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

/// Maps the sub-second clock to `[-range, range]`.
fn rand_jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let fraction = f64::from(nanos) / 1_000_000_000.0;
    (fraction * 2.0 - 1.0) * range
}

/// A failed sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub message: String,
    /// Minimum wait requested by upstream.
    pub retry_after: Option<Duration>,
}

impl SyncFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

impl From<EngineError> for SyncFailure {
    fn from(err: EngineError) -> Self {
        Self {
            retry_after: err.retry_after(),
            message: err.to_string(),
        }
    }
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    SyncNow,
    Stop,
}

/// Scheduler bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub consecutive_failures: u32,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Upstream-requested delay from the latest failure.
    pub retry_after: Option<Duration>,
}

impl SchedulerState {
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_sync = Some(Utc::now());
        self.last_attempt = self.last_sync;
        self.last_error = None;
        self.retry_after = None;
    }

    pub fn record_failure(&mut self, failure: SyncFailure) {
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(failure.message);
        self.retry_after = failure.retry_after;
    }
}

pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Runs a sync function periodically until stopped.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::default())),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn state(&self) -> SharedSchedulerState {
        Arc::clone(&self.state)
    }

    /// Syncs once immediately, then on every tick until [`SchedulerCommand::Stop`].
    pub async fn run<F, Fut>(mut self, sync_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), SyncFailure>> + Send,
    {
        info!(
            interval_secs = self.config.sync_interval.as_secs(),
            "scheduler started"
        );

        self.do_sync(&sync_fn).await;

        loop {
            let delay = self.next_delay().await;
            debug!(delay_secs = delay.as_secs(), "scheduling next sync");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.do_sync(&sync_fn).await;
                }
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::SyncNow) => {
                            debug!("received SyncNow command");
                            self.do_sync(&sync_fn).await;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn next_delay(&self) -> Duration {
        let state = self.state.read().await;
        if state.consecutive_failures == 0 {
            return self.config.next_sync_delay();
        }

        let backoff = self.config.backoff_delay(state.consecutive_failures);
        let delay = state.retry_after.map_or(backoff, |r| r.max(backoff));
        debug!(
            failures = state.consecutive_failures,
            delay_secs = delay.as_secs(),
            "using backoff delay"
        );
        delay
    }

    async fn do_sync<F, Fut>(&self, sync_fn: &F)
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), SyncFailure>>,
    {
        match sync_fn().await {
            Ok(()) => {
                info!("sync completed");
                self.state.write().await.record_success();
            }
            Err(failure) => {
                warn!(
                    error = %failure.message,
                    retry_after_secs = failure.retry_after.map(|d| d.as_secs()),
                    "sync failed"
                );
                self.state.write().await.record_failure(failure);
            }
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::SyncNow).await
    }

    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsync_fitbit::FitbitError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn next_sync_delay_stays_within_jitter() {
        let config = SchedulerConfig::new(Duration::from_secs(60)).with_jitter(0.1);
        let delay = config.next_sync_delay();
        assert!(delay.as_secs_f64() >= 54.0);
        assert!(delay.as_secs_f64() <= 66.0);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = SchedulerConfig::default().with_backoff(
            Duration::from_secs(5),
            Duration::from_secs(300),
            2.0,
        );
        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(10), Duration::from_secs(300));
        assert_eq!(config.backoff_delay(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn failure_from_rate_limit_keeps_delay() {
        let failure = SyncFailure::from(EngineError::from(FitbitError::RateLimited {
            retry_after_secs: 120,
            message: "slow".to_string(),
        }));
        assert_eq!(failure.retry_after, Some(Duration::from_secs(120)));

        let mut state = SchedulerState::default();
        state.record_failure(failure);
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.retry_after, Some(Duration::from_secs(120)));

        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.retry_after.is_none());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn rate_limit_delay_overrides_short_backoff() {
        let config = SchedulerConfig::default().with_backoff(
            Duration::from_secs(1),
            Duration::from_secs(10),
            2.0,
        );
        let scheduler = Scheduler::new(config);
        scheduler
            .state()
            .write()
            .await
            .record_failure(SyncFailure::new("429").with_retry_after(Duration::from_secs(120)));
        assert_eq!(scheduler.next_delay().await, Duration::from_secs(120));

        scheduler.state().write().await.record_failure(SyncFailure::new("500"));
        assert_eq!(scheduler.next_delay().await, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn sync_now_and_stop() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(3600)));
        let handle = scheduler.handle();
        let count = Arc::new(AtomicU32::new(0));

        let task = {
            let count = Arc::clone(&count);
            tokio::spawn(scheduler.run(move || {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }))
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(handle.state().await.last_sync.is_some());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_backoff() {
        let config = SchedulerConfig::new(Duration::from_secs(3600)).with_backoff(
            Duration::from_secs(10),
            Duration::from_secs(60),
            2.0,
        );
        let scheduler = Scheduler::new(config);
        let handle = scheduler.handle();
        let attempts = Arc::new(AtomicU32::new(0));

        let task = {
            let attempts = Arc::clone(&attempts);
            tokio::spawn(scheduler.run(move || {
                let attempts = Arc::clone(&attempts);
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(SyncFailure::new(format!("failure {}", n)))
                    } else {
                        Ok(())
                    }
                }
            }))
        };

        // Backoff of 10s then 20s; well under the hourly interval.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_sync.is_some());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }
}
