//! The sync pipeline: cache, authenticate, fetch, persist, publish.

use chrono::{DateTime, Utc};
use fitsync_core::Snapshot;
use fitsync_fitbit::Authenticator;
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::coordinator::{FetchCoordinator, FetchFailure};
use crate::error::EngineResult;
use crate::repository::SnapshotRepository;

/// Knobs of the sync pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Minimum number of days fetched on every upstream refill.
    pub max_days: u32,
    /// Age after which the cached snapshot is refetched.
    pub max_age_hours: u64,
}

impl SyncSettings {
    pub const DEFAULT_MAX_DAYS: u32 = 28;
    pub const DEFAULT_MAX_AGE_HOURS: u64 = 2;
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_days: Self::DEFAULT_MAX_DAYS,
            max_age_hours: Self::DEFAULT_MAX_AGE_HOURS,
        }
    }
}

/// Where the published snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncSource {
    Cache,
    Upstream,
}

/// Summary of one [`Syncer::populate`] call.
#[derive(Debug)]
pub struct SyncReport {
    pub source: SyncSource,
    pub captured_at: DateTime<Utc>,
    /// Days published.
    pub days: u32,
    /// Resources that failed this cycle; always empty for cache hits.
    pub failures: Vec<FetchFailure>,
}

/// Fills the [`SnapshotRepository`] from the cache or from upstream.
#[derive(Debug, Clone)]
pub struct Syncer {
    authenticator: Authenticator,
    coordinator: FetchCoordinator,
    cache: SnapshotCache,
    repository: SnapshotRepository,
    settings: SyncSettings,
}

impl Syncer {
    pub fn new(
        authenticator: Authenticator,
        coordinator: FetchCoordinator,
        cache: SnapshotCache,
        repository: SnapshotRepository,
        settings: SyncSettings,
    ) -> Self {
        Self {
            authenticator,
            coordinator,
            cache,
            repository,
            settings,
        }
    }

    pub fn repository(&self) -> &SnapshotRepository {
        &self.repository
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Publishes the trailing `requested_days` days.
    ///
    /// A cached snapshot is used when it is fresh and covers the request,
    /// unless `force` is set. Otherwise a token is obtained (refreshing or
    /// authorizing as needed) and `max(requested_days, max_days)` days are
    /// fetched, cached, and published.
    ///
    /// # Errors
    ///
    /// Authorization failures and a failed profile fetch. Individual
    /// resource failures are reported in [`SyncReport::failures`].
    pub async fn populate(&self, requested_days: u32, force: bool) -> EngineResult<SyncReport> {
        if !force && let Some(snapshot) = self.usable_cache(requested_days, Utc::now()) {
            info!(captured_at = %snapshot.captured_at, "using cached data");
            return Ok(self.publish(snapshot, requested_days, SyncSource::Cache, Vec::new()).await);
        }

        let token = self.authenticator.access_token().await?;
        let days = requested_days.max(self.settings.max_days);
        let outcome = self.coordinator.run(&token, days).await?;
        let mut snapshot = outcome.snapshot;

        if !outcome.failures.is_empty() {
            warn!(
                failed = outcome.failures.len(),
                "sync finished with missing resources"
            );
            self.carry_forward(&mut snapshot, &outcome.failures);
        }
        if let Err(e) = self.cache.save(&snapshot) {
            warn!(error = %e, "failed to write cache");
        }

        Ok(self
            .publish(snapshot, requested_days, SyncSource::Upstream, outcome.failures)
            .await)
    }

    /// Fills resources that failed this cycle from the previously cached
    /// snapshot, so one failed request does not discard the last good series.
    fn carry_forward(&self, snapshot: &mut Snapshot, failures: &[FetchFailure]) {
        let previous = match self.cache.load() {
            Ok(previous) => previous,
            Err(e) => {
                debug!(error = %e, "nothing to carry forward");
                return;
            }
        };
        for failure in failures {
            if let Some(series) = previous.get(failure.kind) {
                info!(kind = %failure.kind, captured_at = %previous.captured_at, "keeping cached series");
                snapshot.insert(failure.kind, series.clone());
            }
        }
    }

    fn usable_cache(&self, requested_days: u32, now: DateTime<Utc>) -> Option<Snapshot> {
        let snapshot = match self.cache.load() {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_cache_miss() => {
                debug!(error = %e, "no usable cache");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "failed to read cache");
                return None;
            }
        };

        if !SnapshotCache::is_valid(&snapshot, self.settings.max_age_hours, now) {
            debug!(captured_at = %snapshot.captured_at, "cache is stale");
            return None;
        }
        if !snapshot.covers(requested_days) {
            debug!(
                cached_days = snapshot.max_days,
                requested_days, "cache does not cover the requested window"
            );
            return None;
        }
        Some(snapshot)
    }

    async fn publish(
        &self,
        snapshot: Snapshot,
        days: u32,
        source: SyncSource,
        failures: Vec<FetchFailure>,
    ) -> SyncReport {
        let captured_at = snapshot.captured_at;
        self.repository.publish(snapshot.windowed(days)).await;
        SyncReport {
            source,
            captured_at,
            days,
            failures,
        }
    }
}
