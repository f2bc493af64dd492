//! Concurrent fetch of one snapshot.
//!
//! The profile is fetched first; its failure aborts the cycle. Then one task
//! per resource kind runs concurrently. Each task writes its series into the
//! shared snapshot under a single mutex, or records its error. A failing
//! resource never cancels its siblings.

use std::sync::Arc;

use chrono::Local;
use fitsync_core::{DateWindow, ResourceKind, Snapshot};
use fitsync_fitbit::{FitbitError, FitbitResult, ResourceClient};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// A resource that could not be fetched in a cycle.
#[derive(Debug)]
pub struct FetchFailure {
    pub kind: ResourceKind,
    pub error: FitbitError,
}

/// Result of one fetch cycle.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Profile plus every series that succeeded.
    pub snapshot: Snapshot,
    /// One entry per failed resource; empty on full success.
    pub failures: Vec<FetchFailure>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the profile fetch and the per-resource fan-out.
#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    client: ResourceClient,
    kinds: Vec<ResourceKind>,
}

impl FetchCoordinator {
    /// Coordinator for every tracked resource kind.
    pub fn new(client: ResourceClient) -> Self {
        Self::with_kinds(client, ResourceKind::ALL.to_vec())
    }

    pub fn with_kinds(client: ResourceClient, kinds: Vec<ResourceKind>) -> Self {
        Self { client, kinds }
    }

    /// Fetches the trailing `days` days ending today (local time).
    pub async fn run(&self, token: &str, days: u32) -> FitbitResult<FetchOutcome> {
        let window = DateWindow::trailing(days, Local::now().date_naive());
        self.run_for_window(token, window, days).await
    }

    /// Fetches `window`, recording `max_days` on the snapshot.
    ///
    /// # Errors
    ///
    /// Only a profile failure is returned as an error. Resource failures are
    /// collected in [`FetchOutcome::failures`].
    pub async fn run_for_window(
        &self,
        token: &str,
        window: DateWindow,
        max_days: u32,
    ) -> FitbitResult<FetchOutcome> {
        let profile = self.client.fetch_profile(token).await.inspect_err(|e| {
            error!(error = %e, "profile fetch failed, aborting cycle");
        })?;
        debug!(user = profile.name(), "fetched profile");

        let snapshot = Arc::new(Mutex::new(Snapshot::new(profile, max_days)));
        let failures = Arc::new(Mutex::new(Vec::new()));
        let token: Arc<str> = Arc::from(token);

        let mut tasks = JoinSet::new();
        for &kind in &self.kinds {
            let client = self.client.clone();
            let token = Arc::clone(&token);
            let snapshot = Arc::clone(&snapshot);
            let failures = Arc::clone(&failures);

            tasks.spawn(async move {
                match client.fetch_series(kind, &window, &token).await {
                    Ok(data) => {
                        debug!(resource = %kind, days = data.len(), "fetched series");
                        snapshot.lock().await.insert(kind, data);
                    }
                    Err(error) => {
                        warn!(resource = %kind, error = %error, "resource fetch failed");
                        failures.lock().await.push(FetchFailure { kind, error });
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "fetch task did not complete");
            }
        }

        let snapshot = match Arc::try_unwrap(snapshot) {
            Ok(lock) => lock.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        let mut failures = std::mem::take(&mut *failures.lock().await);

        // A task that panicked left neither a series nor a failure.
        for &kind in &self.kinds {
            let accounted = snapshot.get(kind).is_some() || failures.iter().any(|f| f.kind == kind);
            if !accounted {
                failures.push(FetchFailure {
                    kind,
                    error: FitbitError::network(format!("{} fetch task aborted", kind)),
                });
            }
        }
        failures.sort_by_key(|f| f.kind);

        info!(
            fetched = snapshot.series.len(),
            failed = failures.len(),
            "fetch cycle finished"
        );
        Ok(FetchOutcome { snapshot, failures })
    }
}
