//! Sync engine: fan-out fetch, snapshot cache, repository, scheduler.
//!
//! This crate turns a bearer token into a published [`fitsync_core::Snapshot`]:
//! - [`FetchCoordinator`] fetches the profile, then every resource concurrently
//! - [`SnapshotCache`] persists the latest snapshot as JSON with an age limit
//! - [`SnapshotRepository`] holds the snapshot served to readers
//! - [`Syncer`] ties them together behind [`Syncer::populate`]
//! - [`Scheduler`] repeats the sync with jitter and rate-limit aware backoff
//!
//! # Example
//!
//! ```rust,no_run
//! use fitsync_engine::{FetchCoordinator, SnapshotCache};
//! use fitsync_fitbit::ResourceClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ResourceClient::new(reqwest::Client::new(), "https://api.fitbit.com");
//!     let outcome = FetchCoordinator::new(client).run("access-token", 7).await?;
//!     SnapshotCache::new("cache.json").save(&outcome.snapshot)?;
//!     Ok(())
//! }
//! ```

mod cache;
mod coordinator;
mod error;
mod pipeline;
mod repository;
mod scheduler;

pub use cache::{CACHE_FILE_NAME, SnapshotCache, filter_to_window};
pub use coordinator::{FetchCoordinator, FetchFailure, FetchOutcome};
pub use error::{EngineError, EngineResult};
pub use pipeline::{SyncReport, SyncSettings, SyncSource, Syncer};
pub use repository::SnapshotRepository;
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState, SyncFailure,
};
