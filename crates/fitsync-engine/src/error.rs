//! Engine error types.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use fitsync_fitbit::FitbitError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while syncing or caching snapshots.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No cache file on disk.
    #[error("no cached snapshot at {}", path.display())]
    CacheNotFound { path: PathBuf },

    /// Cache file exists but cannot be decoded.
    #[error("cached snapshot {} is unreadable: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Authorization or upstream failure.
    #[error(transparent)]
    Fitbit(#[from] FitbitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn cache_corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CacheCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Server-requested delay, when the failure was a rate limit.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Fitbit(e) => e.retry_after(),
            _ => None,
        }
    }

    /// Returns true for cache misses, which callers treat as "fetch upstream".
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::CacheNotFound { .. } | Self::CacheCorrupt { .. })
    }
}
