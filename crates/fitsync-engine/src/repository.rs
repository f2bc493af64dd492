//! Shared holder of the published snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fitsync_core::Snapshot;
use tokio::sync::RwLock;

/// The snapshot currently served to readers.
///
/// Cloning the repository shares the same slot. The sync pipeline publishes
/// under the write lock; any number of readers may hold it concurrently.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRepository {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SnapshotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published snapshot.
    pub async fn publish(&self, snapshot: Snapshot) {
        *self.inner.write().await = Some(snapshot);
    }

    /// A copy of the published snapshot, if any.
    pub async fn current(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }

    /// Applies `f` to the published snapshot without cloning it.
    pub async fn with_current<R>(&self, f: impl FnOnce(Option<&Snapshot>) -> R) -> R {
        let guard = self.inner.read().await;
        f(guard.as_ref())
    }

    pub async fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.with_current(|s| s.map(|s| s.captured_at)).await
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsync_core::ProfileRecord;

    #[tokio::test]
    async fn publish_and_read() {
        let repo = SnapshotRepository::new();
        assert!(repo.current().await.is_none());

        let snapshot = Snapshot::new(ProfileRecord::default(), 7);
        let reader = repo.clone();
        repo.publish(snapshot.clone()).await;

        assert_eq!(reader.current().await, Some(snapshot.clone()));
        assert_eq!(reader.captured_at().await, Some(snapshot.captured_at));
        assert_eq!(reader.with_current(|s| s.map(|s| s.max_days)).await, Some(7));

        repo.clear().await;
        assert!(reader.current().await.is_none());
    }
}
