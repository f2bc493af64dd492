//! On-disk snapshot cache.
//!
//! The most recent snapshot is kept as pretty-printed JSON so it survives
//! restarts. Freshness is judged against the snapshot's own capture time.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fitsync_core::Snapshot;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

pub use fitsync_core::filter_to_window;

/// Default cache file name inside the data directory.
pub const CACHE_FILE_NAME: &str = "cache.json";

/// File-backed cache for one [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at `<data_dir>/cache.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the snapshot atomically.
    pub fn save(&self, snapshot: &Snapshot) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        fitsync_core::fs::write_atomic(&self.path, json.as_bytes(), None)?;
        info!(
            path = %self.path.display(),
            series = snapshot.series.len(),
            "cached snapshot"
        );
        Ok(())
    }

    /// Reads the cached snapshot.
    ///
    /// Fails with [`EngineError::CacheNotFound`] if there is no file and
    /// [`EngineError::CacheCorrupt`] if it does not decode.
    pub fn load(&self) -> EngineResult<Snapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EngineError::CacheNotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| EngineError::cache_corrupt(&self.path, e))?;
        debug!(captured_at = %snapshot.captured_at, "loaded cached snapshot");
        Ok(snapshot)
    }

    /// True iff the snapshot is at most `max_age_hours` old at `now`.
    pub fn is_valid(snapshot: &Snapshot, max_age_hours: u64, now: DateTime<Utc>) -> bool {
        snapshot.is_fresh(max_age_hours, now)
    }

    /// Deletes the cache file. Returns true if one existed.
    pub fn clear(&self) -> EngineResult<bool> {
        Ok(fitsync_core::fs::remove_if_exists(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fitsync_core::{CountSeries, HeartRateEntry, HeartRateSeries, ProfileRecord, ResourceKind, SeriesData};
    use std::collections::BTreeMap;

    fn snapshot() -> Snapshot {
        let profile = ProfileRecord {
            full_name: "Jane Doe".to_string(),
            age: 34,
            height: 170.5,
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2024, 9, 10, 8, 0, 0).unwrap();
        let mut snapshot = Snapshot::captured_at(profile, 28, at);
        snapshot.insert(
            ResourceKind::Steps,
            SeriesData::Count(CountSeries::single(
                "Steps Over Time",
                "Daily steps count",
                "Steps",
                vec![("Sun 09-01".to_string(), 1000), ("Mon 09-02".to_string(), 0)],
            )),
        );
        snapshot.insert(
            ResourceKind::HeartRate,
            SeriesData::HeartRate(HeartRateSeries::single(
                "Heart Rate Over Time",
                "",
                "Heart Rate",
                vec![(
                    "Sun 09-01".to_string(),
                    HeartRateEntry {
                        resting_rate: 58,
                        zones: BTreeMap::from([("Cardio".to_string(), 12)]),
                    },
                )],
            )),
        );
        snapshot
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::in_dir(dir.path());
        let original = snapshot();

        cache.save(&original).unwrap();
        assert_eq!(cache.load().unwrap(), original);

        let text = std::fs::read_to_string(cache.path()).unwrap();
        assert!(text.contains("\n  \"captured_at\""));
    }

    #[test]
    fn missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::in_dir(dir.path());
        assert!(matches!(cache.load(), Err(EngineError::CacheNotFound { .. })));

        std::fs::write(cache.path(), "{\"captured_at\": 12").unwrap();
        assert!(matches!(cache.load(), Err(EngineError::CacheCorrupt { .. })));
    }

    #[test]
    fn validity_is_inclusive_at_the_boundary() {
        let snapshot = snapshot();
        let exactly = snapshot.captured_at + Duration::hours(2);
        assert!(SnapshotCache::is_valid(&snapshot, 2, exactly));
        assert!(!SnapshotCache::is_valid(
            &snapshot,
            2,
            exactly + Duration::seconds(1)
        ));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::in_dir(dir.path());
        cache.save(&snapshot()).unwrap();
        assert!(cache.clear().unwrap());
        assert!(!cache.clear().unwrap());
    }

    #[test]
    fn filter_is_reexported() {
        let steps = snapshot().steps().cloned().unwrap();
        assert_eq!(filter_to_window(&steps, 1).labels, vec!["Mon 09-02"]);
    }
}
