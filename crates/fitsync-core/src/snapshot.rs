//! The aggregate unit of caching: one profile plus one series per resource.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::ResourceKind;
use crate::series::{CountSeries, HeartRateSeries, SeriesData};

/// The user's profile attributes.
///
/// Field names follow the upstream JSON so the same type serves as the wire
/// shape and the cached form. Every field is optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    pub age: i64,
    pub average_daily_steps: i64,
    pub date_of_birth: String,
    pub display_name: String,
    pub first_name: String,
    pub full_name: String,
    pub last_name: String,
    pub gender: String,
    pub height: f64,
    pub height_unit: String,
    pub timezone: String,
    pub weight: f64,
    pub weight_unit: String,
}

impl ProfileRecord {
    /// The best available human-readable name.
    pub fn name(&self) -> &str {
        [&self.full_name, &self.display_name, &self.first_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("unknown user")
    }
}

/// One profile plus the fetched series, stamped with capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the data was fetched upstream.
    pub captured_at: DateTime<Utc>,
    /// Day window the series were fetched for.
    pub max_days: u32,
    /// Profile fetched in the same cycle.
    pub profile: ProfileRecord,
    /// One entry per successfully fetched resource kind.
    #[serde(default)]
    pub series: BTreeMap<ResourceKind, SeriesData>,
}

impl Snapshot {
    /// Creates a snapshot captured now with no series yet.
    pub fn new(profile: ProfileRecord, max_days: u32) -> Self {
        Self::captured_at(profile, max_days, Utc::now())
    }

    /// Creates a snapshot with an explicit capture time.
    pub fn captured_at(profile: ProfileRecord, max_days: u32, at: DateTime<Utc>) -> Self {
        Self {
            captured_at: at,
            max_days,
            profile,
            series: BTreeMap::new(),
        }
    }

    /// Stores the series for `kind`, replacing any previous one.
    pub fn insert(&mut self, kind: ResourceKind, data: SeriesData) {
        self.series.insert(kind, data);
    }

    /// Series for `kind`, if it was fetched.
    pub fn get(&self, kind: ResourceKind) -> Option<&SeriesData> {
        self.series.get(&kind)
    }

    pub fn steps(&self) -> Option<&CountSeries> {
        self.get(ResourceKind::Steps).and_then(SeriesData::as_count)
    }

    pub fn calories(&self) -> Option<&CountSeries> {
        self.get(ResourceKind::Calories).and_then(SeriesData::as_count)
    }

    pub fn elevation(&self) -> Option<&CountSeries> {
        self.get(ResourceKind::Elevation).and_then(SeriesData::as_count)
    }

    pub fn heart_rate(&self) -> Option<&HeartRateSeries> {
        self.get(ResourceKind::HeartRate)
            .and_then(SeriesData::as_heart_rate)
    }

    /// Kinds with a stored series.
    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.series.keys().copied()
    }

    /// Age of the snapshot at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.captured_at
    }

    /// True iff `now - captured_at <= max_age_hours`. The boundary is inclusive.
    pub fn is_fresh(&self, max_age_hours: u64, now: DateTime<Utc>) -> bool {
        let max_age = i64::try_from(max_age_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        self.age(now) <= max_age
    }

    /// True if the snapshot was fetched for at least `days` days.
    pub fn covers(&self, days: u32) -> bool {
        self.max_days >= days
    }

    /// A copy with every series trimmed to its trailing `days` entries.
    pub fn windowed(&self, days: u32) -> Self {
        let days = days as usize;
        Self {
            captured_at: self.captured_at,
            max_days: self.max_days,
            profile: self.profile.clone(),
            series: self
                .series
                .iter()
                .map(|(kind, data)| (*kind, data.filter_to_window(days)))
                .collect(),
        }
    }
}
