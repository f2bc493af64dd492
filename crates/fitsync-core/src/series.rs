//! Day-indexed series as produced by a fetch and consumed by charts.
//!
//! A [`ResourceSeries`] holds one label per day plus one or more named
//! sub-series that are index-aligned with those labels. Scalar resources use
//! [`CountSeries`]; heart rate uses [`HeartRateSeries`] whose values are
//! structured [`HeartRateEntry`] records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resting heart rate and minutes spent per heart-rate zone for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateEntry {
    /// Resting heart rate in beats per minute (0 when unknown).
    pub resting_rate: i64,
    /// Minutes spent in each zone, keyed by zone name.
    pub zones: BTreeMap<String, i64>,
}

impl HeartRateEntry {
    /// Minutes spent in the named zone, or 0.
    pub fn zone_minutes(&self, zone: &str) -> i64 {
        self.zones.get(zone).copied().unwrap_or(0)
    }
}

/// A titled set of day labels with index-aligned named value sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSeries<V> {
    /// Chart title.
    pub title: String,
    /// Chart subtitle.
    #[serde(default)]
    pub subtitle: String,
    /// One label per day, oldest first.
    pub labels: Vec<String>,
    /// Named value sequences, each aligned by index with `labels`.
    pub series: BTreeMap<String, Vec<V>>,
}

/// Series of integer daily totals (steps, calories, elevation).
pub type CountSeries = ResourceSeries<i64>;

/// Series of daily heart-rate entries.
pub type HeartRateSeries = ResourceSeries<HeartRateEntry>;

impl<V> Default for ResourceSeries<V> {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            labels: Vec::new(),
            series: BTreeMap::new(),
        }
    }
}

impl<V> ResourceSeries<V> {
    /// Creates an empty series with the given chart labels.
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            labels: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    /// Builds a single-sub-series series from `(label, value)` pairs.
    pub fn single(
        title: impl Into<String>,
        subtitle: impl Into<String>,
        name: impl Into<String>,
        points: impl IntoIterator<Item = (String, V)>,
    ) -> Self {
        let (labels, values): (Vec<_>, Vec<_>) = points.into_iter().unzip();
        let mut series = BTreeMap::new();
        series.insert(name.into(), values);
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            labels,
            series,
        }
    }

    /// Number of days in the series.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the series holds no days.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Values of the named sub-series.
    pub fn values(&self, name: &str) -> Option<&[V]> {
        self.series.get(name).map(Vec::as_slice)
    }
}

impl<V: Clone> ResourceSeries<V> {
    /// See [`filter_to_window`].
    pub fn filter_to_window(&self, days: usize) -> Self {
        filter_to_window(self, days)
    }
}

/// Trims a series to its trailing `days` entries.
///
/// A series with at most `days` entries is returned unchanged. Otherwise the
/// labels and every named sub-series are cut independently to their last
/// `days` elements, so sub-series stay aligned with the labels by index.
pub fn filter_to_window<V: Clone>(data: &ResourceSeries<V>, days: usize) -> ResourceSeries<V> {
    if data.labels.len() <= days {
        return data.clone();
    }

    let start = data.labels.len() - days;
    let series = data
        .series
        .iter()
        .map(|(name, values)| {
            let from = values.len().saturating_sub(days);
            (name.clone(), values[from..].to_vec())
        })
        .collect();

    ResourceSeries {
        title: data.title.clone(),
        subtitle: data.subtitle.clone(),
        labels: data.labels[start..].to_vec(),
        series,
    }
}

/// The fetched series of one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SeriesData {
    /// Integer daily totals.
    Count(CountSeries),
    /// Structured heart-rate days.
    HeartRate(HeartRateSeries),
}

impl SeriesData {
    /// Number of days in the series.
    pub fn len(&self) -> usize {
        match self {
            Self::Count(s) => s.len(),
            Self::HeartRate(s) => s.len(),
        }
    }

    /// Returns true if the series holds no days.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chart title.
    pub fn title(&self) -> &str {
        match self {
            Self::Count(s) => &s.title,
            Self::HeartRate(s) => &s.title,
        }
    }

    /// Day labels, oldest first.
    pub fn labels(&self) -> &[String] {
        match self {
            Self::Count(s) => &s.labels,
            Self::HeartRate(s) => &s.labels,
        }
    }

    /// Returns the scalar series, if this is one.
    pub fn as_count(&self) -> Option<&CountSeries> {
        match self {
            Self::Count(s) => Some(s),
            Self::HeartRate(_) => None,
        }
    }

    /// Returns the heart-rate series, if this is one.
    pub fn as_heart_rate(&self) -> Option<&HeartRateSeries> {
        match self {
            Self::HeartRate(s) => Some(s),
            Self::Count(_) => None,
        }
    }

    /// Trims to the trailing `days` entries.
    pub fn filter_to_window(&self, days: usize) -> Self {
        match self {
            Self::Count(s) => Self::Count(s.filter_to_window(days)),
            Self::HeartRate(s) => Self::HeartRate(s.filter_to_window(days)),
        }
    }
}
