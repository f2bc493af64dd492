//! The closed set of tracked resource types.
//!
//! Every per-kind detail (endpoint path, chart labels, series name) hangs off
//! [`ResourceKind`], so adding a resource type is one new variant plus one
//! arm in each table below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::DateWindow;

/// A resource type fetched on every sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Daily step count.
    Steps,
    /// Daily calories burned.
    Calories,
    /// Daily elevation gained.
    Elevation,
    /// Daily resting heart rate and minutes per heart-rate zone.
    HeartRate,
}

impl ResourceKind {
    /// All tracked kinds, in fetch order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Steps,
        ResourceKind::Calories,
        ResourceKind::Elevation,
        ResourceKind::HeartRate,
    ];

    /// Stable identifier used in cache files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::Calories => "calories",
            Self::Elevation => "elevation",
            Self::HeartRate => "heart_rate",
        }
    }

    /// Resource name as it appears in upstream activity URLs.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Steps => "steps",
            Self::Calories => "calories",
            Self::Elevation => "elevation",
            Self::HeartRate => "heart",
        }
    }

    /// Path of the time-series endpoint for this kind, relative to the API base.
    pub fn endpoint_path(&self, window: &DateWindow) -> String {
        format!(
            "/1/user/-/activities/{}/date/{}/{}.json",
            self.api_name(),
            window.start_param(),
            window.end_param()
        )
    }

    /// Chart title for the series.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Steps => "Steps Over Time",
            Self::Calories => "Calories Over Time",
            Self::Elevation => "Elevation Over Time",
            Self::HeartRate => "Heart Rate Over Time",
        }
    }

    /// Chart subtitle for the series.
    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::Steps => "Daily steps count",
            Self::Calories => "Daily calories count",
            Self::Elevation => "Daily elevation count",
            Self::HeartRate => "Daily resting rate and zone minutes",
        }
    }

    /// Name of the (single) sub-series this kind produces.
    pub fn series_name(&self) -> &'static str {
        match self {
            Self::Steps => "Steps",
            Self::Calories => "Calories",
            Self::Elevation => "Elevation",
            Self::HeartRate => "Heart Rate",
        }
    }

    /// Returns true if the kind carries structured heart-rate values.
    pub fn is_heart_rate(&self) -> bool {
        matches!(self, Self::HeartRate)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "steps" => Ok(Self::Steps),
            "calories" => Ok(Self::Calories),
            "elevation" => Ok(Self::Elevation),
            "heart_rate" | "heart-rate" | "heart" => Ok(Self::HeartRate),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}
