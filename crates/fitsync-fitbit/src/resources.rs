//! Upstream response shapes and their transforms into day series.
//!
//! Each payload type deserializes one endpoint's body and converts it into
//! the common series form. Parsing is lenient per entry: a value that is not
//! an integer becomes 0 rather than failing the whole series.

use std::collections::BTreeMap;

use fitsync_core::{CountSeries, HeartRateEntry, HeartRateSeries, ProfileRecord, ResourceKind, day_label};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FitbitError, FitbitResult};

/// Body of `GET /1/user/-/profile.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEnvelope {
    pub user: ProfileRecord,
}

/// One `{dateTime, value}` point of an activity time series.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPoint {
    pub date_time: String,
    #[serde(default)]
    pub value: Value,
}

impl ActivityPoint {
    /// The value as an integer; anything non-integer becomes 0.
    pub fn count(&self) -> i64 {
        match &self.value {
            Value::Number(n) => n.as_i64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// Body of an activity time-series endpoint.
///
/// Upstream wraps the points in a single `activities-<name>` key. A bare
/// array is accepted as well.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPayload {
    pub points: Vec<ActivityPoint>,
}

impl ActivityPayload {
    /// Extracts the points for `kind` from a decoded body.
    pub fn from_value(kind: ResourceKind, value: Value) -> FitbitResult<Self> {
        let array = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => {
                let key = format!("activities-{}", kind.api_name());
                match map.remove(&key) {
                    Some(Value::Array(items)) => items,
                    _ => map
                        .into_iter()
                        .find_map(|(_, v)| match v {
                            Value::Array(items) => Some(items),
                            _ => None,
                        })
                        .ok_or_else(|| {
                            FitbitError::parse(format!("no time series array in {} response", kind))
                        })?,
                }
            }
            other => {
                return Err(FitbitError::parse(format!(
                    "expected an object for {}, got {}",
                    kind,
                    json_type(&other)
                )));
            }
        };

        let points = array
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ActivityPoint>, _>>()
            .map_err(|e| FitbitError::parse(format!("invalid {} entry: {}", kind, e)))?;
        Ok(Self { points })
    }

    /// Converts to a single-sub-series [`CountSeries`] labelled for `kind`.
    pub fn into_series(self, kind: ResourceKind) -> CountSeries {
        CountSeries::single(
            kind.title(),
            kind.subtitle(),
            kind.series_name(),
            self.points
                .into_iter()
                .map(|p| (day_label(&p.date_time), p.count())),
        )
    }
}

/// Body of the heart-rate time-series endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeartRatePayload {
    #[serde(rename = "activities-heart", default)]
    pub days: Vec<HeartRateDay>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateDay {
    pub date_time: String,
    #[serde(default)]
    pub value: HeartRateValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateValue {
    #[serde(default)]
    pub resting_heart_rate: Option<i64>,
    #[serde(default)]
    pub heart_rate_zones: Vec<HeartRateZone>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateZone {
    pub name: String,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub min: i64,
    #[serde(default)]
    pub max: i64,
    #[serde(default)]
    pub calories_out: f64,
}

impl HeartRatePayload {
    /// Converts to a [`HeartRateSeries`]; a day without a resting rate gets 0.
    pub fn into_series(self) -> HeartRateSeries {
        let kind = ResourceKind::HeartRate;
        HeartRateSeries::single(
            kind.title(),
            kind.subtitle(),
            kind.series_name(),
            self.days.into_iter().map(|day| {
                let zones: BTreeMap<String, i64> = day
                    .value
                    .heart_rate_zones
                    .into_iter()
                    .map(|z| (z.name, z.minutes))
                    .collect();
                let entry = HeartRateEntry {
                    resting_rate: day.value.resting_heart_rate.unwrap_or(0),
                    zones,
                };
                (day_label(&day.date_time), entry)
            }),
        )
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_numeric_values_become_zero() {
        let payload = ActivityPayload::from_value(
            ResourceKind::Steps,
            json!({"activities-steps": [
                {"dateTime": "09-01", "value": "1000"},
                {"dateTime": "09-02", "value": "abc"}
            ]}),
        )
        .unwrap();
        let series = payload.into_series(ResourceKind::Steps);

        assert_eq!(series.len(), 2);
        assert_eq!(series.values("Steps"), Some(&[1000, 0][..]));
        assert_eq!(series.labels, vec!["09-01", "09-02"]);
        assert_eq!(series.title, "Steps Over Time");
        assert_eq!(series.subtitle, "Daily steps count");
    }

    #[test]
    fn full_dates_get_weekday_labels() {
        let payload = ActivityPayload::from_value(
            ResourceKind::Calories,
            json!({"activities-calories": [
                {"dateTime": "2024-09-01", "value": "2100"},
                {"dateTime": "2024-09-02", "value": 2200},
                {"dateTime": "2024-09-03", "value": 12.5},
                {"dateTime": "2024-09-04"}
            ]}),
        )
        .unwrap();
        let series = payload.into_series(ResourceKind::Calories);
        assert_eq!(series.labels, vec!["Sun 09-01", "Mon 09-02", "Tue 09-03", "Wed 09-04"]);
        assert_eq!(series.values("Calories"), Some(&[2100, 2200, 0, 0][..]));
    }

    #[test]
    fn accepts_bare_array_and_unexpected_key() {
        let bare = ActivityPayload::from_value(
            ResourceKind::Elevation,
            json!([{"dateTime": "2024-09-01", "value": "3"}]),
        )
        .unwrap();
        assert_eq!(bare.points.len(), 1);

        let odd_key = ActivityPayload::from_value(
            ResourceKind::Elevation,
            json!({"activities-tracker-elevation": [{"dateTime": "2024-09-01", "value": "7"}]}),
        )
        .unwrap();
        assert_eq!(odd_key.points[0].count(), 7);
    }

    #[test]
    fn rejects_shapes_without_a_series() {
        let err = ActivityPayload::from_value(ResourceKind::Steps, json!({"errors": "nope"}))
            .unwrap_err();
        assert!(matches!(err, FitbitError::Parse(_)));

        let err = ActivityPayload::from_value(ResourceKind::Steps, json!("text")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to parse response: expected an object for steps, got a string"
        );

        let err = ActivityPayload::from_value(
            ResourceKind::Steps,
            json!({"activities-steps": [{"value": "1"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, FitbitError::Parse(_)));
    }

    #[test]
    fn heart_rate_zones_and_missing_resting_rate() {
        let payload: HeartRatePayload = serde_json::from_value(json!({
            "activities-heart": [
                {
                    "dateTime": "2024-09-01",
                    "value": {
                        "customHeartRateZones": [],
                        "heartRateZones": [
                            {"caloriesOut": 1500.5, "max": 97, "min": 30, "minutes": 1200, "name": "Out of Range"},
                            {"caloriesOut": 400.1, "max": 136, "min": 97, "minutes": 60, "name": "Fat Burn"},
                            {"max": 165, "min": 136, "minutes": 10, "name": "Cardio"},
                            {"max": 220, "min": 165, "name": "Peak"}
                        ],
                        "restingHeartRate": 58
                    }
                },
                {
                    "dateTime": "2024-09-02",
                    "value": {"heartRateZones": []}
                }
            ]
        }))
        .unwrap();

        let series = payload.into_series();
        assert_eq!(series.labels, vec!["Sun 09-01", "Mon 09-02"]);
        assert_eq!(series.title, "Heart Rate Over Time");

        let days = series.values("Heart Rate").unwrap();
        assert_eq!(days[0].resting_rate, 58);
        assert_eq!(days[0].zone_minutes("Fat Burn"), 60);
        assert_eq!(days[0].zone_minutes("Peak"), 0);
        assert_eq!(days[0].zones.len(), 4);
        assert_eq!(days[1].resting_rate, 0);
        assert!(days[1].zones.is_empty());
    }

    #[test]
    fn profile_envelope() {
        let envelope: ProfileEnvelope = serde_json::from_value(json!({
            "user": {
                "fullName": "Jane Doe",
                "displayName": "Jane",
                "age": 34,
                "averageDailySteps": 9120,
                "height": 170.2,
                "heightUnit": "METRIC",
                "timezone": "Europe/Paris",
                "topBadges": []
            }
        }))
        .unwrap();
        assert_eq!(envelope.user.full_name, "Jane Doe");
        assert_eq!(envelope.user.age, 34);
        assert_eq!(envelope.user.average_daily_steps, 9120);
        assert_eq!(envelope.user.weight, 0.0);
    }
}
