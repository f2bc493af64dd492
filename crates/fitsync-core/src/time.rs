//! Date helpers for day-based series.
//!
//! [`DateWindow`] describes the inclusive date range requested from the
//! upstream API, and [`day_label`] turns upstream date strings into the short
//! labels used on chart axes.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used in upstream URLs.
const PARAM_FORMAT: &str = "%Y-%m-%d";

/// Label format for parsed dates, e.g. `Sun 09-01`.
const LABEL_FORMAT: &str = "%a %m-%d";

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window.
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window from explicit bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The window ending on `today` and starting `days` days earlier.
    pub fn trailing(days: u32, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Start date formatted for a URL (`YYYY-MM-DD`).
    pub fn start_param(&self) -> String {
        self.start.format(PARAM_FORMAT).to_string()
    }

    /// End date formatted for a URL (`YYYY-MM-DD`).
    pub fn end_param(&self) -> String {
        self.end.format(PARAM_FORMAT).to_string()
    }

    /// Number of days covered, both ends included.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Normalizes an upstream date label.
///
/// Full `YYYY-MM-DD` dates become `Www MM-DD`; anything else (including
/// year-less `MM-DD` labels, whose weekday is unknown) is returned verbatim.
pub fn day_label(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw, PARAM_FORMAT) {
        Ok(date) => date.format(LABEL_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn trailing_window() {
        let window = DateWindow::trailing(5, date(2024, 9, 10));
        assert_eq!(window.start, date(2024, 9, 5));
        assert_eq!(window.end, date(2024, 9, 10));
        assert_eq!(window.start_param(), "2024-09-05");
        assert_eq!(window.end_param(), "2024-09-10");
        assert_eq!(window.num_days(), 6);
    }

    #[test]
    fn trailing_window_crosses_year() {
        let window = DateWindow::trailing(3, date(2025, 1, 2));
        assert_eq!(window.start_param(), "2024-12-30");
    }

    #[test]
    fn labels_full_dates_with_weekday() {
        assert_eq!(day_label("2024-09-01"), "Sun 09-01");
        assert_eq!(day_label("2024-09-03"), "Tue 09-03");
    }

    #[test]
    fn keeps_unparseable_labels_verbatim() {
        assert_eq!(day_label("09-01"), "09-01");
        assert_eq!(day_label("yesterday"), "yesterday");
        assert_eq!(day_label(""), "");
    }
}
