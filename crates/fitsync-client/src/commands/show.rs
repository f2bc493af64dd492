//! Printing the published snapshot.

use std::fmt::Write as _;

use chrono::Utc;
use fitsync_core::{CountSeries, HeartRateSeries, ResourceKind, SeriesData, Snapshot};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Sync (or reuse the cache) and print the trailing `days` days.
pub async fn run(session: &Session, days: u32, json: bool) -> ClientResult<()> {
    let syncer = session.syncer()?;
    let report = syncer.populate(days, false).await?;
    for failure in &report.failures {
        eprintln!("warning: {} unavailable: {}", failure.kind, failure.error);
    }

    let snapshot = syncer
        .repository()
        .current()
        .await
        .ok_or_else(|| ClientError::Output("no snapshot was published".to_string()))?;
    print(&snapshot, json)
}

/// Print the cached snapshot without contacting Fitbit.
pub fn offline(config: &ClientConfig, days: u32, json: bool) -> ClientResult<()> {
    let snapshot = config.cache().load()?;
    let max_age_hours = config.sync.max_age_hours;
    if !snapshot.is_fresh(max_age_hours, Utc::now()) {
        warn!(captured_at = %snapshot.captured_at, "cached snapshot is stale");
        eprintln!(
            "warning: cached data is older than {} hours; run `fitsync sync` to refresh",
            max_age_hours
        );
    }
    if !snapshot.covers(days) {
        eprintln!(
            "warning: cache holds {} days, fewer than the {} requested",
            snapshot.max_days, days
        );
    }
    print(&snapshot.windowed(days), json)
}

fn print(snapshot: &Snapshot, json: bool) -> ClientResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    } else {
        print!("{}", render_text(snapshot));
    }
    Ok(())
}

/// Plain-text rendering: the profile name, then one block per resource.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (captured {})",
        snapshot.profile.name(),
        snapshot.captured_at.format("%Y-%m-%d %H:%M UTC")
    );

    for kind in ResourceKind::ALL {
        out.push('\n');
        match snapshot.get(kind) {
            Some(SeriesData::Count(series)) => render_counts(&mut out, series),
            Some(SeriesData::HeartRate(series)) => render_heart_rate(&mut out, series),
            None => {
                let _ = writeln!(out, "{}: no data", kind.title());
            }
        }
    }
    out
}

fn render_counts(out: &mut String, series: &CountSeries) {
    let _ = writeln!(out, "{}", series.title);
    for (i, label) in series.labels.iter().enumerate() {
        let values: Vec<String> = series
            .series
            .values()
            .map(|values| values.get(i).map_or_else(|| "-".to_string(), i64::to_string))
            .collect();
        let _ = writeln!(out, "  {:<10} {:>8}", label, values.join(" "));
    }
}

fn render_heart_rate(out: &mut String, series: &HeartRateSeries) {
    let _ = writeln!(out, "{}", series.title);
    let entries = series.series.values().next();
    for (i, label) in series.labels.iter().enumerate() {
        let Some(entry) = entries.and_then(|e| e.get(i)) else {
            let _ = writeln!(out, "  {:<10} -", label);
            continue;
        };
        let mut line = format!("  {:<10} resting {}", label, entry.resting_rate);
        for (zone, minutes) in &entry.zones {
            let _ = write!(line, "  {} {}m", zone, minutes);
        }
        let _ = writeln!(out, "{}", line);
    }
}
