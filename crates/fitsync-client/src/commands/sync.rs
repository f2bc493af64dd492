//! One-shot sync.

use fitsync_engine::{SyncReport, SyncSource};

use crate::error::ClientResult;
use crate::session::Session;

/// Populate the cache for the trailing `days` days and print a summary.
///
/// Resources that failed are listed on stderr; the command still succeeds
/// as long as the profile was fetched.
pub async fn run(session: &Session, days: u32, force: bool) -> ClientResult<()> {
    let syncer = session.syncer()?;
    let report = syncer.populate(days, force).await?;

    println!("{}", summary(&report));
    for failure in &report.failures {
        eprintln!("  {}: {}", failure.kind, failure.error);
    }
    Ok(())
}

/// One-line description of a sync report.
pub fn summary(report: &SyncReport) -> String {
    let captured = report.captured_at.format("%Y-%m-%d %H:%M UTC");
    match report.source {
        SyncSource::Cache => format!(
            "Using cached data from {} ({} days).",
            captured, report.days
        ),
        SyncSource::Upstream if report.failures.is_empty() => {
            format!("Synced {} days from Fitbit at {}.", report.days, captured)
        }
        SyncSource::Upstream => format!(
            "Synced {} days from Fitbit at {}; {} resource(s) failed:",
            report.days,
            captured,
            report.failures.len()
        ),
    }
}
