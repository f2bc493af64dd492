//! Foreground periodic sync.
//!
//! SIGINT/SIGTERM stop the loop; SIGHUP triggers an immediate sync.

use fitsync_engine::{Scheduler, SchedulerConfig, SchedulerHandle, SyncFailure, Syncer};
use tracing::{debug, info, warn};

use crate::error::ClientResult;
use crate::session::Session;

/// Sync every `config.sync_interval` until interrupted.
pub async fn run(session: &Session, days: u32, config: SchedulerConfig) -> ClientResult<()> {
    let syncer = session.syncer()?;
    let scheduler = Scheduler::new(config);
    let handle = scheduler.handle();

    println!("Watching Fitbit data ({} days). Press Ctrl+C to stop.", days);
    let task = tokio::spawn(scheduler.run(move || sync_once(syncer.clone(), days)));

    wait_for_signals(&handle).await?;
    if handle.stop().await.is_err() {
        debug!("scheduler already stopped");
    }
    if let Err(e) = task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }

    let state = handle.state().await;
    match state.last_sync {
        Some(at) => println!("Stopped. Last successful sync at {}.", at.format("%Y-%m-%d %H:%M UTC")),
        None => println!("Stopped. No successful sync."),
    }
    Ok(())
}

async fn sync_once(syncer: Syncer, days: u32) -> Result<(), SyncFailure> {
    let report = syncer.populate(days, false).await?;
    info!(
        source = ?report.source,
        captured_at = %report.captured_at,
        failed = report.failures.len(),
        "published snapshot"
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signals(handle: &SchedulerHandle) -> ClientResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, stopping");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("received SIGINT, stopping");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, syncing now");
                if handle.sync_now().await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_handle: &SchedulerHandle) -> ClientResult<()> {
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl+C, stopping");
    Ok(())
}
