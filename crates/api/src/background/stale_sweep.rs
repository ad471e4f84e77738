//! Periodic archival of concluded solicitations.
//!
//! Once a solicitation has been concluded for longer than the retention
//! window its files are deleted and it is marked archived. The work itself
//! lives in [`SolicitationService::archive_stale`]; this module only drives
//! it on a fixed `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use printdesk_core::service::SolicitationService;
use tokio_util::sync::CancellationToken;

/// Run the stale sweep loop until `cancel` is triggered.
///
/// The first tick fires immediately so anything that went stale while the
/// server was down is handled at startup.
pub async fn run(service: Arc<SolicitationService>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Stale sweep job started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stale sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                match service.archive_stale().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Stale sweep: removed files of concluded solicitations");
                    }
                    Ok(_) => {
                        tracing::debug!("Stale sweep: nothing to archive");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Stale sweep: run failed");
                    }
                }
            }
        }
    }
}
