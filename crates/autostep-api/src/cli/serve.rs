//! `autostep serve`: resume pending runs once, then idle until shutdown.
//!
//! Service control manager integration is not provided; a service wrapper
//! starts this command at boot and stops it with a signal.

use anyhow::Result;
use console::style;

use super::resume::resume_pending;
use crate::state::AppState;

pub async fn serve(state: &AppState, quiet: bool) -> Result<()> {
    match resume_pending(state).await {
        Ok(summary) => tracing::info!(
            completed = summary.completed.len(),
            suspended = summary.suspended.len(),
            failed = summary.failed.len(),
            skipped = summary.skipped.len(),
            "startup resume finished"
        ),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "startup resume failed"),
    }

    if !quiet {
        println!(
            "  {} Autostep agent running. {}",
            style("⚡").bold(),
            style("Press Ctrl+C to stop").dim()
        );
    }

    state.cancel.cancelled().await;
    tracing::info!("service stopping");
    Ok(())
}
