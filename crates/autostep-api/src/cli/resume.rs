//! `autostep resume-pending`: continue runs parked for a reboot.

use std::time::Duration;

use anyhow::{Context, Result};
use autostep_core::repository::RunStore;
use autostep_core::workflow::definition::load_workflow_file;
use autostep_core::workflow::manifest::Manifest;
use autostep_core::workflow::runner::RunOutcome;
use autostep_types::run::{RunRecord, RunStatus};
use console::style;
use serde::Serialize;

use crate::state::AppState;

/// Per-invocation tally.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeSummary {
    pub completed: Vec<String>,
    pub suspended: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Runs waiting for a reboot, least recently updated first.
pub fn pending_runs<'a>(runs: impl IntoIterator<Item = &'a RunRecord>) -> Vec<&'a RunRecord> {
    let mut pending: Vec<&RunRecord> = runs
        .into_iter()
        .filter(|r| r.status == RunStatus::PendingReboot && r.pending_reboot_next.is_some())
        .collect();
    pending.sort_by(|a, b| {
        a.updated_at
            .cmp(&b.updated_at)
            .then_with(|| a.run_id.cmp(&b.run_id))
    });
    pending
}

/// Resume every pending run once.
///
/// A run whose workflow cannot be loaded is skipped and stays parked; a
/// run that fails is logged. Neither stops the remaining runs.
pub async fn resume_pending(state: &AppState) -> Result<ResumeSummary> {
    let runs = state.store.export().await?;
    let pending = pending_runs(runs.values());
    let mut summary = ResumeSummary::default();
    if pending.is_empty() {
        tracing::info!("no runs pending reboot");
        return Ok(summary);
    }

    let manifest = Manifest::load(&state.paths.manifest)
        .with_context(|| format!("load manifest {}", state.paths.manifest.display()))?;
    let runner = state.runner();

    for record in pending {
        let run_id = record.run_id.as_str();
        if state.cancel.is_cancelled() {
            tracing::warn!(run_id, "shutdown requested; leaving run parked");
            summary.skipped.push(run_id.to_string());
            continue;
        }

        let Some(entry) = manifest.find(&record.workflow_name) else {
            tracing::warn!(run_id, workflow = %record.workflow_name, "workflow not in manifest; skipping run");
            summary.skipped.push(run_id.to_string());
            continue;
        };
        let path = entry.resolve_path(&state.paths.workflows_dir);
        let workflow = match load_workflow_file(&path) {
            Ok(wf) => wf,
            Err(e) => {
                tracing::error!(run_id, path = %path.display(), error = %e, "failed to load workflow; skipping run");
                summary.skipped.push(run_id.to_string());
                continue;
            }
        };

        if let Some(secs) = record.resume_delay_seconds.filter(|s| *s > 0) {
            tracing::info!(run_id, secs, "waiting before resume");
            let cancelled = tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => false,
                _ = state.cancel.cancelled() => true,
            };
            if cancelled {
                summary.skipped.push(run_id.to_string());
                continue;
            }
        }

        tracing::info!(
            run_id,
            workflow = %record.workflow_name,
            start = record.pending_reboot_next,
            "resuming run"
        );
        match runner.resume(run_id, &workflow).await {
            Ok(RunOutcome::Completed) => summary.completed.push(run_id.to_string()),
            Ok(RunOutcome::Suspended { .. }) => summary.suspended.push(run_id.to_string()),
            Err(e) => {
                tracing::error!(run_id, error = %e, "resume failed");
                summary.failed.push(run_id.to_string());
            }
        }
    }

    Ok(summary)
}

/// Command entry point: resume and report.
pub async fn resume_pending_cmd(state: &AppState, json: bool) -> Result<()> {
    let summary = resume_pending(state).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "  {} resumed: {} completed, {} suspended again, {} failed, {} skipped",
        style("↻").bold(),
        style(summary.completed.len()).green(),
        style(summary.suspended.len()).yellow(),
        style(summary.failed.len()).red(),
        style(summary.skipped.len()).dim()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autostep_infra::paths::AutostepPaths;
    use autostep_infra::state::JsonRunStore;
    use autostep_types::config::AutostepConfig;
    use autostep_types::run::{BootMode, StepStatus};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn record(run_id: &str, status: RunStatus, next: Option<usize>, secs: i64) -> RunRecord {
        let mut r = RunRecord::new(run_id, "patch", 2, Utc.timestamp_opt(secs, 0).unwrap());
        r.status = status;
        r.pending_reboot_next = next;
        r
    }

    #[test]
    fn test_pending_runs_oldest_first() {
        let runs = [
            record("b", RunStatus::PendingReboot, Some(1), 20),
            record("a", RunStatus::PendingReboot, Some(1), 20),
            record("old", RunStatus::PendingReboot, Some(1), 10),
            record("done", RunStatus::Completed, None, 5),
            record("broken", RunStatus::PendingReboot, None, 1),
        ];
        let ids: Vec<&str> = pending_runs(runs.iter())
            .into_iter()
            .map(|r| r.run_id.as_str())
            .collect();
        assert_eq!(ids, vec!["old", "a", "b"]);
    }

    /// Data root with one manifest entry `patch` (boot, then sleep).
    async fn fixture(dir: &TempDir) -> AppState {
        let paths = AutostepPaths::from_root(dir.path());
        paths.ensure().unwrap();
        std::fs::write(
            &paths.manifest,
            json!({"workflows": [
                {"name": "patch", "path": "patch.json"},
                {"name": "broken", "path": "broken.json"}
            ]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            paths.workflows_dir.join("patch.json"),
            json!({"name": "patch", "steps": [
                {"id": "boot", "action": "reboot"},
                {"id": "settle", "action": "sleep", "sleep_seconds": 0}
            ]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(paths.workflows_dir.join("broken.json"), "{").unwrap();

        AppState::init(paths, AutostepConfig::default()).await.unwrap()
    }

    async fn park(store: &JsonRunStore, run_id: &str, workflow: &str) {
        store.start_run(run_id, workflow, 2).await.unwrap();
        store.mark_step_pending(run_id, 0, "boot").await.unwrap();
        store
            .mark_pending_reboot(run_id, 1, BootMode::Normal, None)
            .await
            .unwrap();
        store.mark_step_complete(run_id, 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_resume_completes_parked_runs() {
        let dir = TempDir::new().unwrap();
        let state = fixture(&dir).await;
        park(&state.store, "r1", "patch").await;

        let summary = resume_pending(&state).await.unwrap();
        assert_eq!(summary.completed, vec!["r1".to_string()]);

        // Persisted through the file store.
        let reopened = JsonRunStore::open(&state.paths.state_file).await.unwrap();
        let r = reopened.get("r1").await.unwrap().unwrap();
        assert_eq!(r.status, RunStatus::Completed);
        assert_eq!(r.steps[1].status, Some(StepStatus::Completed));
    }

    #[tokio::test]
    async fn test_unloadable_workflows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let state = fixture(&dir).await;
        park(&state.store, "gone", "not-in-manifest").await;
        park(&state.store, "bad", "broken").await;
        park(&state.store, "good", "patch").await;

        let summary = resume_pending(&state).await.unwrap();
        assert_eq!(summary.completed, vec!["good".to_string()]);
        assert_eq!(summary.skipped.len(), 2);

        let r = state.store.get("gone").await.unwrap().unwrap();
        assert_eq!(r.status, RunStatus::PendingReboot);
    }

    #[tokio::test]
    async fn test_nothing_pending_needs_no_manifest() {
        let dir = TempDir::new().unwrap();
        let paths = AutostepPaths::from_root(dir.path());
        let state = AppState::init(paths, AutostepConfig::default()).await.unwrap();
        assert_eq!(resume_pending(&state).await.unwrap(), ResumeSummary::default());
    }
}
