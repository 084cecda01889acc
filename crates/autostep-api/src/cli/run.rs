//! `autostep run <workflow>`.

use anyhow::{Context, Result};
use autostep_core::workflow::runner::RunOutcome;
use console::style;
use uuid::Uuid;

use crate::state::AppState;

/// Run a workflow once under a fresh run id.
///
/// A reboot request is not an error: the run is parked and the command
/// exits successfully so the restart can proceed.
pub async fn run_workflow(state: &AppState, name: &str, json: bool) -> Result<()> {
    let workflow = state.load_workflow(name)?;
    let run_id = format!("{}-{}", workflow.name, Uuid::now_v7());

    let outcome = state
        .runner()
        .run_workflow(&run_id, &workflow)
        .await
        .with_context(|| format!("run {run_id} of workflow {name} failed"))?;

    match outcome {
        RunOutcome::Completed => {
            tracing::info!(run_id, workflow = name, "workflow completed");
            if json {
                println!(
                    "{}",
                    serde_json::json!({"run_id": run_id, "workflow": workflow.name, "status": "completed"})
                );
            } else {
                println!(
                    "  {} Workflow '{}' completed (run {})",
                    style("✓").green().bold(),
                    style(&workflow.name).bold(),
                    style(&run_id).dim()
                );
            }
        }
        RunOutcome::Suspended {
            next_step,
            boot_mode,
        } => {
            tracing::warn!(
                run_id,
                workflow = name,
                next_step,
                "workflow requested reboot; it resumes on next boot"
            );
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "run_id": run_id,
                        "workflow": workflow.name,
                        "status": "pending_reboot",
                        "next_step": next_step,
                        "boot_mode": boot_mode,
                    })
                );
            } else {
                println!(
                    "  {} Workflow '{}' requested a {} reboot (run {}); it resumes at step {} on next boot",
                    style("↻").yellow().bold(),
                    style(&workflow.name).bold(),
                    boot_mode,
                    style(&run_id).dim(),
                    next_step
                );
            }
        }
    }

    Ok(())
}
