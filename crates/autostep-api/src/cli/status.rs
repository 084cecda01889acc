//! `autostep status`.

use anyhow::Result;
use autostep_core::repository::RunStore;
use autostep_types::run::{RunRecord, RunStatus};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// Show every stored run.
pub async fn show_status(state: &AppState, json: bool) -> Result<()> {
    let runs = state.store.export().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!();
        println!(
            "  {} No runs recorded. Start one with: {}",
            style("i").blue().bold(),
            style("autostep run <workflow>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Run").fg(Color::Cyan),
        Cell::new("Workflow").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
        Cell::new("Steps").fg(Color::Cyan),
        Cell::new("Updated").fg(Color::Cyan),
        Cell::new("Detail").fg(Color::Cyan),
    ]);

    let mut records: Vec<&RunRecord> = runs.values().collect();
    records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    for r in records {
        table.add_row(vec![
            Cell::new(&r.run_id),
            Cell::new(&r.workflow_name),
            Cell::new(r.status).fg(status_color(r.status)),
            Cell::new(format!("{}/{}", r.completed_steps(), r.total_steps)),
            Cell::new(
                r.updated_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S"),
            ),
            Cell::new(detail(r)),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn status_color(status: RunStatus) -> Color {
    match status {
        RunStatus::Completed => Color::Green,
        RunStatus::Failed => Color::Red,
        RunStatus::PendingReboot => Color::Yellow,
        RunStatus::Running | RunStatus::Pending => Color::Blue,
    }
}

fn detail(r: &RunRecord) -> String {
    match (r.status, r.pending_reboot_next, &r.last_error) {
        (RunStatus::PendingReboot, Some(next), _) => {
            let mode = r.pending_boot_mode.unwrap_or_default();
            format!("resumes at step {next} ({mode} boot)")
        }
        (RunStatus::Failed, _, Some(err)) => err.clone(),
        _ => String::new(),
    }
}
