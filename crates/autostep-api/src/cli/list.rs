//! `autostep list`.

use anyhow::{Context, Result};
use autostep_core::workflow::manifest::Manifest;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::state::AppState;

/// List the workflows declared in the manifest.
pub fn list_workflows(state: &AppState, json: bool) -> Result<()> {
    let manifest = Manifest::load(&state.paths.manifest)
        .with_context(|| format!("load manifest {}", state.paths.manifest.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest.workflows)?);
        return Ok(());
    }

    if manifest.workflows.is_empty() {
        println!();
        println!(
            "  {} No workflows in {}",
            style("i").blue().bold(),
            style(state.paths.manifest.display()).yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Version").fg(Color::Cyan),
        Cell::new("Path").fg(Color::Cyan),
        Cell::new("Artifacts").fg(Color::Cyan),
    ]);

    for wf in &manifest.workflows {
        table.add_row(vec![
            Cell::new(&wf.name),
            Cell::new(wf.version.as_deref().unwrap_or("-")),
            Cell::new(wf.resolve_path(&state.paths.workflows_dir).display()),
            Cell::new(wf.artifacts.join(", ")),
        ]);
    }

    println!("{table}");
    Ok(())
}
