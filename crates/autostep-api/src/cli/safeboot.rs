//! `autostep configure-safeboot-service`.

use anyhow::{Context, Result};
use autostep_core::host::HostPlatform;
use console::style;

use crate::state::AppState;

/// Register the configured service name under the SafeBoot `Minimal` and
/// `Network` keys so it starts in both Safe Mode flavours.
pub async fn configure_safeboot_service(state: &AppState, json: bool) -> Result<()> {
    let name = &state.config.service.name;
    state
        .host
        .ensure_service_safe_boot(name)
        .await
        .with_context(|| format!("configure {name} for Safe Mode"))?;
    tracing::info!(service = %name, "configured service for Safe Mode and Safe Mode with Networking");

    if json {
        println!("{}", serde_json::json!({"service": name, "safe_boot": true}));
    } else {
        println!(
            "  {} Service '{}' will start in Safe Mode and Safe Mode with Networking",
            style("✓").green().bold(),
            style(name).bold()
        );
    }
    Ok(())
}
