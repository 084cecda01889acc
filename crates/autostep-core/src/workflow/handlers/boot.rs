//! Reboot and Safe Mode boot-flag actions.
//!
//! `reboot` is two-phase: the resume point is written to the run store
//! first, then the restart is requested. The restart may take effect at
//! any moment after the request, so nothing may depend on code running
//! after it.

use std::sync::Arc;
use std::time::Duration;

use autostep_types::run::BootMode;
use autostep_types::workflow::StepDefinition;
use serde::Deserialize;

use crate::host::{HostPlatform, SafeBootMode};
use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct RebootParams {
    #[serde(default)]
    safe_mode: bool,
    #[serde(default)]
    resume_delay_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SafeBootParams {
    #[serde(default)]
    safe_boot_mode: String,
}

/// Handles `reboot` and `safeboot`.
pub struct BootHandler<H> {
    host: Arc<H>,
}

impl<H> BootHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

impl<H: HostPlatform + 'static> BootHandler<H> {
    async fn reboot(&self, p: RebootParams, ctx: &ActionContext<'_>) -> Result<StepOutcome, StepError> {
        let next_step = ctx.step_index + 1;
        let boot_mode = if p.safe_mode {
            BootMode::Safe
        } else {
            BootMode::Normal
        };

        ctx.store
            .mark_pending_reboot_boxed(
                ctx.run_id,
                next_step,
                boot_mode,
                p.resume_delay_seconds.map(Duration::from_secs),
            )
            .await
            .map_err(|e| StepError::Execution(format!("record pending reboot: {e}")))?;

        tracing::warn!(
            run_id = ctx.run_id,
            next_step,
            boot_mode = %boot_mode,
            "resume point recorded, requesting reboot"
        );

        self.host
            .request_reboot()
            .await
            .map_err(|e| StepError::Execution(format!("request reboot: {e}")))?;

        Ok(StepOutcome::RebootRequested {
            next_step,
            boot_mode,
        })
    }

    async fn safe_boot(&self, p: SafeBootParams) -> Result<StepOutcome, StepError> {
        let mode: SafeBootMode = p.safe_boot_mode.parse().map_err(StepError::Validation)?;
        self.host.set_safe_boot(mode).await?;
        tracing::info!(mode = %mode, "safe boot flag updated");
        Ok(StepOutcome::Completed)
    }
}

impl<H: HostPlatform + 'static> ActionHandler for BootHandler<H> {
    fn kinds(&self) -> &'static [ActionKind] {
        &[ActionKind::Reboot, ActionKind::Safeboot]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        match kind {
            ActionKind::Reboot => self.reboot(step_params(kind, step)?, ctx).await,
            ActionKind::Safeboot => self.safe_boot(step_params(kind, step)?).await,
            other => Err(StepError::Validation(format!(
                "boot handler cannot run {other}"
            ))),
        }
    }
}
