//! External command execution.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use autostep_types::workflow::StepDefinition;
use serde::Deserialize;
use tokio::process::Command;

use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct EnvVar {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct RunParams {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    working_dir: Option<String>,
    #[serde(default)]
    env: Vec<EnvVar>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

enum Finish {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

/// Handles `run`: spawns the command with inherited stdio and waits for it.
///
/// The wait is abandoned (and the child killed) when the run's
/// cancellation token fires or the timeout elapses.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessHandler;

impl ActionHandler for ProcessHandler {
    fn kinds(&self) -> &'static [ActionKind] {
        &[ActionKind::Run]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        let p: RunParams = step_params(kind, step)?;
        if p.command.is_empty() {
            return Err(StepError::Validation("run requires command".to_string()));
        }

        let mut cmd = Command::new(&p.command);
        cmd.args(&p.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = p.working_dir.as_deref().filter(|d| !d.is_empty()) {
            cmd.current_dir(ctx.resolve_path(dir));
        }
        for var in &p.env {
            cmd.env(&var.key, &var.value);
        }

        let timeout = p
            .timeout_seconds
            .map(Duration::from_secs)
            .or(ctx.default_command_timeout);

        tracing::info!(command = %p.command, args = ?p.args, "running command");
        let mut child = cmd
            .spawn()
            .map_err(|e| StepError::Execution(format!("start {}: {e}", p.command)))?;

        let deadline = async {
            match timeout {
                Some(d) => {
                    tokio::time::sleep(d).await;
                    d
                }
                None => std::future::pending().await,
            }
        };

        let finish = tokio::select! {
            status = child.wait() => Finish::Exited(status),
            _ = ctx.cancel.cancelled() => Finish::Cancelled,
            d = deadline => Finish::TimedOut(d),
        };

        let status = match finish {
            Finish::Exited(status) => status
                .map_err(|e| StepError::Execution(format!("wait {}: {e}", p.command)))?,
            Finish::Cancelled => {
                let _ = child.kill().await;
                return Err(StepError::Execution(format!("{}: cancelled", p.command)));
            }
            Finish::TimedOut(d) => {
                let _ = child.kill().await;
                return Err(StepError::Execution(format!(
                    "{}: timed out after {}s",
                    p.command,
                    d.as_secs_f64()
                )));
            }
        };

        if !status.success() {
            return Err(StepError::Execution(format!("{}: {status}", p.command)));
        }
        Ok(StepOutcome::Completed)
    }
}
