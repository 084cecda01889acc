//! Sequential workflow runner with durable checkpoints and reboot handoff.
//!
//! Every step is checkpointed `pending` before its handler runs and
//! `completed` or `failed` after. A handler that returns
//! [`StepOutcome::RebootRequested`] has already parked the run in
//! `pending_reboot`; the runner marks that step complete and stops. After
//! the restart, an external caller continues the run from the recorded
//! index with [`WorkflowRunner::continue_workflow`] (or
//! [`WorkflowRunner::resume`], which reads the index from the store).
//!
//! There are no retries and no rollback. A failed run stays failed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use autostep_types::error::StoreError;
use autostep_types::run::{BootMode, RunStatus, StepStatus};
use autostep_types::workflow::WorkflowDefinition;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::repository::RunStore;

use super::action::{ActionContext, StepError, StepOutcome};
use super::dispatch::ActionRegistry;

// ---------------------------------------------------------------------------
// Result and error types
// ---------------------------------------------------------------------------

/// How a runner invocation ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step completed; the run is `completed`.
    Completed,
    /// A reboot was requested; the run is `pending_reboot`.
    Suspended { next_step: usize, boot_mode: BootMode },
}

/// Errors that abort a runner invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("start index {start} out of range for workflow {workflow} ({steps} steps)")]
    StartIndexOutOfRange {
        workflow: String,
        start: usize,
        steps: usize,
    },

    #[error("workflow {workflow} has {actual} steps but run {run_id} recorded {recorded}")]
    StepCountMismatch {
        run_id: String,
        workflow: String,
        recorded: usize,
        actual: usize,
    },

    #[error("step {step_id} failed: {source}")]
    StepFailed {
        step_id: String,
        #[source]
        source: StepError,
    },
}

// ---------------------------------------------------------------------------
// WorkflowRunner
// ---------------------------------------------------------------------------

/// Drives workflow steps against a run store and an action registry.
///
/// Generic over `S: RunStore` so it works with the JSON file store or the
/// in-memory store.
pub struct WorkflowRunner<S: RunStore> {
    store: Arc<S>,
    registry: ActionRegistry,
    artifacts_dir: PathBuf,
    working_dir: PathBuf,
    default_command_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<S: RunStore> WorkflowRunner<S> {
    pub fn new(store: Arc<S>, registry: ActionRegistry) -> Self {
        Self {
            store,
            registry,
            artifacts_dir: PathBuf::from("artifacts"),
            working_dir: PathBuf::from("."),
            default_command_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Directory that `cache://` paths resolve into.
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Base for relative paths in step parameters.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_default_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_command_timeout = timeout;
        self
    }

    /// Token handed to handlers; cancelling it aborts a running command.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Start a new run of `workflow` under `run_id` and execute it from step 0.
    pub async fn run_workflow(
        &self,
        run_id: &str,
        workflow: &WorkflowDefinition,
    ) -> Result<RunOutcome, RunnerError> {
        let active: Vec<String> = self
            .store
            .export()
            .await?
            .into_values()
            .filter(|r| r.workflow_name == workflow.name && !r.status.is_terminal())
            .map(|r| r.run_id)
            .collect();
        if !active.is_empty() {
            tracing::warn!(
                workflow = %workflow.name,
                active = ?active,
                "starting a run while other runs of this workflow are unfinished"
            );
        }

        self.store
            .start_run(run_id, &workflow.name, workflow.step_count())
            .await?;
        tracing::info!(run_id, workflow = %workflow.name, steps = workflow.step_count(), "run started");

        self.run_from_index(run_id, workflow, 0).await
    }

    /// Continue a `pending_reboot` run from `start_index`.
    pub async fn continue_workflow(
        &self,
        run_id: &str,
        workflow: &WorkflowDefinition,
        start_index: usize,
    ) -> Result<RunOutcome, RunnerError> {
        if start_index >= workflow.step_count() {
            return Err(RunnerError::StartIndexOutOfRange {
                workflow: workflow.name.clone(),
                start: start_index,
                steps: workflow.step_count(),
            });
        }
        self.reopen(run_id, workflow, start_index).await?;
        self.store.clear_pending_reboot(run_id).await?;

        tracing::info!(run_id, workflow = %workflow.name, start_index, "run resumed");
        self.run_from_index(run_id, workflow, start_index).await
    }

    /// Continue a `pending_reboot` run from the index recorded in the store.
    ///
    /// A run whose reboot was its final step is completed without
    /// executing anything.
    pub async fn resume(
        &self,
        run_id: &str,
        workflow: &WorkflowDefinition,
    ) -> Result<RunOutcome, RunnerError> {
        let record = self
            .store
            .get(run_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(run_id.to_string()))?;

        let next = match (record.status, record.pending_reboot_next) {
            (RunStatus::PendingReboot, Some(next)) => next,
            (status, _) => {
                return Err(StoreError::NotPendingReboot {
                    run_id: run_id.to_string(),
                    status: status.to_string(),
                }
                .into());
            }
        };

        if next == workflow.step_count() {
            self.reopen(run_id, workflow, next).await?;
            // Completion clears the reboot bookkeeping in the same transition.
            self.store.mark_run_completed(run_id).await?;
            tracing::info!(run_id, workflow = %workflow.name, "run completed after final reboot");
            return Ok(RunOutcome::Completed);
        }
        self.continue_workflow(run_id, workflow, next).await
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Check that a parked run can continue at `start_index`, then settle a
    /// reboot step left `pending` by a process that died before its
    /// completion checkpoint.
    ///
    /// Leaves the run `pending_reboot` with its resume point intact; callers
    /// clear it once nothing else can be rejected.
    async fn reopen(
        &self,
        run_id: &str,
        workflow: &WorkflowDefinition,
        start_index: usize,
    ) -> Result<(), RunnerError> {
        let record = self
            .store
            .get(run_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(run_id.to_string()))?;

        if record.status != RunStatus::PendingReboot {
            return Err(StoreError::NotPendingReboot {
                run_id: run_id.to_string(),
                status: record.status.to_string(),
            }
            .into());
        }

        if record.total_steps != workflow.step_count() {
            return Err(RunnerError::StepCountMismatch {
                run_id: run_id.to_string(),
                workflow: workflow.name.clone(),
                recorded: record.total_steps,
                actual: workflow.step_count(),
            });
        }

        if start_index < record.current_step_index {
            return Err(StoreError::IndexRegression {
                run_id: run_id.to_string(),
                index: start_index,
                current: record.current_step_index,
            }
            .into());
        }

        if let Some(prev) = start_index.checked_sub(1) {
            if record.steps.get(prev).and_then(|s| s.status) == Some(StepStatus::Pending) {
                tracing::warn!(run_id, index = prev, "settling interrupted reboot step");
                self.store.mark_step_complete(run_id, prev).await?;
            }
        }
        Ok(())
    }

    async fn run_from_index(
        &self,
        run_id: &str,
        workflow: &WorkflowDefinition,
        start_index: usize,
    ) -> Result<RunOutcome, RunnerError> {
        for (index, step) in workflow.steps.iter().enumerate().skip(start_index) {
            self.store.mark_step_pending(run_id, index, &step.id).await?;
            tracing::info!(run_id, step_id = %step.id, index, action = %step.action, "executing step");

            let ctx = ActionContext {
                run_id,
                step_index: index,
                store: self.store.as_ref(),
                cancel: self.cancel.clone(),
                artifacts_dir: &self.artifacts_dir,
                working_dir: &self.working_dir,
                default_command_timeout: self.default_command_timeout,
            };

            match self.registry.dispatch(step, &ctx).await {
                Ok(StepOutcome::Completed) => {
                    self.store.mark_step_complete(run_id, index).await?;
                    tracing::debug!(run_id, step_id = %step.id, "step completed");
                }
                Ok(StepOutcome::RebootRequested {
                    next_step,
                    boot_mode,
                }) => {
                    self.store.mark_step_complete(run_id, index).await?;
                    tracing::info!(
                        run_id,
                        step_id = %step.id,
                        next_step,
                        boot_mode = %boot_mode,
                        "run suspended for reboot"
                    );
                    return Ok(RunOutcome::Suspended {
                        next_step,
                        boot_mode,
                    });
                }
                Err(e) => {
                    tracing::error!(run_id, step_id = %step.id, index, error = %e, "step failed");
                    if let Err(store_err) =
                        self.store.mark_step_failed(run_id, index, &e.to_string()).await
                    {
                        tracing::error!(run_id, error = %store_err, "could not record step failure");
                    }
                    return Err(RunnerError::StepFailed {
                        step_id: step.id.clone(),
                        source: e,
                    });
                }
            }
        }

        self.store.mark_run_completed(run_id).await?;
        tracing::info!(run_id, workflow = %workflow.name, "run completed");
        Ok(RunOutcome::Completed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
