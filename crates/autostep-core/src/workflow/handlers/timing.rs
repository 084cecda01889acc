use std::time::Duration;

use autostep_types::workflow::StepDefinition;
use serde::Deserialize;

use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct SleepParams {
    #[serde(default)]
    sleep_seconds: i64,
}

/// Handles `sleep`. The wait ignores the run's cancellation token.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepHandler;

impl ActionHandler for SleepHandler {
    fn kinds(&self) -> &'static [ActionKind] {
        &[ActionKind::Sleep]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        _ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        let p: SleepParams = step_params(kind, step)?;
        let secs = u64::try_from(p.sleep_seconds)
            .map_err(|_| StepError::Validation("sleep_seconds must be >= 0".to_string()))?;

        tracing::debug!(secs, "sleeping");
        tokio::time::sleep(Duration::from_secs(secs)).await;
        Ok(StepOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::MemoryRunStore;
    use serde_json::json;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    async fn exec(value: serde_json::Value) -> Result<StepOutcome, StepError> {
        let step: StepDefinition = serde_json::from_value(value).unwrap();
        let store = MemoryRunStore::new();
        let ctx = ActionContext {
            run_id: "r",
            step_index: 0,
            store: &store,
            cancel: CancellationToken::new(),
            artifacts_dir: Path::new("."),
            working_dir: Path::new("."),
            default_command_timeout: None,
        };
        SleepHandler.execute(ActionKind::Sleep, &step, &ctx).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_waits_requested_duration() {
        let started = tokio::time::Instant::now();
        exec(json!({"id": "s", "action": "sleep", "sleep_seconds": 30}))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_negative_sleep_is_validation_error() {
        let err = exec(json!({"id": "s", "action": "sleep", "sleep_seconds": -1}))
            .await
            .unwrap_err();
        assert_eq!(err, StepError::Validation("sleep_seconds must be >= 0".into()));
    }
}
