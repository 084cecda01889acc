//! Batched assertions.

use std::sync::Arc;

use autostep_types::workflow::StepDefinition;
use serde::Deserialize;
use serde_json::Value;

use super::expected_flag;
use super::registry::registry_equals;
use crate::host::HostPlatform;
use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct Assertion {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    expected: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyParams {
    #[serde(default)]
    assertions: Vec<Assertion>,
}

/// Handles `verify`: every assertion must hold; the first failure wins.
pub struct VerifyHandler<H> {
    host: Arc<H>,
}

impl<H> VerifyHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

async fn file_exists(
    assertion: &Assertion,
    ctx: &ActionContext<'_>,
) -> Result<(), StepError> {
    if assertion.path.is_empty() {
        return Err(StepError::Validation("file_exists requires path".to_string()));
    }
    let expect = expected_flag(assertion.expected.as_ref())?;
    let path = ctx.resolve_path(&assertion.path);

    match (expect, tokio::fs::metadata(&path).await) {
        (true, Ok(_)) => Ok(()),
        (true, Err(e)) => Err(StepError::Execution(format!(
            "verify file_exists failed: {}: {e}",
            assertion.path
        ))),
        (false, Ok(_)) => Err(StepError::Execution(format!(
            "verify file_exists expected absence but found: {}",
            assertion.path
        ))),
        (false, Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        (false, Err(e)) => Err(StepError::Execution(format!(
            "verify file_exists unexpected error: {e}"
        ))),
    }
}

impl<H: HostPlatform + 'static> ActionHandler for VerifyHandler<H> {
    fn kinds(&self) -> &'static [ActionKind] {
        &[ActionKind::Verify]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        let p: VerifyParams = step_params(kind, step)?;

        for assertion in &p.assertions {
            match assertion.kind.trim().to_ascii_lowercase().as_str() {
                "file_exists" => file_exists(assertion, ctx).await?,
                "registry_equals" => {
                    registry_equals(self.host.as_ref(), &assertion.path, assertion.expected.as_ref())
                        .await?
                }
                _ => {
                    return Err(StepError::Validation(format!(
                        "unknown assertion kind {:?}",
                        assertion.kind
                    )));
                }
            }
        }

        tracing::debug!(step_id = %step.id, assertions = p.assertions.len(), "verify passed");
        Ok(StepOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RegistryValue;
    use crate::host::fake::FakeHost;
    use crate::state::memory::MemoryRunStore;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    async fn exec(host: &Arc<FakeHost>, dir: &TempDir, value: Value) -> Result<StepOutcome, StepError> {
        let step: StepDefinition = serde_json::from_value(value).unwrap();
        let store = MemoryRunStore::new();
        let ctx = ActionContext {
            run_id: "r",
            step_index: 0,
            store: &store,
            cancel: CancellationToken::new(),
            artifacts_dir: dir.path(),
            working_dir: dir.path(),
            default_command_timeout: None,
        };
        VerifyHandler::new(host.clone())
            .execute(ActionKind::Verify, &step, &ctx)
            .await
    }

    #[tokio::test]
    async fn test_all_assertions_pass() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("present.txt"), b"x").unwrap();
        let host = Arc::new(FakeHost::default());
        host.registry
            .lock()
            .unwrap()
            .insert(r"HKLM\SOFTWARE\V\Flag".into(), RegistryValue::String("on".into()));

        let result = exec(&host, &dir, json!({
            "id": "v", "action": "verify",
            "assertions": [
                {"kind": "file_exists", "path": "present.txt"},
                {"kind": "FILE_EXISTS", "path": "absent.txt", "expected": "false"},
                {"kind": "registry_equals", "path": r"HKLM\SOFTWARE\V\Flag", "expected": "on"},
            ],
        }))
        .await;
        assert_eq!(result, Ok(StepOutcome::Completed));
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("present.txt"), b"x").unwrap();
        let host = Arc::new(FakeHost::default());

        let err = exec(&host, &dir, json!({
            "id": "v", "action": "verify",
            "assertions": [
                {"kind": "file_exists", "path": "present.txt", "expected": false},
                {"kind": "bogus"},
            ],
        }))
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "verify file_exists expected absence but found: present.txt"
        );
    }

    #[tokio::test]
    async fn test_unknown_assertion_kind() {
        let dir = TempDir::new().unwrap();
        let host = Arc::new(FakeHost::default());
        let err = exec(&host, &dir, json!({
            "id": "v", "action": "verify",
            "assertions": [{"kind": "port_open", "path": "80"}],
        }))
        .await
        .unwrap_err();
        assert_eq!(err, StepError::Validation("unknown assertion kind \"port_open\"".into()));
    }
}
