//! Registry actions.

use std::path::PathBuf;
use std::sync::Arc;

use autostep_types::value::ParamValue;
use autostep_types::workflow::StepDefinition;
use serde::Deserialize;
use serde_json::Value;

use super::scalar;
use crate::host::{HostPlatform, RegistryValue};
use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct RegistryParams {
    #[serde(default)]
    path: String,
    #[serde(default, rename = "type")]
    value_type: String,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    hive_file: String,
    #[serde(default)]
    expected: Option<Value>,
}

/// Handles every `registry_*` action through the host platform.
pub struct RegistryHandler<H> {
    host: Arc<H>,
}

impl<H> RegistryHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

fn require(ok: bool, message: &str) -> Result<(), StepError> {
    if ok {
        Ok(())
    } else {
        Err(StepError::Validation(message.to_string()))
    }
}

/// Build the typed value for `registry_set`.
fn registry_value(value_type: &str, value: Option<ParamValue>) -> Result<RegistryValue, StepError> {
    let value = value.ok_or_else(|| StepError::Validation("registry_set requires value".to_string()))?;
    match value_type.trim().to_ascii_lowercase().as_str() {
        "string" | "sz" => Ok(RegistryValue::String(value.to_display_string())),
        "dword" => value
            .as_u32()
            .map(RegistryValue::Dword)
            .map_err(StepError::Validation),
        other => Err(StepError::Validation(format!(
            "unsupported registry value type {other:?}"
        ))),
    }
}

pub(super) async fn registry_equals<H: HostPlatform>(
    host: &H,
    path: &str,
    expected: Option<&Value>,
) -> Result<(), StepError> {
    if path.is_empty() {
        return Err(StepError::Validation("registry_equals requires path".to_string()));
    }
    let expected = scalar(expected)?
        .map(|v| v.to_display_string())
        .unwrap_or_default();
    let got = host
        .registry_get(path)
        .await
        .map_err(|e| StepError::Execution(format!("registry read: {e}")))?
        .to_string();
    if expected != got {
        return Err(StepError::Execution(format!(
            "registry_equals mismatch: expected {expected} got {got}"
        )));
    }
    Ok(())
}

impl<H: HostPlatform + 'static> ActionHandler for RegistryHandler<H> {
    fn kinds(&self) -> &'static [ActionKind] {
        &[
            ActionKind::RegistrySet,
            ActionKind::RegistryDelete,
            ActionKind::RegistrySave,
            ActionKind::RegistryRestore,
            ActionKind::RegistryLoad,
            ActionKind::RegistryUnload,
            ActionKind::RegistryAppend,
            ActionKind::RegistryEquals,
        ]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        let p: RegistryParams = step_params(kind, step)?;
        let host = self.host.as_ref();
        let hive = || -> PathBuf { ctx.resolve_path(&p.hive_file) };

        match kind {
            ActionKind::RegistrySet => {
                require(
                    !p.path.is_empty() && !p.value_type.is_empty(),
                    "registry_set requires path and type",
                )?;
                let value = registry_value(&p.value_type, scalar(p.value.as_ref())?)?;
                host.registry_set(&p.path, &value).await?;
            }
            ActionKind::RegistryDelete => {
                require(!p.path.is_empty(), "registry_delete requires path")?;
                host.registry_delete(&p.path).await?;
            }
            ActionKind::RegistrySave => {
                require(
                    !p.path.is_empty() && !p.hive_file.is_empty(),
                    "registry_save requires path and hive_file",
                )?;
                host.registry_save(&p.path, &hive()).await?;
            }
            ActionKind::RegistryRestore => {
                require(
                    !p.path.is_empty() && !p.hive_file.is_empty(),
                    "registry_restore requires path and hive_file",
                )?;
                host.registry_restore(&p.path, &hive()).await?;
            }
            ActionKind::RegistryLoad => {
                require(
                    !p.path.is_empty() && !p.hive_file.is_empty(),
                    "registry_load requires path and hive_file",
                )?;
                host.registry_load(&p.path, &hive()).await?;
            }
            ActionKind::RegistryUnload => {
                require(!p.path.is_empty(), "registry_unload requires path")?;
                host.registry_unload(&p.path).await?;
            }
            ActionKind::RegistryAppend => {
                require(!p.path.is_empty(), "registry_append requires path")?;
                let suffix = scalar(p.value.as_ref())?
                    .map(|v| v.to_display_string())
                    .unwrap_or_default();
                let current = match host.registry_get(&p.path).await {
                    Ok(RegistryValue::String(s)) => s,
                    Ok(other) => {
                        return Err(StepError::Execution(format!(
                            "registry_append: {} holds a non-string value {other}",
                            p.path
                        )));
                    }
                    Err(e) => {
                        return Err(StepError::Execution(format!("read existing value: {e}")));
                    }
                };
                host.registry_set(&p.path, &RegistryValue::String(current + &suffix))
                    .await?;
            }
            ActionKind::RegistryEquals => {
                registry_equals(host, &p.path, p.expected.as_ref()).await?;
            }
            other => {
                return Err(StepError::Validation(format!(
                    "registry handler cannot run {other}"
                )));
            }
        }

        tracing::debug!(action = %kind, path = %p.path, "registry action applied");
        Ok(StepOutcome::Completed)
    }
}
