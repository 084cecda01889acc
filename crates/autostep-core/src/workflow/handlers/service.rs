//! Service and kernel driver actions.

use std::sync::Arc;

use autostep_types::workflow::StepDefinition;
use serde::Deserialize;
use serde_json::Value;

use super::expected_flag;
use crate::host::HostPlatform;
use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};

#[derive(Debug, Default, Deserialize)]
struct ServiceParams {
    #[serde(default)]
    service: String,
    #[serde(default)]
    driver_name: String,
    #[serde(default)]
    driver_path: String,
    #[serde(default)]
    expected: Option<Value>,
}

/// Handles `service_*` and `driver_*` actions.
pub struct ServiceHandler<H> {
    host: Arc<H>,
}

impl<H> ServiceHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }
}

fn missing(message: &str) -> StepError {
    StepError::Validation(message.to_string())
}

impl<H: HostPlatform + 'static> ActionHandler for ServiceHandler<H> {
    fn kinds(&self) -> &'static [ActionKind] {
        &[
            ActionKind::ServiceStart,
            ActionKind::ServiceStop,
            ActionKind::ServiceRunning,
            ActionKind::DriverLoad,
            ActionKind::DriverUnload,
            ActionKind::DriverLoaded,
        ]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        let p: ServiceParams = step_params(kind, step)?;
        let host = self.host.as_ref();

        match kind {
            ActionKind::ServiceStart => {
                if p.service.is_empty() {
                    return Err(missing("service_start requires service"));
                }
                host.service_start(&p.service).await?;
            }
            ActionKind::ServiceStop => {
                if p.service.is_empty() {
                    return Err(missing("service_stop requires service"));
                }
                host.service_stop(&p.service).await?;
            }
            ActionKind::ServiceRunning => {
                if p.service.is_empty() {
                    return Err(missing("service_running requires service"));
                }
                let expect = expected_flag(p.expected.as_ref())?;
                let running = host.service_running(&p.service).await?;
                if expect && !running {
                    return Err(StepError::Execution(format!(
                        "service {} is not running",
                        p.service
                    )));
                }
                if !expect && running {
                    return Err(StepError::Execution(format!(
                        "service {} is running but expected false",
                        p.service
                    )));
                }
            }
            ActionKind::DriverLoad => {
                if p.driver_name.is_empty() || p.driver_path.is_empty() {
                    return Err(missing("driver_load requires driver_name and driver_path"));
                }
                let image = ctx.resolve_path(&p.driver_path);
                host.driver_load(&p.driver_name, &image).await?;
            }
            ActionKind::DriverUnload => {
                if p.driver_name.is_empty() {
                    return Err(missing("driver_unload requires driver_name"));
                }
                host.driver_unload(&p.driver_name).await?;
            }
            ActionKind::DriverLoaded => {
                if p.driver_name.is_empty() {
                    return Err(missing("driver_loaded requires driver_name"));
                }
                let expect = expected_flag(p.expected.as_ref())?;
                let loaded = host.driver_loaded(&p.driver_name).await?;
                if expect && !loaded {
                    return Err(StepError::Execution(format!(
                        "driver {} is not loaded",
                        p.driver_name
                    )));
                }
                if !expect && loaded {
                    return Err(StepError::Execution(format!(
                        "driver {} is loaded but expected false",
                        p.driver_name
                    )));
                }
            }
            other => {
                return Err(StepError::Validation(format!(
                    "service handler cannot run {other}"
                )));
            }
        }
        Ok(StepOutcome::Completed)
    }
}
