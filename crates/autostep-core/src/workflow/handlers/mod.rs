//! Built-in action handlers.
//!
//! - `file` -- copy / rename / pattern delete / pattern exists
//! - `registry` -- registry values, hives and comparisons
//! - `service` -- services and kernel drivers
//! - `process` -- external commands
//! - `timing` -- fixed sleeps
//! - `boot` -- reboot (two-phase) and the Safe Mode boot flag
//! - `verify` -- batched assertions

pub mod boot;
pub mod file;
pub mod process;
pub mod registry;
pub mod service;
pub mod timing;
pub mod verify;

use std::sync::Arc;

use autostep_types::value::{ParamValue, loose_bool_json};
use serde_json::Value;

use crate::host::{HostError, HostPlatform};
use crate::workflow::action::StepError;
use crate::workflow::dispatch::ActionRegistry;

pub use boot::BootHandler;
pub use file::FileHandler;
pub use process::ProcessHandler;
pub use registry::RegistryHandler;
pub use service::ServiceHandler;
pub use timing::SleepHandler;
pub use verify::VerifyHandler;

/// A registry with a handler for every [`ActionKind`](crate::workflow::action::ActionKind).
pub fn builtin_registry<H: HostPlatform + 'static>(host: Arc<H>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry
        .register(FileHandler)
        .register(RegistryHandler::new(host.clone()))
        .register(ServiceHandler::new(host.clone()))
        .register(ProcessHandler)
        .register(SleepHandler)
        .register(BootHandler::new(host.clone()))
        .register(VerifyHandler::new(host));
    registry
}

impl From<HostError> for StepError {
    fn from(e: HostError) -> Self {
        StepError::Execution(e.to_string())
    }
}

/// Loose-boolean `expected` parameter; absent means true.
pub(crate) fn expected_flag(value: Option<&Value>) -> Result<bool, StepError> {
    loose_bool_json(value).map_err(StepError::Validation)
}

/// Optional scalar parameter; lists and maps are rejected.
pub(crate) fn scalar(value: Option<&Value>) -> Result<Option<ParamValue>, StepError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => ParamValue::try_from(v.clone())
            .map(Some)
            .map_err(StepError::Validation),
    }
}
