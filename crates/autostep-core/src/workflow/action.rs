//! Action model: the closed set of action kinds, the step outcome, and the
//! handler trait every action implementation provides.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use autostep_types::run::BootMode;
use autostep_types::workflow::StepDefinition;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::repository::RunStoreDyn;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

macro_rules! action_kinds {
    ($($variant:ident => $tag:literal),+ $(,)?) => {
        /// Every action a workflow step may name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ActionKind {
            $($variant),+
        }

        impl ActionKind {
            pub const ALL: &'static [ActionKind] = &[$(ActionKind::$variant),+];

            /// The tag used in workflow files.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(ActionKind::$variant => $tag),+
                }
            }
        }

        impl FromStr for ActionKind {
            type Err = StepError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($tag => Ok(ActionKind::$variant),)+
                    _ => Err(StepError::Validation(format!("unknown action {s:?}"))),
                }
            }
        }
    };
}

action_kinds! {
    FileCopy => "file_copy",
    FileRename => "file_rename",
    FileDelete => "file_delete",
    FileExists => "file_exists",
    RegistrySet => "registry_set",
    RegistryDelete => "registry_delete",
    RegistrySave => "registry_save",
    RegistryRestore => "registry_restore",
    RegistryLoad => "registry_load",
    RegistryUnload => "registry_unload",
    RegistryAppend => "registry_append",
    RegistryEquals => "registry_equals",
    ServiceStart => "service_start",
    ServiceStop => "service_stop",
    ServiceRunning => "service_running",
    DriverLoad => "driver_load",
    DriverUnload => "driver_unload",
    DriverLoaded => "driver_loaded",
    Reboot => "reboot",
    Verify => "verify",
    Run => "run",
    Sleep => "sleep",
    Safeboot => "safeboot",
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Non-error result of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Side effect applied (and verified, where the action verifies).
    Completed,
    /// The handler recorded the resume point and asked the host to restart.
    /// The run must stop here; it continues from `next_step` after boot.
    RebootRequested { next_step: usize, boot_mode: BootMode },
}

/// Step failure. The message is surfaced unmodified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    /// Parameters missing or malformed; nothing was attempted.
    #[error("{0}")]
    Validation(String),

    /// The side effect or its post-condition check failed.
    #[error("{0}")]
    Execution(String),
}

impl StepError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StepError::Validation(_))
    }
}

/// Deserialize a step's parameters, mapping failures to a validation error.
pub fn step_params<T: DeserializeOwned>(
    kind: ActionKind,
    step: &StepDefinition,
) -> Result<T, StepError> {
    step.parse_params()
        .map_err(|e| StepError::Validation(format!("{kind}: invalid parameters: {e}")))
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// What a handler knows about the run it executes in.
pub struct ActionContext<'a> {
    pub run_id: &'a str,
    pub step_index: usize,
    pub store: &'a dyn RunStoreDyn,
    /// Cancelled when the process is shutting down. Only `run` honors it.
    pub cancel: CancellationToken,
    /// Target of `cache://` paths.
    pub artifacts_dir: &'a Path,
    /// Base for relative paths in parameters.
    pub working_dir: &'a Path,
    pub default_command_timeout: Option<Duration>,
}

impl ActionContext<'_> {
    /// Resolve a parameter path: `cache://x` lands in the artifacts
    /// directory, relative paths in the working directory.
    pub fn resolve_path(&self, raw: &str) -> PathBuf {
        if let Some(rest) = raw.strip_prefix("cache://") {
            return self.artifacts_dir.join(rest);
        }
        let path = Path::new(raw);
        if path.is_absolute() || looks_like_drive_path(raw) {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

fn looks_like_drive_path(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// An implementation of one or more action kinds.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ActionHandler: Send + Sync {
    /// Kinds this handler serves.
    fn kinds(&self) -> &'static [ActionKind];

    fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> impl Future<Output = Result<StepOutcome, StepError>> + Send + 'a;
}

/// Object-safe version of [`ActionHandler`] with boxed futures.
pub trait ActionHandlerDyn: Send + Sync {
    fn kinds(&self) -> &'static [ActionKind];

    fn execute_boxed<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutcome, StepError>> + Send + 'a>>;
}

impl<T: ActionHandler> ActionHandlerDyn for T {
    fn kinds(&self) -> &'static [ActionKind] {
        ActionHandler::kinds(self)
    }

    fn execute_boxed<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<StepOutcome, StepError>> + Send + 'a>> {
        Box::pin(self.execute(kind, step, ctx))
    }
}

/// Type-erased, cheaply cloneable action handler.
#[derive(Clone)]
pub struct BoxActionHandler {
    inner: Arc<dyn ActionHandlerDyn>,
}

impl BoxActionHandler {
    pub fn new<T: ActionHandler + 'static>(handler: T) -> Self {
        Self {
            inner: Arc::new(handler),
        }
    }

    pub fn kinds(&self) -> &'static [ActionKind] {
        self.inner.kinds()
    }

    pub async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        self.inner.execute_boxed(kind, step, ctx).await
    }
}

impl fmt::Debug for BoxActionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxActionHandler")
            .field("kinds", &self.kinds())
            .finish()
    }
}
