//! Application state wiring the store, host and runner together.
//!
//! The runner is generic over the run store; AppState pins it to the JSON
//! file store and the host for the compilation target.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use autostep_core::workflow::handlers::builtin_registry;
use autostep_core::workflow::manifest::load_workflow_by_name;
use autostep_core::workflow::runner::WorkflowRunner;
use autostep_infra::host::{DefaultHost, default_host};
use autostep_infra::paths::AutostepPaths;
use autostep_infra::state::JsonRunStore;
use autostep_types::config::AutostepConfig;
use autostep_types::workflow::WorkflowDefinition;
use tokio_util::sync::CancellationToken;

pub type ConcreteRunner = WorkflowRunner<JsonRunStore>;

/// Shared application state used by every command.
#[derive(Clone)]
pub struct AppState {
    pub paths: AutostepPaths,
    pub config: AutostepConfig,
    pub store: Arc<JsonRunStore>,
    pub host: Arc<DefaultHost>,
    /// Cancelled on Ctrl+C / SIGTERM.
    pub cancel: CancellationToken,
}

impl AppState {
    /// Open the run store under `paths`.
    pub async fn init(paths: AutostepPaths, config: AutostepConfig) -> anyhow::Result<Self> {
        let store = JsonRunStore::open(&paths.state_file)
            .await
            .with_context(|| format!("open state {}", paths.state_file.display()))?;

        Ok(Self {
            paths,
            config,
            store: Arc::new(store),
            host: Arc::new(default_host()),
            cancel: CancellationToken::new(),
        })
    }

    /// A runner over the shared store with every built-in action registered.
    pub fn runner(&self) -> ConcreteRunner {
        let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        WorkflowRunner::new(self.store.clone(), builtin_registry(self.host.clone()))
            .with_artifacts_dir(&self.paths.artifacts_dir)
            .with_working_dir(working_dir)
            .with_default_command_timeout(
                self.config
                    .runner
                    .default_command_timeout_secs
                    .map(Duration::from_secs),
            )
            .with_cancellation(self.cancel.clone())
    }

    /// Look `name` up in the manifest and load its definition.
    pub fn load_workflow(&self, name: &str) -> anyhow::Result<WorkflowDefinition> {
        load_workflow_by_name(&self.paths.manifest, &self.paths.workflows_dir, name)
            .with_context(|| format!("load workflow {name}"))
    }
}
