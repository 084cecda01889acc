//! Step dispatcher: resolves a step's action tag to its registered handler.

use std::collections::HashMap;

use autostep_types::workflow::StepDefinition;

use super::action::{ActionContext, ActionHandler, ActionKind, BoxActionHandler, StepError, StepOutcome};

/// Registry of action handlers keyed by [`ActionKind`].
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, BoxActionHandler>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every kind it declares, replacing any
    /// handler previously registered for those kinds.
    pub fn register<T: ActionHandler + 'static>(&mut self, handler: T) -> &mut Self {
        let handler = BoxActionHandler::new(handler);
        for kind in handler.kinds() {
            self.handlers.insert(*kind, handler.clone());
        }
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<&BoxActionHandler> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Kinds with a registered handler, sorted.
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Resolve the step's action tag and run its handler.
    pub async fn dispatch(
        &self,
        step: &StepDefinition,
        ctx: &ActionContext<'_>,
    ) -> Result<StepOutcome, StepError> {
        let kind: ActionKind = step.action.parse()?;
        let handler = self
            .get(kind)
            .ok_or_else(|| StepError::Validation(format!("unknown action {:?}", step.action)))?;

        tracing::debug!(step_id = %step.id, action = %kind, "dispatching step");
        handler.execute(kind, step, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::memory::MemoryRunStore;
    use serde_json::json;
    use std::path::Path;
    use tokio_util::sync::CancellationToken;

    struct Noop;

    impl ActionHandler for Noop {
        fn kinds(&self) -> &'static [ActionKind] {
            &[ActionKind::Sleep, ActionKind::Verify]
        }

        async fn execute<'a>(
            &'a self,
            kind: ActionKind,
            _step: &'a StepDefinition,
            _ctx: &'a ActionContext<'a>,
        ) -> Result<StepOutcome, StepError> {
            if kind == ActionKind::Verify {
                return Err(StepError::Execution("verify ran".into()));
            }
            Ok(StepOutcome::Completed)
        }
    }

    fn step(action: &str) -> StepDefinition {
        serde_json::from_value(json!({"id": "s", "action": action})).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_kind() {
        let mut registry = ActionRegistry::new();
        registry.register(Noop);
        assert_eq!(registry.kinds(), vec![ActionKind::Verify, ActionKind::Sleep]);

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

        assert_eq!(registry.dispatch(&step("Sleep"), &ctx).await, Ok(StepOutcome::Completed));
        assert_eq!(
            registry.dispatch(&step("verify"), &ctx).await,
            Err(StepError::Execution("verify ran".into()))
        );
    }

    #[tokio::test]
    async fn test_unknown_and_unregistered_actions_are_validation_errors() {
        let mut registry = ActionRegistry::new();
        registry.register(Noop);

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

        let err = registry.dispatch(&step("teleport"), &ctx).await.unwrap_err();
        assert_eq!(err, StepError::Validation("unknown action \"teleport\"".into()));

        let err = registry.dispatch(&step("reboot"), &ctx).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("unknown action"));
    }
}
