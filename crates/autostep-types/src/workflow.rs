//! Workflow definition types.
//!
//! A workflow is an ordered list of steps. Each step carries an action tag
//! and a bag of action-specific parameters that stay untyped here; the
//! handler for the action deserializes them into its own parameter struct.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A workflow loaded from a YAML or JSON definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

fn default_version() -> u32 {
    1
}

impl WorkflowDefinition {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Everything else on the step, keyed by parameter name.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl StepDefinition {
    /// Deserialize the step's parameters into a typed struct.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.params.clone()))
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}
