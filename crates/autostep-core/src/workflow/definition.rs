//! Workflow definition parsing, validation, and loading.
//!
//! Definitions are YAML or JSON files; the format is picked by extension.
//! Validation is structural only (name, unique step ids, non-empty action
//! tags). Whether an action tag names a known action is decided at dispatch
//! time.

use std::collections::HashSet;
use std::path::Path;

use autostep_types::workflow::WorkflowDefinition;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML/JSON parse failure.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No manifest entry with this name.
    #[error("workflow {0} not found in manifest")]
    NotInManifest(String),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a YAML string into a validated `WorkflowDefinition`.
pub fn parse_workflow_yaml(yaml: &str) -> Result<WorkflowDefinition, WorkflowError> {
    let def: WorkflowDefinition =
        serde_yaml_ng::from_str(yaml).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_definition(&def)?;
    Ok(def)
}

/// Parse a JSON string into a validated `WorkflowDefinition`.
pub fn parse_workflow_json(json: &str) -> Result<WorkflowDefinition, WorkflowError> {
    let def: WorkflowDefinition =
        serde_json::from_str(json).map_err(|e| WorkflowError::ParseError(e.to_string()))?;
    validate_definition(&def)?;
    Ok(def)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `WorkflowDefinition`.
///
/// Checks:
/// - Name is non-empty
/// - At least one step exists
/// - Every step has a non-empty id and action tag
/// - All step IDs are unique
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.name.trim().is_empty() {
        return Err(WorkflowError::ValidationError(
            "workflow name must not be empty".to_string(),
        ));
    }

    if def.steps.is_empty() {
        return Err(WorkflowError::ValidationError(format!(
            "workflow '{}' must have at least one step",
            def.name
        )));
    }

    let mut seen_ids = HashSet::new();
    for (index, step) in def.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(WorkflowError::ValidationError(format!(
                "step {index} has an empty id"
            )));
        }
        if step.action.trim().is_empty() {
            return Err(WorkflowError::ValidationError(format!(
                "step '{}' has an empty action",
                step.id
            )));
        }
        if !seen_ids.insert(step.id.as_str()) {
            return Err(WorkflowError::ValidationError(format!(
                "duplicate step ID: '{}'",
                step.id
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load a workflow definition, choosing YAML for `.yaml`/`.yml` files and
/// JSON for everything else.
pub fn load_workflow_file(path: &Path) -> Result<WorkflowDefinition, WorkflowError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let result = if is_yaml {
        parse_workflow_yaml(&content)
    } else {
        parse_workflow_json(&content)
    };
    result.map_err(|e| match e {
        WorkflowError::ParseError(msg) => {
            WorkflowError::ParseError(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const PATCH_YAML: &str = r#"
version: 1
name: driver-patch
steps:
  - id: stage
    action: file_copy
    from: cache://acme.sys
    to: C:\Windows\System32\drivers\acme.sys
    verify_sha256: ABCDEF
  - id: enable
    action: registry_set
    path: HKLM\SYSTEM\CurrentControlSet\Services\acme\Start
    type: dword
    value: 3
  - id: boot
    action: reboot
    safe_mode: true
    resume_delay_seconds: 20
  - id: check
    action: verify
    assertions:
      - kind: file_exists
        path: C:\Windows\System32\drivers\acme.sys
"#;

    #[test]
    fn test_parse_yaml_keeps_step_params() {
        let def = parse_workflow_yaml(PATCH_YAML).unwrap();
        assert_eq!(def.name, "driver-patch");
        assert_eq!(def.step_count(), 4);

        let enable = &def.steps[1];
        assert_eq!(enable.action, "registry_set");
        assert_eq!(enable.param("value").and_then(Value::as_i64), Some(3));

        let boot = &def.steps[2];
        assert_eq!(boot.param("safe_mode"), Some(&Value::Bool(true)));

        let check = &def.steps[3];
        assert!(check.param("assertions").is_some_and(Value::is_array));
    }

    #[test]
    fn test_parse_json() {
        let def = parse_workflow_json(
            r#"{"name": "w", "steps": [{"id": "a", "action": "sleep", "sleep_seconds": 1}]}"#,
        )
        .unwrap();
        assert_eq!(def.version, 1);
        assert_eq!(def.steps[0].id, "a");
    }

    #[test]
    fn test_validation_rejects_duplicate_step_ids() {
        let err = parse_workflow_json(
            r#"{"name": "w", "steps": [{"id": "a", "action": "sleep"}, {"id": "a", "action": "run"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationError(_)));
        assert!(err.to_string().contains("duplicate step ID"));
    }

    #[test]
    fn test_validation_rejects_empty_workflow() {
        let err = parse_workflow_json(r#"{"name": "w", "steps": []}"#).unwrap_err();
        assert!(err.to_string().contains("at least one step"));
    }

    #[test]
    fn test_validation_rejects_empty_name_and_action() {
        let err = parse_workflow_json(r#"{"name": " ", "steps": [{"id": "a", "action": "sleep"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("name must not be empty"));

        let err = parse_workflow_json(r#"{"name": "w", "steps": [{"id": "a", "action": ""}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("empty action"));
    }

    #[test]
    fn test_unknown_action_passes_validation() {
        assert!(parse_workflow_json(r#"{"name": "w", "steps": [{"id": "a", "action": "teleport"}]}"#).is_ok());
    }

    #[test]
    fn test_load_workflow_file_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let yaml = dir.path().join("patch.YML");
        std::fs::write(&yaml, PATCH_YAML).unwrap();
        assert_eq!(load_workflow_file(&yaml).unwrap().name, "driver-patch");

        let json = dir.path().join("patch.json");
        std::fs::write(&json, "name: not-json").unwrap();
        let err = load_workflow_file(&json).unwrap_err();
        assert!(matches!(err, WorkflowError::ParseError(_)));
        assert!(err.to_string().contains("patch.json"));

        let missing = load_workflow_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, WorkflowError::IoError(_)));
    }
}
