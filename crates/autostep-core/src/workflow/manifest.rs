//! Workflow manifest: maps workflow names to definition files.
//!
//! ```json
//! { "workflows": [ { "name": "driver-patch", "path": "driver-patch.yaml",
//!                    "version": "3", "artifacts": ["acme.sys"] } ] }
//! ```

use std::path::{Component, Path, PathBuf};

use autostep_types::workflow::WorkflowDefinition;
use serde::{Deserialize, Serialize};

use super::definition::{WorkflowError, load_workflow_file};

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRef {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

impl WorkflowRef {
    /// Definition file location; relative paths resolve against `workflows_dir`.
    pub fn resolve_path(&self, workflows_dir: &Path) -> PathBuf {
        let cleaned: PathBuf = Path::new(&self.path)
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        if cleaned.is_absolute() {
            cleaned
        } else {
            workflows_dir.join(cleaned)
        }
    }
}

/// Parsed `manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub workflows: Vec<WorkflowRef>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            WorkflowError::ParseError(format!("manifest {}: {e}", path.display()))
        })
    }

    pub fn find(&self, name: &str) -> Option<&WorkflowRef> {
        self.workflows.iter().find(|w| w.name == name)
    }
}

/// Look `name` up in the manifest and load its definition.
pub fn load_workflow_by_name(
    manifest_path: &Path,
    workflows_dir: &Path,
    name: &str,
) -> Result<WorkflowDefinition, WorkflowError> {
    let manifest = Manifest::load(manifest_path)?;
    let entry = manifest
        .find(name)
        .ok_or_else(|| WorkflowError::NotInManifest(name.to_string()))?;
    let path = entry.resolve_path(workflows_dir);
    tracing::debug!(workflow = name, path = %path.display(), "loading workflow definition");
    load_workflow_file(&path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> (PathBuf, PathBuf) {
        let workflows = dir.path().join("workflows");
        std::fs::create_dir_all(&workflows).unwrap();
        std::fs::write(
            workflows.join("patch.json"),
            r#"{"name": "patch", "steps": [{"id": "a", "action": "sleep"}]}"#,
        )
        .unwrap();
        let manifest = dir.path().join("manifest.json");
        std::fs::write(
            &manifest,
            r#"{"workflows": [
                {"name": "patch", "path": "./patch.json", "version": "2", "artifacts": ["a.sys"]},
                {"name": "ghost", "path": "ghost.yaml"}
            ]}"#,
        )
        .unwrap();
        (manifest, workflows)
    }

    #[test]
    fn test_find_and_resolve() {
        let dir = TempDir::new().unwrap();
        let (manifest_path, workflows) = write_fixture(&dir);
        let manifest = Manifest::load(&manifest_path).unwrap();

        let entry = manifest.find("patch").unwrap();
        assert_eq!(entry.version.as_deref(), Some("2"));
        assert_eq!(entry.artifacts, vec!["a.sys".to_string()]);
        assert_eq!(entry.resolve_path(&workflows), workflows.join("patch.json"));
        assert!(manifest.find("missing").is_none());
    }

    #[test]
    fn test_absolute_path_is_kept() {
        let entry = WorkflowRef {
            name: "x".into(),
            path: "/opt/flows/x.yaml".into(),
            version: None,
            artifacts: vec![],
        };
        assert_eq!(entry.resolve_path(Path::new("/data/workflows")), Path::new("/opt/flows/x.yaml"));
    }

    #[test]
    fn test_load_workflow_by_name() {
        let dir = TempDir::new().unwrap();
        let (manifest_path, workflows) = write_fixture(&dir);

        let def = load_workflow_by_name(&manifest_path, &workflows, "patch").unwrap();
        assert_eq!(def.name, "patch");

        let err = load_workflow_by_name(&manifest_path, &workflows, "nope").unwrap_err();
        assert!(matches!(err, WorkflowError::NotInManifest(ref n) if n == "nope"));

        let err = load_workflow_by_name(&manifest_path, &workflows, "ghost").unwrap_err();
        assert!(matches!(err, WorkflowError::IoError(_)));
    }
}
