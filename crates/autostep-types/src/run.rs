//! Run-state domain types.
//!
//! `RunRecord` is the durable unit of progress: one per run id, holding a
//! pre-allocated `StepRecord` slot for every step of the workflow. The JSON
//! field names here are the on-disk format of `state.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    PendingReboot,
}

impl RunStatus {
    /// Completed and failed runs are terminal and subject to history pruning.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PendingReboot => "pending_reboot",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "pending_reboot" => Ok(Self::PendingReboot),
            other => Err(format!("invalid run status: '{other}'")),
        }
    }
}

/// Per-step checkpoint state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// Boot mode requested for the restart that suspends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootMode {
    #[default]
    Normal,
    Safe,
}

impl fmt::Display for BootMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Safe => "safe",
        })
    }
}

/// Checkpoint slot for one step.
///
/// Slots are allocated empty (no id, no status) when the run starts and
/// filled in as the runner reaches each step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Durable state of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub workflow_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_step_index: usize,
    pub total_steps: usize,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    /// Index to resume from after the pending reboot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_reboot_next: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_boot_mode: Option<BootMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_delay_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RunRecord {
    /// A fresh `running` record with `total_steps` empty step slots.
    pub fn new(
        run_id: impl Into<String>,
        workflow_name: impl Into<String>,
        total_steps: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow_name: workflow_name.into(),
            status: RunStatus::Running,
            started_at: now,
            updated_at: now,
            current_step_index: 0,
            total_steps,
            steps: vec![StepRecord::default(); total_steps],
            pending_reboot_next: None,
            pending_boot_mode: None,
            resume_delay_seconds: None,
            last_error: None,
        }
    }

    /// Number of step slots whose status is `completed`.
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == Some(StepStatus::Completed))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::PendingReboot.is_terminal());
    }

    #[test]
    fn test_run_status_wire_format() {
        let json = serde_json::to_string(&RunStatus::PendingReboot).unwrap();
        assert_eq!(json, "\"pending_reboot\"");
        assert_eq!("pending_reboot".parse::<RunStatus>().unwrap(), RunStatus::PendingReboot);
        assert!("paused".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_new_record_preallocates_steps() {
        let record = RunRecord::new("r1", "patch", 3, Utc::now());
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.steps.len(), 3);
        assert!(record.steps.iter().all(|s| s.status.is_none() && s.step_id.is_empty()));
        assert_eq!(record.current_step_index, 0);
        assert_eq!(record.completed_steps(), 0);
    }

    #[test]
    fn test_reboot_fields_omitted_when_empty() {
        let record = RunRecord::new("r1", "patch", 1, Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("pending_reboot_next").is_none());
        assert!(json.get("pending_boot_mode").is_none());
        assert_eq!(json["status"], "running");
        assert_eq!(json["total_steps"], 1);
    }

    #[test]
    fn test_record_reads_state_file_fields() {
        let json = r#"{
            "run_id": "patch-1",
            "workflow_name": "patch",
            "status": "pending_reboot",
            "started_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:05:00Z",
            "current_step_index": 1,
            "total_steps": 3,
            "steps": [
                {"step_id": "a", "status": "completed"},
                {"step_id": "b", "status": "completed"},
                {"step_id": ""}
            ],
            "pending_reboot_next": 2,
            "pending_boot_mode": "safe",
            "resume_delay_seconds": 30
        }"#;
        let record: RunRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, RunStatus::PendingReboot);
        assert_eq!(record.pending_reboot_next, Some(2));
        assert_eq!(record.pending_boot_mode, Some(BootMode::Safe));
        assert_eq!(record.completed_steps(), 2);
        assert!(record.last_error.is_none());
    }
}
