use thiserror::Error;

/// Errors from run store operations (used by the `RunStore` trait in autostep-core).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("run {0} already exists")]
    AlreadyExists(String),

    #[error("run {0} not found")]
    NotFound(String),

    #[error("step index {index} out of range for run {run_id} ({total_steps} steps)")]
    StepOutOfRange {
        run_id: String,
        index: usize,
        total_steps: usize,
    },

    #[error("step index {index} is behind current index {current} for run {run_id}")]
    IndexRegression {
        run_id: String,
        index: usize,
        current: usize,
    },

    #[error("run {run_id} is {status}, not pending_reboot")]
    NotPendingReboot { run_id: String, status: String },

    #[error("state file i/o error: {0}")]
    Io(String),

    #[error("state file parse error: {0}")]
    Parse(String),

    #[error("state serialization error: {0}")]
    Serialize(String),

    #[error("state store is locked by another process: {0}")]
    Locked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_display() {
        let err = StoreError::AlreadyExists("patch-1".to_string());
        assert_eq!(err.to_string(), "run patch-1 already exists");
    }

    #[test]
    fn test_out_of_range_display() {
        let err = StoreError::StepOutOfRange {
            run_id: "r".to_string(),
            index: 4,
            total_steps: 3,
        };
        assert!(err.to_string().contains("4"));
        assert!(err.to_string().contains("3 steps"));
    }
}
