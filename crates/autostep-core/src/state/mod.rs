//! Run ledger: the pure state machine behind every run store.
//!
//! `RunLedger` holds the map of run records and applies store transitions
//! to it without doing any I/O. Store backends clone the ledger, apply a
//! transition to the clone, persist it, and only then replace their visible
//! copy, so a failed write never leaves memory ahead of disk.

pub mod memory;

use std::collections::BTreeMap;
use std::time::Duration;

use autostep_types::error::StoreError;
use autostep_types::run::{BootMode, RunRecord, RunStatus, StepRecord, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Map of run id to run record, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLedger {
    runs: BTreeMap<String, RunRecord>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_runs(runs: BTreeMap<String, RunRecord>) -> Self {
        Self { runs }
    }

    pub fn runs(&self) -> &BTreeMap<String, RunRecord> {
        &self.runs
    }

    pub fn get(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    pub fn start_run(
        &mut self,
        run_id: &str,
        workflow_name: &str,
        total_steps: usize,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.runs.contains_key(run_id) {
            return Err(StoreError::AlreadyExists(run_id.to_string()));
        }
        self.runs.insert(
            run_id.to_string(),
            RunRecord::new(run_id, workflow_name, total_steps, now),
        );
        Ok(())
    }

    pub fn mark_step_pending(
        &mut self,
        run_id: &str,
        index: usize,
        step_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.step_slot(run_id, index)?;
        if index < record.current_step_index {
            return Err(StoreError::IndexRegression {
                run_id: run_id.to_string(),
                index,
                current: record.current_step_index,
            });
        }
        record.status = RunStatus::Running;
        record.current_step_index = index;
        record.steps[index] = StepRecord {
            step_id: step_id.to_string(),
            status: Some(StepStatus::Pending),
            error: None,
        };
        record.updated_at = now;
        Ok(())
    }

    pub fn mark_step_complete(
        &mut self,
        run_id: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.step_slot(run_id, index)?;
        let step = &mut record.steps[index];
        step.status = Some(StepStatus::Completed);
        step.error = None;
        record.current_step_index = record.current_step_index.max(index);
        record.updated_at = now;
        Ok(())
    }

    pub fn mark_step_failed(
        &mut self,
        run_id: &str,
        index: usize,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.step_slot(run_id, index)?;
        let step = &mut record.steps[index];
        step.status = Some(StepStatus::Failed);
        step.error = Some(message.to_string());
        record.status = RunStatus::Failed;
        record.current_step_index = record.current_step_index.max(index);
        record.last_error = Some(message.to_string());
        clear_reboot_fields(record);
        record.updated_at = now;
        self.prune_history();
        Ok(())
    }

    pub fn mark_pending_reboot(
        &mut self,
        run_id: &str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(run_id)?;
        // next_index == total_steps is a reboot on the final step.
        if next_index > record.total_steps {
            return Err(StoreError::StepOutOfRange {
                run_id: run_id.to_string(),
                index: next_index,
                total_steps: record.total_steps,
            });
        }
        record.status = RunStatus::PendingReboot;
        record.pending_reboot_next = Some(next_index);
        record.pending_boot_mode = Some(boot_mode);
        record.resume_delay_seconds = resume_delay.map(|d| d.as_secs());
        record.updated_at = now;
        Ok(())
    }

    pub fn clear_pending_reboot(
        &mut self,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(run_id)?;
        if record.status != RunStatus::PendingReboot {
            return Err(StoreError::NotPendingReboot {
                run_id: run_id.to_string(),
                status: record.status.to_string(),
            });
        }
        record.status = RunStatus::Running;
        clear_reboot_fields(record);
        record.updated_at = now;
        Ok(())
    }

    pub fn mark_run_completed(
        &mut self,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = self.record_mut(run_id)?;
        record.status = RunStatus::Completed;
        clear_reboot_fields(record);
        record.updated_at = now;
        self.prune_history();
        Ok(())
    }

    /// Keep only the most recently updated terminal run.
    ///
    /// Non-terminal runs are never removed. Equal timestamps are broken by
    /// run id so the survivor is deterministic. Returns the number removed.
    pub fn prune_history(&mut self) -> usize {
        let keep = self
            .runs
            .values()
            .filter(|r| r.status.is_terminal())
            .max_by(|a, b| {
                a.updated_at
                    .cmp(&b.updated_at)
                    .then_with(|| a.run_id.cmp(&b.run_id))
            })
            .map(|r| r.run_id.clone());

        let Some(keep) = keep else {
            return 0;
        };

        let before = self.runs.len();
        self.runs
            .retain(|id, r| !r.status.is_terminal() || *id == keep);
        let removed = before - self.runs.len();
        if removed > 0 {
            tracing::debug!(kept = %keep, removed, "pruned terminal run history");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn record_mut(&mut self, run_id: &str) -> Result<&mut RunRecord, StoreError> {
        self.runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::NotFound(run_id.to_string()))
    }

    fn step_slot(&mut self, run_id: &str, index: usize) -> Result<&mut RunRecord, StoreError> {
        let record = self.record_mut(run_id)?;
        if index >= record.steps.len() {
            return Err(StoreError::StepOutOfRange {
                run_id: run_id.to_string(),
                index,
                total_steps: record.total_steps,
            });
        }
        Ok(record)
    }
}

/// Reboot bookkeeping is set only while a run is `pending_reboot`.
fn clear_reboot_fields(record: &mut RunRecord) {
    record.pending_reboot_next = None;
    record.pending_boot_mode = None;
    record.resume_delay_seconds = None;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_start_run_rejects_duplicate_without_change() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 2, at(0)).unwrap();
        ledger.mark_step_pending("r1", 0, "a", at(1)).unwrap();
        let before = ledger.get("r1").cloned();

        let err = ledger.start_run("r1", "other", 5, at(2)).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("r1".to_string()));
        assert!(err.to_string().contains("already exists"));
        assert_eq!(ledger.get("r1").cloned(), before);
    }

    #[test]
    fn test_step_transitions() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 2, at(0)).unwrap();

        ledger.mark_step_pending("r1", 0, "copy", at(1)).unwrap();
        let r = ledger.get("r1").unwrap();
        assert_eq!(r.steps[0].status, Some(StepStatus::Pending));
        assert_eq!(r.steps[0].step_id, "copy");

        ledger.mark_step_complete("r1", 0, at(2)).unwrap();
        ledger.mark_step_pending("r1", 1, "check", at(3)).unwrap();
        ledger.mark_step_failed("r1", 1, "boom", at(4)).unwrap();

        let r = ledger.get("r1").unwrap();
        assert_eq!(r.steps[0].status, Some(StepStatus::Completed));
        assert_eq!(r.steps[0].step_id, "copy");
        assert_eq!(r.steps[1].status, Some(StepStatus::Failed));
        assert_eq!(r.steps[1].error.as_deref(), Some("boom"));
        assert_eq!(r.status, RunStatus::Failed);
        assert_eq!(r.last_error.as_deref(), Some("boom"));
        assert_eq!(r.current_step_index, 1);
        assert_eq!(r.updated_at, at(4));
    }

    #[test]
    fn test_unknown_run_and_bad_index() {
        let mut ledger = RunLedger::new();
        assert!(matches!(
            ledger.mark_step_pending("missing", 0, "a", at(0)),
            Err(StoreError::NotFound(_))
        ));

        ledger.start_run("r1", "patch", 1, at(0)).unwrap();
        assert!(matches!(
            ledger.mark_step_complete("r1", 1, at(1)),
            Err(StoreError::StepOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_pending_index_never_regresses() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 3, at(0)).unwrap();
        ledger.mark_step_pending("r1", 2, "c", at(1)).unwrap();
        let err = ledger.mark_step_pending("r1", 1, "b", at(2)).unwrap_err();
        assert!(matches!(err, StoreError::IndexRegression { index: 1, current: 2, .. }));
    }

    #[test]
    fn test_reboot_bookkeeping_set_and_clear() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 3, at(0)).unwrap();
        ledger
            .mark_pending_reboot("r1", 2, BootMode::Safe, Some(Duration::from_secs(30)), at(1))
            .unwrap();

        let r = ledger.get("r1").unwrap();
        assert_eq!(r.status, RunStatus::PendingReboot);
        assert_eq!(r.pending_reboot_next, Some(2));
        assert_eq!(r.pending_boot_mode, Some(BootMode::Safe));
        assert_eq!(r.resume_delay_seconds, Some(30));

        ledger.clear_pending_reboot("r1", at(2)).unwrap();
        let r = ledger.get("r1").unwrap();
        assert_eq!(r.status, RunStatus::Running);
        assert!(r.pending_reboot_next.is_none());
        assert!(r.pending_boot_mode.is_none());
        assert!(r.resume_delay_seconds.is_none());
    }

    #[test]
    fn test_clear_rejects_run_not_pending_reboot() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 1, at(0)).unwrap();
        ledger.mark_step_pending("r1", 0, "a", at(1)).unwrap();
        ledger.mark_step_failed("r1", 0, "boom", at(2)).unwrap();
        assert!(matches!(
            ledger.clear_pending_reboot("r1", at(3)),
            Err(StoreError::NotPendingReboot { .. })
        ));
    }

    #[test]
    fn test_failure_after_reboot_request_clears_bookkeeping() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 2, at(0)).unwrap();
        ledger.mark_step_pending("r1", 0, "boot", at(1)).unwrap();
        ledger
            .mark_pending_reboot("r1", 1, BootMode::Normal, None, at(2))
            .unwrap();
        ledger.mark_step_failed("r1", 0, "request reboot: denied", at(3)).unwrap();

        let r = ledger.get("r1").unwrap();
        assert_eq!(r.status, RunStatus::Failed);
        assert!(r.pending_reboot_next.is_none());
        assert!(r.pending_boot_mode.is_none());
    }

    #[test]
    fn test_pending_reboot_next_bounded_by_total_steps() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 2, at(0)).unwrap();
        assert!(ledger
            .mark_pending_reboot("r1", 2, BootMode::Normal, None, at(1))
            .is_ok());
        assert!(matches!(
            ledger.mark_pending_reboot("r1", 3, BootMode::Normal, None, at(2)),
            Err(StoreError::StepOutOfRange { .. })
        ));
    }

    #[test]
    fn test_prune_keeps_latest_terminal_and_all_live_runs() {
        let mut ledger = RunLedger::new();
        ledger.start_run("old", "patch", 1, at(0)).unwrap();
        ledger.start_run("new", "patch", 1, at(0)).unwrap();
        ledger.start_run("live", "patch", 1, at(0)).unwrap();
        ledger.start_run("parked", "patch", 2, at(0)).unwrap();
        ledger
            .mark_pending_reboot("parked", 1, BootMode::Normal, None, at(1))
            .unwrap();

        ledger.mark_step_pending("old", 0, "a", at(1)).unwrap();
        ledger.mark_step_failed("old", 0, "boom", at(2)).unwrap();
        assert!(ledger.get("old").is_some());

        ledger.mark_run_completed("new", at(5)).unwrap();

        assert!(ledger.get("old").is_none());
        assert!(ledger.get("new").is_some());
        assert!(ledger.get("live").is_some());
        assert!(ledger.get("parked").is_some());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_prune_uses_timestamp_not_call_order() {
        let mut ledger = RunLedger::new();
        ledger.start_run("a", "w", 1, at(0)).unwrap();
        ledger.start_run("b", "w", 1, at(0)).unwrap();
        ledger.mark_run_completed("a", at(10)).unwrap();
        // Completing "b" with an older timestamp must not evict "a".
        ledger.mark_run_completed("b", at(5)).unwrap();

        assert!(ledger.get("a").is_some());
        assert!(ledger.get("b").is_none());
    }

    #[test]
    fn test_prune_tie_keeps_exactly_one() {
        let mut ledger = RunLedger::new();
        ledger.start_run("a", "w", 1, at(0)).unwrap();
        ledger.start_run("b", "w", 1, at(0)).unwrap();
        ledger.mark_run_completed("a", at(3)).unwrap();
        ledger.mark_run_completed("b", at(3)).unwrap();

        let terminal = ledger
            .runs()
            .values()
            .filter(|r| r.status.is_terminal())
            .count();
        assert_eq!(terminal, 1);
    }

    #[test]
    fn test_ledger_serializes_as_plain_map() {
        let mut ledger = RunLedger::new();
        ledger.start_run("r1", "patch", 1, at(0)).unwrap();
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["r1"]["workflow_name"], "patch");

        let parsed: RunLedger = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ledger);
    }
}
