//! In-memory run store.
//!
//! Non-durable [`RunStore`] used by engine tests and dry runs.

use std::collections::BTreeMap;
use std::time::Duration;

use autostep_types::error::StoreError;
use autostep_types::run::{BootMode, RunRecord};
use chrono::Utc;
use tokio::sync::Mutex;

use super::RunLedger;
use crate::repository::RunStore;

#[derive(Debug, Default)]
pub struct MemoryRunStore {
    ledger: Mutex<RunLedger>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: RunLedger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    async fn apply(
        &self,
        f: impl FnOnce(&mut RunLedger) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        f(&mut next)?;
        *ledger = next;
        Ok(())
    }
}

impl RunStore for MemoryRunStore {
    async fn export(&self) -> Result<BTreeMap<String, RunRecord>, StoreError> {
        Ok(self.ledger.lock().await.runs().clone())
    }

    async fn get(&self, run_id: &str) -> Result<Option<RunRecord>, StoreError> {
        Ok(self.ledger.lock().await.get(run_id).cloned())
    }

    async fn start_run(
        &self,
        run_id: &str,
        workflow_name: &str,
        total_steps: usize,
    ) -> Result<(), StoreError> {
        self.apply(|l| l.start_run(run_id, workflow_name, total_steps, Utc::now()))
            .await
    }

    async fn mark_run_completed(&self, run_id: &str) -> Result<(), StoreError> {
        self.apply(|l| l.mark_run_completed(run_id, Utc::now())).await
    }

    async fn mark_step_pending(
        &self,
        run_id: &str,
        index: usize,
        step_id: &str,
    ) -> Result<(), StoreError> {
        self.apply(|l| l.mark_step_pending(run_id, index, step_id, Utc::now()))
            .await
    }

    async fn mark_step_complete(&self, run_id: &str, index: usize) -> Result<(), StoreError> {
        self.apply(|l| l.mark_step_complete(run_id, index, Utc::now()))
            .await
    }

    async fn mark_step_failed(
        &self,
        run_id: &str,
        index: usize,
        message: &str,
    ) -> Result<(), StoreError> {
        self.apply(|l| l.mark_step_failed(run_id, index, message, Utc::now()))
            .await
    }

    async fn mark_pending_reboot(
        &self,
        run_id: &str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.apply(|l| {
            l.mark_pending_reboot(run_id, next_index, boot_mode, resume_delay, Utc::now())
        })
        .await
    }

    async fn clear_pending_reboot(&self, run_id: &str) -> Result<(), StoreError> {
        self.apply(|l| l.clear_pending_reboot(run_id, Utc::now()))
            .await
    }
}
