//! Run store trait definition.
//!
//! The run store is the sole owner of durable run state. Every mutating
//! call must be durable before it returns `Ok`; the infrastructure layer
//! (autostep-infra) implements it with an atomically rewritten JSON file.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use autostep_types::error::StoreError;
use autostep_types::run::{BootMode, RunRecord};

/// Repository trait for run-state persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait RunStore: Send + Sync {
    /// Deep-copied snapshot of every run record, keyed by run id.
    fn export(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<String, RunRecord>, StoreError>> + Send;

    /// Deep copy of a single run record.
    fn get(
        &self,
        run_id: &str,
    ) -> impl Future<Output = Result<Option<RunRecord>, StoreError>> + Send;

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    /// Create a `running` record with `total_steps` empty step slots.
    ///
    /// Fails with [`StoreError::AlreadyExists`] without touching the existing record.
    fn start_run(
        &self,
        run_id: &str,
        workflow_name: &str,
        total_steps: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Terminal success. Triggers history pruning.
    fn mark_run_completed(
        &self,
        run_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // -----------------------------------------------------------------------
    // Step checkpoints
    // -----------------------------------------------------------------------

    fn mark_step_pending(
        &self,
        run_id: &str,
        index: usize,
        step_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn mark_step_complete(
        &self,
        run_id: &str,
        index: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails the step and the run, records `last_error`, prunes history.
    fn mark_step_failed(
        &self,
        run_id: &str,
        index: usize,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // -----------------------------------------------------------------------
    // Reboot bookkeeping
    // -----------------------------------------------------------------------

    fn mark_pending_reboot(
        &self,
        run_id: &str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn clear_pending_reboot(
        &self,
        run_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Object-safe version of [`RunStore`] with boxed futures.
///
/// Action handlers receive the store as `&dyn RunStoreDyn` so the handler
/// registry does not have to be generic over the backend. A blanket
/// implementation is provided for all types implementing `RunStore`.
pub trait RunStoreDyn: Send + Sync {
    fn export_boxed(&self) -> BoxFut<'_, BTreeMap<String, RunRecord>>;

    fn get_boxed<'a>(&'a self, run_id: &'a str) -> BoxFut<'a, Option<RunRecord>>;

    fn mark_pending_reboot_boxed<'a>(
        &'a self,
        run_id: &'a str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
    ) -> BoxFut<'a, ()>;
}

impl<T: RunStore> RunStoreDyn for T {
    fn export_boxed(&self) -> BoxFut<'_, BTreeMap<String, RunRecord>> {
        Box::pin(self.export())
    }

    fn get_boxed<'a>(&'a self, run_id: &'a str) -> BoxFut<'a, Option<RunRecord>> {
        Box::pin(self.get(run_id))
    }

    fn mark_pending_reboot_boxed<'a>(
        &'a self,
        run_id: &'a str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
    ) -> BoxFut<'a, ()> {
        Box::pin(self.mark_pending_reboot(run_id, next_index, boot_mode, resume_delay))
    }
}
