//! File-backed run store.
//!
//! The whole ledger is one pretty-printed JSON object keyed by run id.
//! Every mutation rewrites it through `<file>.tmp`: write, fsync, rename
//! over the committed file. A crash at any point leaves either the old or
//! the new content at `state.json`, never a mix. A leftover `.tmp` is
//! ignored on open and overwritten by the next commit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autostep_core::repository::RunStore;
use autostep_core::state::RunLedger;
use autostep_types::error::StoreError;
use autostep_types::run::{BootMode, RunRecord};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// JSON file implementation of [`RunStore`].
///
/// One in-process mutex serializes all calls; cross-process exclusion is
/// the caller's job (see [`StoreLock`](super::lock::StoreLock)).
#[derive(Debug)]
pub struct JsonRunStore {
    path: PathBuf,
    ledger: Mutex<RunLedger>,
}

impl JsonRunStore {
    /// Load the ledger at `path`. A missing or empty file is an empty ledger.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let ledger = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => RunLedger::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Parse(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RunLedger::new(),
            Err(e) => return Err(StoreError::Io(format!("read {}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), runs = ledger.len(), "run store opened");
        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy of the ledger, persist the copy, then publish it.
    async fn commit(
        &self,
        f: impl FnOnce(&mut RunLedger) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut ledger = self.ledger.lock().await;
        let mut next = ledger.clone();
        f(&mut next)?;
        write_atomic(&self.path, &next).await?;
        *ledger = next;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn io_err(action: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{action} {}: {e}", path.display()))
}

async fn write_atomic(path: &Path, ledger: &RunLedger) -> Result<(), StoreError> {
    let bytes =
        serde_json::to_vec_pretty(ledger).map_err(|e| StoreError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err("create", parent, e))?;
    }

    let tmp = tmp_path(path);
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| io_err("create", &tmp, e))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| io_err("write", &tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_err("sync", &tmp, e))?;
    drop(file);

    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_err("rename", &tmp, e))?;

    // Make the rename itself durable.
    #[cfg(unix)]
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = tokio::fs::File::open(parent).await {
            let _ = dir.sync_all().await;
        }
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "run state committed");
    Ok(())
}

impl RunStore for JsonRunStore {
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
        self.commit(|l| l.start_run(run_id, workflow_name, total_steps, Utc::now()))
            .await
    }

    async fn mark_run_completed(&self, run_id: &str) -> Result<(), StoreError> {
        self.commit(|l| l.mark_run_completed(run_id, Utc::now())).await
    }

    async fn mark_step_pending(
        &self,
        run_id: &str,
        index: usize,
        step_id: &str,
    ) -> Result<(), StoreError> {
        self.commit(|l| l.mark_step_pending(run_id, index, step_id, Utc::now()))
            .await
    }

    async fn mark_step_complete(&self, run_id: &str, index: usize) -> Result<(), StoreError> {
        self.commit(|l| l.mark_step_complete(run_id, index, Utc::now()))
            .await
    }

    async fn mark_step_failed(
        &self,
        run_id: &str,
        index: usize,
        message: &str,
    ) -> Result<(), StoreError> {
        self.commit(|l| l.mark_step_failed(run_id, index, message, Utc::now()))
            .await
    }

    async fn mark_pending_reboot(
        &self,
        run_id: &str,
        next_index: usize,
        boot_mode: BootMode,
        resume_delay: Option<Duration>,
    ) -> Result<(), StoreError> {
        self.commit(|l| {
            l.mark_pending_reboot(run_id, next_index, boot_mode, resume_delay, Utc::now())
        })
        .await
    }

    async fn clear_pending_reboot(&self, run_id: &str) -> Result<(), StoreError> {
        self.commit(|l| l.clear_pending_reboot(run_id, Utc::now()))
            .await
    }
}
