//! Cross-process store lock.
//!
//! An exclusive OS advisory lock on `state.json.lock`, held for as long as
//! the guard lives. The OS drops the lock when the process dies, so a
//! reboot never leaves it behind.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use autostep_types::error::StoreError;

/// Guard for the exclusive store lock. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock without waiting.
    ///
    /// Returns [`StoreError::Locked`] when another process holds it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| StoreError::Io(format!("open {}: {e}", path.display())))?;

        match file.try_lock() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "store lock acquired");
                Ok(Self { file, path })
            }
            Err(TryLockError::WouldBlock) => Err(StoreError::Locked(path.display().to_string())),
            Err(TryLockError::Error(e)) => Err(StoreError::Io(format!(
                "lock {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        tracing::debug!(path = %self.path.display(), "store lock released");
    }
}
