//! Data root layout.
//!
//! Everything Autostep persists lives under one root directory:
//!
//! ```text
//! <root>/
//!   manifest.json
//!   workflows/
//!   artifacts/
//!   state.json
//!   state.json.lock
//!   logs/autostep.log
//!   config.toml
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the platform default root.
pub const ROOT_ENV: &str = "AUTOSTEP_ROOT";

/// Resolved locations under a data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutostepPaths {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub workflows_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub state_file: PathBuf,
    pub lock_file: PathBuf,
    pub logs_dir: PathBuf,
    pub log_file: PathBuf,
    pub config_file: PathBuf,
}

impl AutostepPaths {
    /// Standard layout under `root`.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let logs_dir = root.join("logs");
        Self {
            manifest: root.join("manifest.json"),
            workflows_dir: root.join("workflows"),
            artifacts_dir: root.join("artifacts"),
            state_file: root.join("state.json"),
            lock_file: root.join("state.json.lock"),
            log_file: logs_dir.join("autostep.log"),
            logs_dir,
            config_file: root.join("config.toml"),
            root,
        }
    }

    /// Layout under `override_root`, or under [`resolve_root`] when `None`.
    pub fn resolve(override_root: Option<&Path>) -> Self {
        match override_root {
            Some(root) => Self::from_root(root),
            None => Self::from_root(resolve_root()),
        }
    }

    /// Create the root and its directories if missing.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in [
            &self.root,
            &self.workflows_dir,
            &self.artifacts_dir,
            &self.logs_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Resolve the data root from the environment or platform defaults.
///
/// Priority:
/// 1. `AUTOSTEP_ROOT` environment variable
/// 2. `C:\ProgramData\Autostep` on Windows
/// 3. Platform local data directory (e.g. `~/.local/share/autostep`)
/// 4. `./var/autostep`
pub fn resolve_root() -> PathBuf {
    root_from(std::env::var_os(ROOT_ENV), dirs::data_local_dir())
}

fn root_from(env: Option<OsString>, data_local: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if cfg!(windows) {
        return PathBuf::from(r"C:\ProgramData\Autostep");
    }
    match data_local {
        Some(dir) => dir.join("autostep"),
        None => Path::new(".").join("var").join("autostep"),
    }
}
