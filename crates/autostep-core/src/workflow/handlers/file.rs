//! File actions: copy (with optional checksum), rename, pattern delete and
//! pattern existence checks.

use std::path::Path;

use autostep_types::workflow::StepDefinition;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::expected_flag;
use crate::workflow::action::{
    ActionContext, ActionHandler, ActionKind, StepError, StepOutcome, step_params,
};
use crate::workflow::pattern::match_paths;

#[derive(Debug, Default, Deserialize)]
struct CopyParams {
    #[serde(default, alias = "from")]
    src_path: String,
    #[serde(default, alias = "to")]
    dst_path: String,
    #[serde(default)]
    verify_sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenameParams {
    #[serde(default, alias = "from")]
    src_path: String,
    #[serde(default)]
    new_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct MatchParams {
    #[serde(default)]
    path_regex: String,
    #[serde(default)]
    expected: Option<Value>,
}

/// Handles `file_copy`, `file_rename`, `file_delete` and `file_exists`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileHandler;

impl ActionHandler for FileHandler {
    fn kinds(&self) -> &'static [ActionKind] {
        &[
            ActionKind::FileCopy,
            ActionKind::FileRename,
            ActionKind::FileDelete,
            ActionKind::FileExists,
        ]
    }

    async fn execute<'a>(
        &'a self,
        kind: ActionKind,
        step: &'a StepDefinition,
        ctx: &'a ActionContext<'a>,
    ) -> Result<StepOutcome, StepError> {
        match kind {
            ActionKind::FileCopy => copy(step_params(kind, step)?, ctx).await?,
            ActionKind::FileRename => rename(step_params(kind, step)?, ctx).await?,
            ActionKind::FileDelete => delete(step_params(kind, step)?).await?,
            ActionKind::FileExists => exists(step_params(kind, step)?)?,
            other => {
                return Err(StepError::Validation(format!(
                    "file handler cannot run {other}"
                )));
            }
        }
        Ok(StepOutcome::Completed)
    }
}

async fn copy(params: CopyParams, ctx: &ActionContext<'_>) -> Result<(), StepError> {
    if params.src_path.is_empty() || params.dst_path.is_empty() {
        return Err(StepError::Validation(
            "file_copy requires src_path and dst_path".to_string(),
        ));
    }
    let src = ctx.resolve_path(&params.src_path);
    let dst = ctx.resolve_path(&params.dst_path);

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StepError::Execution(format!("make dest dir: {e}")))?;
    }
    tokio::fs::copy(&src, &dst).await.map_err(|e| {
        StepError::Execution(format!("copy {} to {}: {e}", src.display(), dst.display()))
    })?;

    if let Some(expected) = params.verify_sha256.as_deref().filter(|s| !s.is_empty()) {
        let actual = sha256_file(&dst)
            .await
            .map_err(|e| StepError::Execution(format!("hash dest: {e}")))?;
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(StepError::Execution(format!(
                "checksum mismatch: expected {expected} got {actual}"
            )));
        }
    }

    tracing::debug!(src = %src.display(), dst = %dst.display(), "copied file");
    Ok(())
}

async fn rename(params: RenameParams, ctx: &ActionContext<'_>) -> Result<(), StepError> {
    if params.src_path.is_empty() || params.new_name.is_empty() {
        return Err(StepError::Validation(
            "file_rename requires src_path and new_name".to_string(),
        ));
    }
    let src = ctx.resolve_path(&params.src_path);
    let dest = src
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&params.new_name);

    tokio::fs::rename(&src, &dest).await.map_err(|e| {
        StepError::Execution(format!("rename {} to {}: {e}", src.display(), dest.display()))
    })
}

async fn delete(params: MatchParams) -> Result<(), StepError> {
    let matches = match_paths(&params.path_regex)?;
    let mut deleted = 0usize;

    for path in matches {
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(StepError::Execution(format!("stat {}: {e}", path.display())));
            }
        };
        if meta.is_dir() {
            continue;
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StepError::Execution(format!("delete {}: {e}", path.display())))?;
        deleted += 1;
    }

    tracing::debug!(pattern = %params.path_regex, deleted, "deleted matching files");
    Ok(())
}

fn exists(params: MatchParams) -> Result<(), StepError> {
    let expect = expected_flag(params.expected.as_ref())?;
    let matches = match_paths(&params.path_regex)?;

    if expect && matches.is_empty() {
        return Err(StepError::Execution(format!(
            "file_exists: no matches for {}",
            params.path_regex
        )));
    }
    if !expect && !matches.is_empty() {
        return Err(StepError::Execution(format!(
            "file_exists: unexpected match(es) for {}",
            params.path_regex
        )));
    }
    Ok(())
}

async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
