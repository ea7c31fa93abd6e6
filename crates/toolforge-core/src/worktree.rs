//! Isolated per-candidate workspaces.
//!
//! Each candidate gets a fresh detached `git worktree` checkout of the
//! source tree so concurrent attempts cannot corrupt each other. Release is
//! best-effort by design: if git refuses to remove the worktree, the
//! directory is deleted directly so cleanup can never wedge a pipeline.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::error::{GenerationError, Result};
use crate::process::{run_command, RunOptions};

const ADD_TIMEOUT_MS: u64 = 30_000;
const REMOVE_TIMEOUT_MS: u64 = 15_000;

/// A live isolated checkout owned by exactly one candidate.
#[derive(Debug, Clone)]
pub struct WorktreeHandle {
    pub path: PathBuf,
    repo_root: PathBuf,
}

impl WorktreeHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Creates and destroys detached worktree checkouts under a base directory.
#[derive(Debug, Clone)]
pub struct WorktreeManager {
    repo_root: PathBuf,
    base_dir: PathBuf,
}

impl WorktreeManager {
    pub fn new(repo_root: impl Into<PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Create a fresh detached checkout at `<base>/<job>/<candidate>`.
    ///
    /// Any stale directory at the target path is forcibly removed first so
    /// candidate identifiers stay reusable across retried jobs.
    pub async fn acquire(&self, job_id: &str, candidate_id: &str) -> Result<WorktreeHandle> {
        let worktree_path = self.base_dir.join(job_id).join(candidate_id);
        if let Some(parent) = worktree_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if worktree_path.exists() {
            std::fs::remove_dir_all(&worktree_path)?;
        }

        let args = vec![
            "worktree".to_string(),
            "add".to_string(),
            "--detach".to_string(),
            worktree_path.to_string_lossy().to_string(),
            "HEAD".to_string(),
        ];
        let result = run_command(
            "git",
            &args,
            RunOptions {
                cwd: Some(self.repo_root.clone()),
                timeout_ms: Some(ADD_TIMEOUT_MS),
                ..Default::default()
            },
        )
        .await?;

        if result.exit_code != 0 {
            let diagnostic = if !result.stderr.trim().is_empty() {
                result.stderr
            } else if !result.stdout.trim().is_empty() {
                result.stdout
            } else {
                "unknown error".to_string()
            };
            return Err(GenerationError::Isolation {
                candidate_id: candidate_id.to_string(),
                message: diagnostic,
            });
        }

        Ok(WorktreeHandle {
            path: worktree_path,
            repo_root: self.repo_root.clone(),
        })
    }

    /// Remove a checkout. Falls back to a forced recursive delete when the
    /// git removal fails, so no failure here can block pipeline completion.
    pub async fn release(&self, handle: WorktreeHandle) {
        release_worktree(&handle.repo_root, &handle.path).await;
    }
}

async fn release_worktree(repo_root: &Path, worktree_path: &Path) {
    let args = vec![
        "worktree".to_string(),
        "remove".to_string(),
        "--force".to_string(),
        worktree_path.to_string_lossy().to_string(),
    ];
    let removed = match run_command(
        "git",
        &args,
        RunOptions {
            cwd: Some(repo_root.to_path_buf()),
            timeout_ms: Some(REMOVE_TIMEOUT_MS),
            ..Default::default()
        },
    )
    .await
    {
        Ok(result) => result.exit_code == 0,
        Err(_) => false,
    };

    if !removed && worktree_path.exists() {
        if let Err(e) = std::fs::remove_dir_all(worktree_path) {
            warn!(path = %worktree_path.display(), error = %e, "worktree cleanup left residue");
        }
    }
}

/// Resolve the enclosing git repository root via `git rev-parse`.
pub async fn resolve_repo_root(cwd: &Path) -> Result<PathBuf> {
    let args = vec!["rev-parse".to_string(), "--show-toplevel".to_string()];
    let result = run_command(
        "git",
        &args,
        RunOptions {
            cwd: Some(cwd.to_path_buf()),
            timeout_ms: Some(10_000),
            ..Default::default()
        },
    )
    .await?;

    let root = result.stdout.trim();
    if result.exit_code != 0 || root.is_empty() {
        return Err(GenerationError::RepoRootNotFound {
            cwd: cwd.to_path_buf(),
        });
    }
    Ok(PathBuf::from(root))
}
