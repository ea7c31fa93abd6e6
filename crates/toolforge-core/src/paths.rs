//! Runtime directory layout.
//!
//! Everything Toolforge persists lives under `<cwd>/.toolforge`: the
//! registry store, promoted tools, generation jobs, isolated worktrees, and
//! recorded runs.

use std::path::{Path, PathBuf};

/// Marker directory an agent is told to write its artifacts into.
pub const WORKSPACE_OUTPUT_DIR: &str = "_toolforge_output";

/// Resolved runtime locations for one Toolforge root.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root_dir: PathBuf,
    pub registry_path: PathBuf,
    pub tools_dir: PathBuf,
    pub jobs_dir: PathBuf,
    pub worktrees_dir: PathBuf,
    pub runs_dir: PathBuf,
}

impl RuntimePaths {
    /// Root the layout at `<cwd>/.toolforge`.
    pub fn resolve(cwd: &Path) -> Self {
        let root_dir = cwd.join(".toolforge");
        Self {
            registry_path: root_dir.join("registry.json"),
            tools_dir: root_dir.join("tools"),
            jobs_dir: root_dir.join("jobs"),
            worktrees_dir: root_dir.join("worktrees"),
            runs_dir: root_dir.join("runs"),
            root_dir,
        }
    }

    /// Create every runtime directory.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root_dir)?;
        std::fs::create_dir_all(&self.tools_dir)?;
        std::fs::create_dir_all(&self.jobs_dir)?;
        std::fs::create_dir_all(&self.worktrees_dir)?;
        std::fs::create_dir_all(&self.runs_dir)?;
        Ok(())
    }
}

/// Exclusive path set owned by one candidate: its stable output directory
/// and every log the pipeline captures for it.
#[derive(Debug, Clone)]
pub struct CandidatePaths {
    pub candidate_id: String,
    pub job_id: String,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub agent_last_message_path: PathBuf,
    pub agent_stdout_path: PathBuf,
    pub agent_stderr_path: PathBuf,
    pub compile_stdout_path: PathBuf,
    pub compile_stderr_path: PathBuf,
    pub smoke_stdout_path: PathBuf,
    pub smoke_stderr_path: PathBuf,
}

impl CandidatePaths {
    /// Lay out (and create) the candidate's directory tree under the job dir.
    pub fn create(job_dir: &Path, job_id: &str, candidate_id: &str) -> std::io::Result<Self> {
        let candidate_dir = job_dir.join(candidate_id);
        let logs_dir = candidate_dir.join("logs");
        let output_dir = candidate_dir.join("output");
        std::fs::create_dir_all(&logs_dir)?;
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            candidate_id: candidate_id.to_string(),
            job_id: job_id.to_string(),
            output_dir,
            agent_last_message_path: logs_dir.join("agent-last-message.txt"),
            agent_stdout_path: logs_dir.join("agent-stdout.log"),
            agent_stderr_path: logs_dir.join("agent-stderr.log"),
            compile_stdout_path: logs_dir.join("compile-stdout.log"),
            compile_stderr_path: logs_dir.join("compile-stderr.log"),
            smoke_stdout_path: logs_dir.join("smoke-stdout.log"),
            smoke_stderr_path: logs_dir.join("smoke-stderr.log"),
            logs_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_roots_under_dot_toolforge() {
        let paths = RuntimePaths::resolve(Path::new("/work/project"));
        assert_eq!(paths.root_dir, Path::new("/work/project/.toolforge"));
        assert_eq!(
            paths.registry_path,
            Path::new("/work/project/.toolforge/registry.json")
        );
        assert!(paths.jobs_dir.starts_with(&paths.root_dir));
    }

    #[test]
    fn ensure_creates_all_directories() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::resolve(dir.path());
        paths.ensure().unwrap();
        for p in [
            &paths.root_dir,
            &paths.tools_dir,
            &paths.jobs_dir,
            &paths.worktrees_dir,
            &paths.runs_dir,
        ] {
            assert!(p.is_dir(), "missing {p:?}");
        }
    }

    #[test]
    fn candidate_paths_are_exclusive_per_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let a = CandidatePaths::create(dir.path(), "job-1", "candidate-1").unwrap();
        let b = CandidatePaths::create(dir.path(), "job-1", "candidate-2").unwrap();
        assert_ne!(a.output_dir, b.output_dir);
        assert_ne!(a.agent_stdout_path, b.agent_stdout_path);
        assert!(a.output_dir.is_dir());
        assert!(a.logs_dir.is_dir());
    }
}
