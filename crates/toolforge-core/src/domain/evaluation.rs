//! Candidate evaluation results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::failure::FailureKind;
use crate::domain::manifest::ToolManifest;

/// Paths to every log captured for one candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateLogs {
    pub agent_last_message_path: PathBuf,
    pub agent_stdout_path: PathBuf,
    pub agent_stderr_path: PathBuf,
    pub compile_stdout_path: PathBuf,
    pub compile_stderr_path: PathBuf,
    pub smoke_stdout_path: PathBuf,
    pub smoke_stderr_path: PathBuf,
}

/// Outcome of one candidate's full pipeline. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    /// Candidate identifier (`candidate-N`, N starting at 1).
    pub candidate_id: String,

    /// Stable directory the located artifacts were copied into.
    pub output_dir: PathBuf,

    /// Normalized manifest, when one was produced and parseable.
    pub manifest: Option<ToolManifest>,

    /// Entrypoint file, when present in the output directory.
    pub entrypoint_path: Option<PathBuf>,

    /// Smoke test file, when present in the output directory.
    pub smoke_test_path: Option<PathBuf>,

    /// Exit code of the generation agent (last attempt).
    pub agent_exit_code: i32,

    /// Exit code of the compile check; `None` when the entrypoint was absent.
    pub compile_exit_code: Option<i32>,

    /// Exit code of the smoke test; `None` when the test file was absent.
    pub smoke_exit_code: Option<i32>,

    /// Additive score (see the evaluator's score table).
    pub score: i64,

    /// True iff agent exit, manifest, entrypoint, compile, and smoke all
    /// succeeded.
    pub is_valid: bool,

    /// Comma-joined pass/fail tags, one per check.
    pub summary: String,

    /// Wall time from candidate start to evaluation.
    pub elapsed_ms: u64,

    /// Agent invocations consumed (retries and model fallbacks included).
    pub attempts: u32,

    /// Classification of the agent's final failure, `None` on success.
    pub failure: FailureKind,

    pub logs: CandidateLogs,
}

impl CandidateEvaluation {
    /// Synthetic evaluation for a candidate whose pipeline crashed before
    /// producing a real one. Always invalid, strongly negative score.
    pub fn crashed(
        candidate_id: impl Into<String>,
        output_dir: PathBuf,
        elapsed_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            output_dir,
            manifest: None,
            entrypoint_path: None,
            smoke_test_path: None,
            agent_exit_code: 1,
            compile_exit_code: None,
            smoke_exit_code: None,
            score: -999,
            is_valid: false,
            summary: "candidate-crashed".to_string(),
            elapsed_ms,
            attempts,
            failure: FailureKind::Unknown,
            logs: CandidateLogs::default(),
        }
    }
}
