//! Domain-level error taxonomy for the orchestrator.

use std::path::PathBuf;

use crate::domain::evaluation::CandidateEvaluation;

/// Orchestrator errors.
///
/// Candidate-level failures never surface here: they are caught at the
/// candidate boundary and folded into an invalid `CandidateEvaluation`.
/// `NoValidCandidate` is the only failure a job reports upward.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("workspace isolation failed for {candidate_id}: {message}")]
    Isolation {
        candidate_id: String,
        message: String,
    },

    #[error("could not resolve git repository root from {cwd}")]
    RepoRootNotFound { cwd: PathBuf },

    #[error("selected candidate is missing entrypoint: {path}")]
    MissingEntrypoint { path: PathBuf },

    #[error("no valid candidate produced a runnable tool for job {job_id}")]
    NoValidCandidate {
        job_id: String,
        job_dir: PathBuf,
        candidates: Vec<CandidateEvaluation>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] toolforge_registry::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Per-candidate diagnostics for a failed job, one line each.
    pub fn candidate_details(&self) -> Option<String> {
        match self {
            GenerationError::NoValidCandidate { candidates, .. } => Some(
                candidates
                    .iter()
                    .map(|c| format!("{}: score={} ({})", c.candidate_id, c.score, c.summary))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        }
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_valid_candidate_lists_every_candidate() {
        let err = GenerationError::NoValidCandidate {
            job_id: "job-1".to_string(),
            job_dir: PathBuf::from("/tmp/job-1"),
            candidates: vec![
                CandidateEvaluation::crashed("candidate-1", PathBuf::from("/tmp/c1"), 1200, 1),
                CandidateEvaluation::crashed("candidate-2", PathBuf::from("/tmp/c2"), 800, 2),
            ],
        };

        let details = err.candidate_details().unwrap();
        assert!(details.contains("candidate-1"));
        assert!(details.contains("candidate-2"));
        assert!(details.contains("score=-999"));
    }

    #[test]
    fn isolation_error_carries_diagnostics() {
        let err = GenerationError::Isolation {
            candidate_id: "candidate-3".to_string(),
            message: "fatal: not a git repository".to_string(),
        };
        assert!(err.to_string().contains("candidate-3"));
        assert!(err.to_string().contains("not a git repository"));
    }
}
