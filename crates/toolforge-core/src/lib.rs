//! Toolforge Core Library
//!
//! The generation orchestrator: turns a natural-language request into a
//! runnable small program by racing independent generation attempts against
//! an external coding agent, validating each attempt, and promoting the
//! best one into the versioned tool store.

pub mod artifacts;
pub mod config;
pub mod domain;
pub mod evaluator;
pub mod executor;
pub mod job;
pub mod paths;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod scheduler;
pub mod telemetry;
pub mod worktree;

pub use artifacts::{sync_candidate_artifacts, ArtifactSource, EXPECTED_FILES};
pub use config::{settings_from_env, settings_from_vars};
pub use domain::{
    classify_failure, derive_fallback_tool_name, normalize_manifest, sanitize_tool_name,
    CandidateEvaluation, CandidateLogs, FailureKind, GenerationError, GenerationRequest,
    GenerationSettings, Result, SchedulerStrategy, ToolArgument, ToolManifest,
};
pub use evaluator::{evaluate_candidate, score_candidate, ScoreBreakdown, ScoreInput};
pub use executor::{run_generation_agent, ExecutionOutcome};
pub use job::{
    generate_tool, select_best_candidate, GenerationOutcome, OrchestratorContext,
};
pub use paths::{CandidatePaths, RuntimePaths};
pub use process::{run_command, CommandOutput, RunOptions};
pub use progress::{
    ChannelProgress, NullProgress, ProgressEvent, ProgressPhase, ProgressSink, SharedProgress,
    TracingProgress,
};
pub use scheduler::{is_early_stop_candidate, run_candidates, CandidateRunner};
pub use telemetry::init_tracing;
pub use worktree::{resolve_repo_root, WorktreeHandle, WorktreeManager};

/// Toolforge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
