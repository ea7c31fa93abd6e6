//! Generation agent execution: retries, model fallback, heartbeats.
//!
//! The retry logic is a small state machine over (model index, attempt
//! count, remaining budget), implemented as an explicit loop over an
//! enumerated model list with a bounded counter so termination is obvious.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::failure::{classify_failure, FailureKind};
use crate::domain::settings::GenerationSettings;
use crate::paths::CandidatePaths;
use crate::process::{run_command, CommandOutput, RunOptions};
use crate::progress::{ProgressEvent, ProgressPhase, SharedProgress};

/// Seconds between heartbeat events while the agent runs.
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// Backoff before a retried attempt: proportional to the attempt number,
/// capped at a few seconds.
const BACKOFF_UNIT_MS: u64 = 1_000;
const BACKOFF_CAP_MS: u64 = 4_000;

/// Final outcome of a candidate's agent execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Last observed process result; synthetic if nothing ever spawned.
    pub result: CommandOutput,

    /// Agent invocations consumed across retries and fallbacks.
    pub attempts: u32,

    /// Classification of the final result.
    pub failure: FailureKind,
}

/// Periodic progress ticker scoped to a single agent invocation.
///
/// The tick task is aborted unconditionally on drop, whether the invocation
/// completed or failed.
struct HeartbeatGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl HeartbeatGuard {
    fn start(sink: SharedProgress, job_id: String, candidate_id: String) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEARTBEAT_PERIOD);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                sink.emit(ProgressEvent::candidate(
                    ProgressPhase::CandidateAgentHeartbeat,
                    &job_id,
                    &candidate_id,
                    format!("{candidate_id}: still generating..."),
                ));
            }
        });
        Self { handle }
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub(crate) fn backoff_delay_ms(attempt: u32) -> u64 {
    (BACKOFF_UNIT_MS * u64::from(attempt)).min(BACKOFF_CAP_MS)
}

/// Run the generation agent against one isolated workspace.
///
/// Models are tried in ranked order. A `model_not_found` failure advances
/// the model list without consuming retry budget; retriable failures
/// (`unsupported_value`, `timeout`, `transient`) consume budget and back
/// off before retrying the same model; anything else, or exhaustion, stops
/// with the last observed result. Success short-circuits immediately.
pub async fn run_generation_agent(
    settings: &GenerationSettings,
    workspace_dir: &Path,
    paths: &CandidatePaths,
    prompt: &str,
    sink: SharedProgress,
) -> ExecutionOutcome {
    let models = settings.ranked_models();
    let output_dir = workspace_dir.join(crate::paths::WORKSPACE_OUTPUT_DIR);

    let _heartbeat = HeartbeatGuard::start(
        sink.clone(),
        paths.job_id.clone(),
        paths.candidate_id.clone(),
    );

    let mut budget = settings.retry_budget;
    let mut attempts = 0u32;
    let mut last_result: Option<CommandOutput> = None;
    let mut last_failure = FailureKind::Unknown;

    'models: for model in &models {
        loop {
            attempts += 1;
            let args = agent_args(model, workspace_dir, &output_dir, paths, prompt);
            let result = match run_command(
                &settings.agent_binary,
                &args,
                RunOptions {
                    cwd: Some(workspace_dir.to_path_buf()),
                    timeout_ms: Some(settings.agent_timeout_ms),
                    ..Default::default()
                },
            )
            .await
            {
                Ok(result) => result,
                Err(e) => CommandOutput::synthetic_failure(
                    &settings.agent_binary,
                    &args,
                    &format!("failed to spawn generation agent: {e}"),
                ),
            };

            if result.exit_code == 0 && !result.timed_out {
                return ExecutionOutcome {
                    result,
                    attempts,
                    failure: FailureKind::None,
                };
            }

            let failure = classify_failure(&result);
            last_failure = failure;
            last_result = Some(result);

            match failure {
                FailureKind::ModelNotFound => {
                    sink.emit(ProgressEvent::candidate(
                        ProgressPhase::CandidateRetry,
                        &paths.job_id,
                        &paths.candidate_id,
                        format!("{}: model {model} unavailable, trying next", paths.candidate_id),
                    ));
                    info!(candidate = %paths.candidate_id, model = %model, "model unavailable, advancing list");
                    continue 'models;
                }
                kind if kind.is_retriable() && budget > 0 => {
                    budget -= 1;
                    let delay = backoff_delay_ms(attempts);
                    sink.emit(ProgressEvent::candidate(
                        ProgressPhase::CandidateRetry,
                        &paths.job_id,
                        &paths.candidate_id,
                        format!(
                            "{}: {kind} failure, retrying in {delay}ms ({budget} retries left)",
                            paths.candidate_id
                        ),
                    ));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                _ => {
                    warn!(
                        candidate = %paths.candidate_id,
                        model = %model,
                        failure = %failure,
                        "agent attempt ended without retry"
                    );
                    break 'models;
                }
            }
        }
    }

    let result = last_result.unwrap_or_else(|| {
        CommandOutput::synthetic_failure(
            &settings.agent_binary,
            &[],
            "generation agent never produced a result",
        )
    });

    ExecutionOutcome {
        result,
        attempts,
        failure: last_failure,
    }
}

fn agent_args(
    model: &str,
    workspace_dir: &Path,
    output_dir: &Path,
    paths: &CandidatePaths,
    prompt: &str,
) -> Vec<String> {
    vec![
        "exec".to_string(),
        "--model".to_string(),
        model.to_string(),
        "--dangerously-bypass-approvals-and-sandbox".to_string(),
        "--cd".to_string(),
        workspace_dir.to_string_lossy().to_string(),
        "--add-dir".to_string(),
        output_dir.to_string_lossy().to_string(),
        "--output-last-message".to_string(),
        paths.agent_last_message_path.to_string_lossy().to_string(),
        prompt.to_string(),
    ]
}
