//! Candidate validation and scoring.
//!
//! Validation runs whatever checks the located artifacts allow: manifest
//! parse, entrypoint presence, a static compile check, and the candidate's
//! own smoke test. Missing files short-circuit to fixed diagnostics rather
//! than invoking anything. Scoring is a pure function over the check
//! results so it can be tested exhaustively.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::evaluation::{CandidateEvaluation, CandidateLogs};
use crate::domain::failure::FailureKind;
use crate::domain::manifest::{normalize_manifest, ToolManifest};
use crate::paths::CandidatePaths;
use crate::process::{run_command, CommandOutput, RunOptions};

const COMPILE_TIMEOUT_MS: u64 = 20_000;
const SMOKE_TIMEOUT_MS: u64 = 30_000;

/// Environment variables handed to the smoke test.
pub const ENV_TOOL_PATH: &str = "TOOLFORGE_TOOL_PATH";
pub const ENV_MANIFEST_PATH: &str = "TOOLFORGE_MANIFEST_PATH";

/// Inputs to the pure scoring function.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput {
    pub agent_exit_code: i32,
    pub manifest_present: bool,
    pub entrypoint_present: bool,
    pub compile_exit_code: Option<i32>,
    pub smoke_exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

/// Result of scoring one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub score: i64,
    pub is_valid: bool,
    pub summary: String,
}

/// Deterministic additive score over the five checks, with a latency
/// penalty preferring faster candidates. Validity requires every check to
/// pass and is independent of the numeric score.
pub fn score_candidate(input: ScoreInput) -> ScoreBreakdown {
    let mut score = 0i64;
    let mut notes = Vec::with_capacity(5);

    let agent_ok = input.agent_exit_code == 0;
    if agent_ok {
        score += 20;
        notes.push("agent-ok");
    } else {
        score -= 60;
        notes.push("agent-failed");
    }

    if input.manifest_present {
        score += 20;
        notes.push("manifest-ok");
    } else {
        score -= 20;
        notes.push("manifest-missing");
    }

    if input.entrypoint_present {
        score += 25;
        notes.push("entrypoint-ok");
    } else {
        score -= 40;
        notes.push("entrypoint-missing");
    }

    let compile_ok = input.compile_exit_code == Some(0);
    if compile_ok {
        score += 25;
        notes.push("compile-ok");
    } else {
        score -= 30;
        notes.push("compile-failed");
    }

    let smoke_ok = input.smoke_exit_code == Some(0);
    if smoke_ok {
        score += 20;
        notes.push("smoke-ok");
    } else {
        score -= 15;
        notes.push("smoke-failed");
    }

    let latency_penalty = i64::try_from((input.elapsed_ms / 3_000).min(20)).unwrap_or(20);
    score -= latency_penalty;

    let is_valid =
        agent_ok && input.manifest_present && input.entrypoint_present && compile_ok && smoke_ok;

    ScoreBreakdown {
        score,
        is_valid,
        summary: notes.join(","),
    }
}

/// Validate one candidate's located artifacts and produce its evaluation.
pub async fn evaluate_candidate(
    paths: &CandidatePaths,
    intent: &str,
    agent_result: &CommandOutput,
    elapsed_ms: u64,
    attempts: u32,
    failure: FailureKind,
) -> std::io::Result<CandidateEvaluation> {
    std::fs::create_dir_all(&paths.output_dir)?;

    let manifest_path = paths.output_dir.join("manifest.json");
    let tool_path = paths.output_dir.join("tool.py");
    let smoke_path = paths.output_dir.join("smoke_test.py");

    std::fs::write(&paths.agent_stdout_path, &agent_result.stdout)?;
    std::fs::write(&paths.agent_stderr_path, &agent_result.stderr)?;

    // Invalid JSON is treated as an absent manifest, not a fatal error.
    let manifest: Option<ToolManifest> = std::fs::read_to_string(&manifest_path)
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .map(|raw| normalize_manifest(Some(&raw), intent));

    let entrypoint_path = tool_path.is_file().then(|| tool_path.clone());
    let smoke_test_path = smoke_path.is_file().then(|| smoke_path.clone());

    let compile_exit_code = match &entrypoint_path {
        Some(entrypoint) => {
            let result = run_python(
                &[
                    "-m".to_string(),
                    "py_compile".to_string(),
                    entrypoint.to_string_lossy().to_string(),
                ],
                paths,
                HashMap::new(),
                COMPILE_TIMEOUT_MS,
            )
            .await;
            std::fs::write(&paths.compile_stdout_path, &result.stdout)?;
            std::fs::write(&paths.compile_stderr_path, &result.stderr)?;
            Some(result.exit_code)
        }
        None => {
            std::fs::write(&paths.compile_stdout_path, "")?;
            std::fs::write(&paths.compile_stderr_path, "Missing tool.py")?;
            None
        }
    };

    let smoke_exit_code = match &smoke_test_path {
        Some(smoke) => {
            let mut env = HashMap::new();
            env.insert(
                ENV_TOOL_PATH.to_string(),
                entrypoint_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            env.insert(
                ENV_MANIFEST_PATH.to_string(),
                manifest_path.to_string_lossy().to_string(),
            );
            let result = run_python(
                &[smoke.to_string_lossy().to_string()],
                paths,
                env,
                SMOKE_TIMEOUT_MS,
            )
            .await;
            std::fs::write(&paths.smoke_stdout_path, &result.stdout)?;
            std::fs::write(&paths.smoke_stderr_path, &result.stderr)?;
            Some(result.exit_code)
        }
        None => {
            std::fs::write(&paths.smoke_stdout_path, "")?;
            std::fs::write(&paths.smoke_stderr_path, "Missing smoke_test.py")?;
            None
        }
    };

    let breakdown = score_candidate(ScoreInput {
        agent_exit_code: agent_result.exit_code,
        manifest_present: manifest.is_some(),
        entrypoint_present: entrypoint_path.is_some(),
        compile_exit_code,
        smoke_exit_code,
        elapsed_ms,
    });

    debug!(
        candidate = %paths.candidate_id,
        score = breakdown.score,
        valid = breakdown.is_valid,
        summary = %breakdown.summary,
        "candidate evaluated"
    );

    Ok(CandidateEvaluation {
        candidate_id: paths.candidate_id.clone(),
        output_dir: paths.output_dir.clone(),
        manifest,
        entrypoint_path,
        smoke_test_path,
        agent_exit_code: agent_result.exit_code,
        compile_exit_code,
        smoke_exit_code,
        score: breakdown.score,
        is_valid: breakdown.is_valid,
        summary: breakdown.summary,
        elapsed_ms,
        attempts,
        failure,
        logs: CandidateLogs {
            agent_last_message_path: paths.agent_last_message_path.clone(),
            agent_stdout_path: paths.agent_stdout_path.clone(),
            agent_stderr_path: paths.agent_stderr_path.clone(),
            compile_stdout_path: paths.compile_stdout_path.clone(),
            compile_stderr_path: paths.compile_stderr_path.clone(),
            smoke_stdout_path: paths.smoke_stdout_path.clone(),
            smoke_stderr_path: paths.smoke_stderr_path.clone(),
        },
    })
}

async fn run_python(
    args: &[String],
    paths: &CandidatePaths,
    env: HashMap<String, String>,
    timeout_ms: u64,
) -> CommandOutput {
    match run_command(
        "python3",
        args,
        RunOptions {
            cwd: Some(paths.output_dir.clone()),
            env,
            timeout_ms: Some(timeout_ms),
            ..Default::default()
        },
    )
    .await
    {
        Ok(result) => result,
        Err(e) => CommandOutput::synthetic_failure(
            "python3",
            args,
            &format!("failed to spawn python3: {e}"),
        ),
    }
}
