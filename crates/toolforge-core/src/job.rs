//! Job controller: drives the scheduler, selects a winner, promotes it.
//!
//! One `GenerationJob` is created per end-user request. Candidates run
//! through isolate → execute → locate → evaluate pipelines owned by this
//! module; the scheduler decides how many run and when. Exactly one
//! candidate is promoted per successful job, and the registry is written
//! once, from this task, after all candidates have finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use toolforge_registry::{NewToolVersion, ToolRegistry};

use crate::artifacts::sync_candidate_artifacts;
use crate::domain::error::{GenerationError, Result};
use crate::domain::evaluation::CandidateEvaluation;
use crate::domain::manifest::{
    derive_fallback_tool_name, ToolManifest, FALLBACK_TOOL_NAME,
};
use crate::domain::settings::{GenerationRequest, GenerationSettings};
use crate::evaluator::evaluate_candidate;
use crate::executor::run_generation_agent;
use crate::paths::{CandidatePaths, RuntimePaths, WORKSPACE_OUTPUT_DIR};
use crate::progress::{ProgressEvent, ProgressPhase, SharedProgress};
use crate::prompt::{build_agent_prompt, PromptInput};
use crate::scheduler::{run_candidates, CandidateRunner};
use crate::worktree::WorktreeManager;

/// Everything a job needs to know about its environment.
#[derive(Debug, Clone)]
pub struct OrchestratorContext {
    pub paths: RuntimePaths,
    pub repo_root: PathBuf,
}

/// Result of a successful generation job.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub job_id: String,
    pub job_dir: PathBuf,
    pub tool_name: String,
    pub version: u32,
    pub code_path: PathBuf,
    pub tool_version_id: toolforge_registry::VersionId,
    pub selected: CandidateEvaluation,
    pub candidates: Vec<CandidateEvaluation>,
}

/// Machine-readable per-job summary persisted as `selection.json`.
#[derive(Debug, Serialize, Deserialize)]
struct SelectionSummary {
    job_id: String,
    request_digest: String,
    selected_candidate: String,
    selected_score: i64,
    candidates: Vec<CandidateSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CandidateSummary {
    candidate_id: String,
    score: i64,
    summary: String,
    is_valid: bool,
    attempts: u32,
    failure: crate::domain::failure::FailureKind,
}

/// Run one full generation job: schedule candidates, select the best valid
/// one, promote it into the versioned tool store.
pub async fn generate_tool(
    request: &GenerationRequest,
    settings: &GenerationSettings,
    context: &OrchestratorContext,
    registry: &dyn ToolRegistry,
    sink: SharedProgress,
) -> Result<GenerationOutcome> {
    let job_id = create_job_id();
    let job_dir = context.paths.jobs_dir.join(&job_id);
    std::fs::create_dir_all(&job_dir)?;

    sink.emit(ProgressEvent::job(
        ProgressPhase::JobStarted,
        &job_id,
        format!("Created generation job {job_id}"),
    ));

    let pipeline = Arc::new(CandidatePipeline {
        job_id: job_id.clone(),
        job_dir: job_dir.clone(),
        request: request.clone(),
        settings: settings.clone(),
        worktrees: WorktreeManager::new(&context.repo_root, &context.paths.worktrees_dir),
        sink: sink.clone(),
    });

    let candidates = run_candidates(settings, &job_id, pipeline, sink.clone()).await;

    let Some(selected) = select_best_candidate(&candidates) else {
        return Err(GenerationError::NoValidCandidate {
            job_id,
            job_dir,
            candidates,
        });
    };
    let selected = selected.clone();

    sink.emit(ProgressEvent::job(
        ProgressPhase::SelectionComplete,
        &job_id,
        format!(
            "Selected {} with score={}",
            selected.candidate_id, selected.score
        ),
    ));

    let manifest = selected
        .manifest
        .clone()
        .unwrap_or_else(|| ToolManifest::fallback(&request.intent));
    let tool_name = if manifest.name == FALLBACK_TOOL_NAME {
        derive_fallback_tool_name(&request.intent)
    } else {
        manifest.name.clone()
    };

    let version = registry.next_version(&tool_name).await?;
    let install_dir = context
        .paths
        .tools_dir
        .join(&tool_name)
        .join(format!("v{version}"));
    if install_dir.exists() {
        std::fs::remove_dir_all(&install_dir)?;
    }
    copy_dir_recursive(&selected.output_dir, &install_dir)?;

    let entrypoint = install_dir.join(&manifest.entrypoint);
    if !entrypoint.is_file() {
        return Err(GenerationError::MissingEntrypoint { path: entrypoint });
    }

    let code_path = entrypoint
        .strip_prefix(&context.paths.root_dir)
        .unwrap_or(&entrypoint)
        .to_path_buf();

    let tool_version_id = registry
        .upsert_tool_version(NewToolVersion {
            name: tool_name.clone(),
            version,
            manifest: serde_json::to_value(&manifest)?,
            code_path: code_path.to_string_lossy().to_string(),
            score: Some(selected.score),
        })
        .await?;

    write_selection_summary(&job_dir, &job_id, request, settings, &selected, &candidates)?;

    info!(
        job_id = %job_id,
        tool = %tool_name,
        version,
        "promotion complete"
    );
    sink.emit(ProgressEvent::job(
        ProgressPhase::PromotionComplete,
        &job_id,
        format!("Promoted {tool_name} v{version}"),
    ));

    Ok(GenerationOutcome {
        job_id,
        job_dir,
        tool_name,
        version,
        code_path: entrypoint,
        tool_version_id,
        selected,
        candidates,
    })
}

/// Highest score wins; ties break toward the faster candidate. Only valid
/// candidates are considered.
pub fn select_best_candidate(
    candidates: &[CandidateEvaluation],
) -> Option<&CandidateEvaluation> {
    let mut valid: Vec<&CandidateEvaluation> = candidates.iter().filter(|c| c.is_valid).collect();
    valid.sort_by(|a, b| b.score.cmp(&a.score).then(a.elapsed_ms.cmp(&b.elapsed_ms)));
    valid.first().copied()
}

/// Per-candidate pipeline, shared by both scheduler strategies.
struct CandidatePipeline {
    job_id: String,
    job_dir: PathBuf,
    request: GenerationRequest,
    settings: GenerationSettings,
    worktrees: WorktreeManager,
    sink: SharedProgress,
}

#[async_trait::async_trait]
impl CandidateRunner for CandidatePipeline {
    async fn run_candidate(&self, index: u32) -> CandidateEvaluation {
        let candidate_id = format!("candidate-{index}");
        let start = Instant::now();

        let paths = match CandidatePaths::create(&self.job_dir, &self.job_id, &candidate_id) {
            Ok(paths) => paths,
            Err(e) => {
                self.emit_failed(&candidate_id, &format!("could not create directories: {e}"));
                return CandidateEvaluation::crashed(
                    candidate_id,
                    self.job_dir.clone(),
                    start.elapsed().as_millis() as u64,
                    0,
                );
            }
        };

        match self.run_pipeline(&candidate_id, &paths, start).await {
            Ok(evaluation) => {
                self.sink.emit(ProgressEvent::candidate(
                    ProgressPhase::CandidateFinished,
                    &self.job_id,
                    &candidate_id,
                    format!(
                        "{candidate_id}: score={} ({})",
                        evaluation.score, evaluation.summary
                    ),
                ));
                evaluation
            }
            Err(e) => {
                self.record_crash(&paths, &e);
                self.emit_failed(&candidate_id, "crashed before completion");
                let mut eval = CandidateEvaluation::crashed(
                    candidate_id,
                    paths.output_dir.clone(),
                    start.elapsed().as_millis() as u64,
                    0,
                );
                eval.logs.agent_stdout_path = paths.agent_stdout_path.clone();
                eval.logs.agent_stderr_path = paths.agent_stderr_path.clone();
                eval
            }
        }
    }
}

impl CandidatePipeline {
    async fn run_pipeline(
        &self,
        candidate_id: &str,
        paths: &CandidatePaths,
        start: Instant,
    ) -> Result<CandidateEvaluation> {
        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateStarted,
            &self.job_id,
            candidate_id,
            format!("{candidate_id}: creating isolated workspace"),
        ));

        let workspace = self.worktrees.acquire(&self.job_id, candidate_id).await?;
        let result = self
            .run_in_workspace(candidate_id, paths, workspace.path(), start)
            .await;

        if !self.settings.keep_workspaces {
            self.worktrees.release(workspace).await;
        }

        result
    }

    async fn run_in_workspace(
        &self,
        candidate_id: &str,
        paths: &CandidatePaths,
        workspace_dir: &Path,
        start: Instant,
    ) -> Result<CandidateEvaluation> {
        let output_dir = workspace_dir.join(WORKSPACE_OUTPUT_DIR);
        let prompt = build_agent_prompt(&PromptInput {
            intent: &self.request.intent,
            clarification: self.request.clarification.as_deref(),
            output_dir: &output_dir,
            candidate_id,
        });

        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateAgentRunning,
            &self.job_id,
            candidate_id,
            format!("{candidate_id}: running generation agent"),
        ));

        let outcome = run_generation_agent(
            &self.settings,
            workspace_dir,
            paths,
            &prompt,
            self.sink.clone(),
        )
        .await;

        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateAgentFinished,
            &self.job_id,
            candidate_id,
            format!(
                "{candidate_id}: agent finished with exit={}",
                outcome.result.exit_code
            ),
        ));

        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateEvaluating,
            &self.job_id,
            candidate_id,
            format!("{candidate_id}: collecting generated files and running validation"),
        ));

        let source = sync_candidate_artifacts(
            &paths.output_dir,
            workspace_dir,
            &self.job_id,
            candidate_id,
        )?;
        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateEvaluating,
            &self.job_id,
            candidate_id,
            format!("{candidate_id}: artifacts source={}", source.describe()),
        ));

        let evaluation = evaluate_candidate(
            paths,
            &self.request.intent,
            &outcome.result,
            start.elapsed().as_millis() as u64,
            outcome.attempts,
            outcome.failure,
        )
        .await?;

        Ok(evaluation)
    }

    /// Leave a diagnosable trail for a candidate that died mid-pipeline.
    fn record_crash(&self, paths: &CandidatePaths, error: &GenerationError) {
        let _ = std::fs::write(&paths.agent_stderr_path, error.to_string());
        let _ = std::fs::write(&paths.agent_stdout_path, "");
        let _ = std::fs::write(&paths.compile_stdout_path, "");
        let _ = std::fs::write(
            &paths.compile_stderr_path,
            "Not executed due to candidate failure",
        );
        let _ = std::fs::write(&paths.smoke_stdout_path, "");
        let _ = std::fs::write(
            &paths.smoke_stderr_path,
            "Not executed due to candidate failure",
        );
    }

    fn emit_failed(&self, candidate_id: &str, message: &str) {
        self.sink.emit(ProgressEvent::candidate(
            ProgressPhase::CandidateFailed,
            &self.job_id,
            candidate_id,
            format!("{candidate_id}: {message}"),
        ));
    }
}

fn create_job_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let entropy = uuid::Uuid::new_v4().simple().to_string();
    format!("job-{timestamp}-{}", &entropy[..6])
}

fn request_digest(request: &GenerationRequest, settings: &GenerationSettings) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.intent.as_bytes());
    hasher.update(b"\0");
    hasher.update(request.clarification.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"\0");
    if let Ok(raw) = serde_json::to_vec(settings) {
        hasher.update(&raw);
    }
    hex::encode(hasher.finalize())
}

fn write_selection_summary(
    job_dir: &Path,
    job_id: &str,
    request: &GenerationRequest,
    settings: &GenerationSettings,
    selected: &CandidateEvaluation,
    candidates: &[CandidateEvaluation],
) -> Result<()> {
    let summary = SelectionSummary {
        job_id: job_id.to_string(),
        request_digest: request_digest(request, settings),
        selected_candidate: selected.candidate_id.clone(),
        selected_score: selected.score,
        candidates: candidates
            .iter()
            .map(|c| CandidateSummary {
                candidate_id: c.candidate_id.clone(),
                score: c.score,
                summary: c.summary.clone(),
                is_valid: c.is_valid,
                attempts: c.attempts,
                failure: c.failure,
            })
            .collect(),
    };
    let raw = serde_json::to_string_pretty(&summary)?;
    std::fs::write(job_dir.join("selection.json"), raw)?;
    Ok(())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
