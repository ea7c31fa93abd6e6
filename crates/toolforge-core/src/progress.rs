//! Progress event stream.
//!
//! The orchestrator emits structured lifecycle events to an injected sink
//! and has no dependency on how they are displayed. The channel is one-way
//! and fire-and-forget: sinks must never block the orchestrator, and a
//! dropped consumer is not an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Lifecycle points at which the orchestrator reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressPhase {
    JobStarted,
    SchedulerStarted,
    SchedulerFanout,
    SchedulerEarlyStop,
    SchedulerDrain,
    CandidateStarted,
    CandidateAgentRunning,
    CandidateAgentHeartbeat,
    CandidateAgentFinished,
    CandidateRetry,
    CandidateEvaluating,
    CandidateFinished,
    CandidateFailed,
    SelectionComplete,
    PromotionComplete,
}

impl ProgressPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressPhase::JobStarted => "job-started",
            ProgressPhase::SchedulerStarted => "scheduler-started",
            ProgressPhase::SchedulerFanout => "scheduler-fanout",
            ProgressPhase::SchedulerEarlyStop => "scheduler-early-stop",
            ProgressPhase::SchedulerDrain => "scheduler-drain",
            ProgressPhase::CandidateStarted => "candidate-started",
            ProgressPhase::CandidateAgentRunning => "candidate-agent-running",
            ProgressPhase::CandidateAgentHeartbeat => "candidate-agent-heartbeat",
            ProgressPhase::CandidateAgentFinished => "candidate-agent-finished",
            ProgressPhase::CandidateRetry => "candidate-retry",
            ProgressPhase::CandidateEvaluating => "candidate-evaluating",
            ProgressPhase::CandidateFinished => "candidate-finished",
            ProgressPhase::CandidateFailed => "candidate-failed",
            ProgressPhase::SelectionComplete => "selection-complete",
            ProgressPhase::PromotionComplete => "promotion-complete",
        }
    }
}

/// One progress report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub job_id: String,
    pub candidate_id: Option<String>,
    pub message: String,
}

impl ProgressEvent {
    pub fn job(phase: ProgressPhase, job_id: &str, message: impl Into<String>) -> Self {
        Self {
            phase,
            job_id: job_id.to_string(),
            candidate_id: None,
            message: message.into(),
        }
    }

    pub fn candidate(
        phase: ProgressPhase,
        job_id: &str,
        candidate_id: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            job_id: job_id.to_string(),
            candidate_id: Some(candidate_id.to_string()),
            message: message.into(),
        }
    }
}

/// Observer for progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Shared handle the pipeline passes around.
pub type SharedProgress = Arc<dyn ProgressSink>;

/// Sink that discards every event.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink that logs each event as a structured tracing record.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        info!(
            event = "generation.progress",
            phase = event.phase.as_str(),
            job_id = %event.job_id,
            candidate_id = event.candidate_id.as_deref().unwrap_or(""),
            message = %event.message,
        );
    }
}

/// Sink that forwards events over an unbounded channel. Send failures
/// (receiver dropped) are ignored.
#[derive(Debug)]
pub struct ChannelProgress {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}
