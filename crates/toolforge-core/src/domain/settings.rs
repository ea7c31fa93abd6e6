//! Generation request and settings.

use serde::{Deserialize, Serialize};

/// Universal fallback model, always appended to the ranked model list.
pub const FALLBACK_MODEL: &str = "gpt-5-codex";

pub const MIN_CANDIDATE_COUNT: u32 = 1;
pub const MAX_CANDIDATE_COUNT: u32 = 5;
pub const MIN_SCORE_CUTOFF: i64 = 50;
pub const MAX_SCORE_CUTOFF: i64 = 200;
pub const MAX_RETRY_BUDGET: u32 = 2;
pub const MAX_LAUNCH_DELAY_MS: u64 = 30_000;
pub const MIN_AGENT_TIMEOUT_MS: u64 = 30_000;
pub const MAX_AGENT_TIMEOUT_MS: u64 = 900_000;

/// One end-user generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Natural-language description of the tool to build.
    pub intent: String,

    /// Optional clarification supplied by an upstream collaborator.
    pub clarification: Option<String>,
}

impl GenerationRequest {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            clarification: None,
        }
    }
}

/// How the scheduler launches candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStrategy {
    /// Launch every candidate at once; wait for all.
    Parallel,

    /// Launch one at a time; stop early once a candidate clears the cutoff.
    Adaptive,
}

impl SchedulerStrategy {
    /// Parse a strategy name; anything unrecognized falls back to parallel.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "adaptive" => SchedulerStrategy::Adaptive,
            _ => SchedulerStrategy::Parallel,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchedulerStrategy::Parallel => "parallel",
            SchedulerStrategy::Adaptive => "adaptive",
        }
    }
}

/// Tunable settings for one generation job. Constructed through
/// [`GenerationSettings::clamped`] so every field is inside its documented
/// bound regardless of the source (env, CLI flags, callers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Generation agent binary.
    pub agent_binary: String,

    /// Preferred model; the executor appends the universal fallback.
    pub agent_model: String,

    /// Candidates to launch, clamped to [1, 5].
    pub candidate_count: u32,

    pub strategy: SchedulerStrategy,

    /// Adaptive early-stop threshold, clamped to [50, 200].
    pub score_cutoff: i64,

    /// Retries a candidate may spend on retriable failures, clamped to [0, 2].
    pub retry_budget: u32,

    /// Pause between adaptive launches, clamped to [0, 30000] ms.
    pub launch_delay_ms: u64,

    /// Per-attempt agent timeout, clamped to [30000, 900000] ms.
    pub agent_timeout_ms: u64,

    /// Keep isolated workspaces on disk after the job (debugging aid).
    pub keep_workspaces: bool,
}

impl GenerationSettings {
    /// Build settings with every numeric field clamped into range.
    #[allow(clippy::too_many_arguments)]
    pub fn clamped(
        agent_binary: impl Into<String>,
        agent_model: impl Into<String>,
        candidate_count: u32,
        strategy: SchedulerStrategy,
        score_cutoff: i64,
        retry_budget: u32,
        launch_delay_ms: u64,
        agent_timeout_ms: u64,
        keep_workspaces: bool,
    ) -> Self {
        Self {
            agent_binary: agent_binary.into(),
            agent_model: agent_model.into(),
            candidate_count: candidate_count.clamp(MIN_CANDIDATE_COUNT, MAX_CANDIDATE_COUNT),
            strategy,
            score_cutoff: score_cutoff.clamp(MIN_SCORE_CUTOFF, MAX_SCORE_CUTOFF),
            retry_budget: retry_budget.min(MAX_RETRY_BUDGET),
            launch_delay_ms: launch_delay_ms.min(MAX_LAUNCH_DELAY_MS),
            agent_timeout_ms: agent_timeout_ms.clamp(MIN_AGENT_TIMEOUT_MS, MAX_AGENT_TIMEOUT_MS),
            keep_workspaces,
        }
    }

    /// Ranked model list: configured model first, universal fallback always
    /// present, duplicates removed.
    pub fn ranked_models(&self) -> Vec<String> {
        let mut models = vec![self.agent_model.clone()];
        if self.agent_model != FALLBACK_MODEL {
            models.push(FALLBACK_MODEL.to_string());
        }
        models
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            agent_binary: "codex".to_string(),
            agent_model: FALLBACK_MODEL.to_string(),
            candidate_count: 2,
            strategy: SchedulerStrategy::Parallel,
            score_cutoff: 90,
            retry_budget: 1,
            launch_delay_ms: 0,
            agent_timeout_ms: 240_000,
            keep_workspaces: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_pins_every_bound() {
        let settings = GenerationSettings::clamped(
            "codex",
            "experimental-model",
            99,
            SchedulerStrategy::Adaptive,
            500,
            10,
            120_000,
            5,
            true,
        );
        assert_eq!(settings.candidate_count, MAX_CANDIDATE_COUNT);
        assert_eq!(settings.score_cutoff, MAX_SCORE_CUTOFF);
        assert_eq!(settings.retry_budget, MAX_RETRY_BUDGET);
        assert_eq!(settings.launch_delay_ms, MAX_LAUNCH_DELAY_MS);
        assert_eq!(settings.agent_timeout_ms, MIN_AGENT_TIMEOUT_MS);
        assert!(settings.keep_workspaces);

        let low = GenerationSettings::clamped(
            "codex",
            "m",
            0,
            SchedulerStrategy::Parallel,
            0,
            0,
            0,
            0,
            false,
        );
        assert_eq!(low.candidate_count, MIN_CANDIDATE_COUNT);
        assert_eq!(low.score_cutoff, MIN_SCORE_CUTOFF);
        assert_eq!(low.retry_budget, 0);
    }

    #[test]
    fn ranked_models_dedupe_fallback() {
        let mut settings = GenerationSettings::default();
        settings.agent_model = "custom-model".to_string();
        assert_eq!(
            settings.ranked_models(),
            vec!["custom-model".to_string(), FALLBACK_MODEL.to_string()]
        );

        settings.agent_model = FALLBACK_MODEL.to_string();
        assert_eq!(settings.ranked_models(), vec![FALLBACK_MODEL.to_string()]);
    }

    #[test]
    fn strategy_parsing_defaults_to_parallel() {
        assert_eq!(
            SchedulerStrategy::parse_or_default("adaptive"),
            SchedulerStrategy::Adaptive
        );
        assert_eq!(
            SchedulerStrategy::parse_or_default("ADAPTIVE"),
            SchedulerStrategy::Adaptive
        );
        assert_eq!(
            SchedulerStrategy::parse_or_default("mystery"),
            SchedulerStrategy::Parallel
        );
    }
}
