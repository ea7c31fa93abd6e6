//! Environment-derived generator configuration.
//!
//! Values are read from `TOOLFORGE_*` variables with lenient parsing: out of
//! range clamps, garbage falls back to the default. Loading never fails.

use std::collections::HashMap;

use crate::domain::settings::{GenerationSettings, SchedulerStrategy, FALLBACK_MODEL};

const ENV_AGENT_BIN: &str = "TOOLFORGE_AGENT_BIN";
const ENV_AGENT_MODEL: &str = "TOOLFORGE_AGENT_MODEL";
const ENV_CANDIDATES: &str = "TOOLFORGE_CANDIDATES";
const ENV_STRATEGY: &str = "TOOLFORGE_STRATEGY";
const ENV_SCORE_CUTOFF: &str = "TOOLFORGE_SCORE_CUTOFF";
const ENV_RETRY_BUDGET: &str = "TOOLFORGE_RETRY_BUDGET";
const ENV_LAUNCH_DELAY_MS: &str = "TOOLFORGE_LAUNCH_DELAY_MS";
const ENV_AGENT_TIMEOUT_MS: &str = "TOOLFORGE_AGENT_TIMEOUT_MS";
const ENV_KEEP_WORKSPACES: &str = "TOOLFORGE_KEEP_WORKSPACES";

/// Load settings from the process environment.
pub fn settings_from_env() -> GenerationSettings {
    let vars: HashMap<String, String> = std::env::vars().collect();
    settings_from_vars(&vars)
}

/// Load settings from an explicit variable map (testable seam).
pub fn settings_from_vars(vars: &HashMap<String, String>) -> GenerationSettings {
    let defaults = GenerationSettings::default();

    let text = |key: &str, fallback: &str| -> String {
        vars.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .unwrap_or_else(|| fallback.to_string())
    };

    GenerationSettings::clamped(
        text(ENV_AGENT_BIN, &defaults.agent_binary),
        text(ENV_AGENT_MODEL, FALLBACK_MODEL),
        parse_int(vars.get(ENV_CANDIDATES), defaults.candidate_count as i64) as u32,
        SchedulerStrategy::parse_or_default(&text(ENV_STRATEGY, defaults.strategy.as_str())),
        parse_int(vars.get(ENV_SCORE_CUTOFF), defaults.score_cutoff),
        parse_int(vars.get(ENV_RETRY_BUDGET), defaults.retry_budget as i64) as u32,
        parse_int(vars.get(ENV_LAUNCH_DELAY_MS), defaults.launch_delay_ms as i64) as u64,
        parse_int(
            vars.get(ENV_AGENT_TIMEOUT_MS),
            defaults.agent_timeout_ms as i64,
        ) as u64,
        parse_bool(vars.get(ENV_KEEP_WORKSPACES), defaults.keep_workspaces),
    )
}

fn parse_int(raw: Option<&String>, fallback: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(fallback)
}

fn parse_bool(raw: Option<&String>, fallback: bool) -> bool {
    match raw.map(|v| v.trim().to_lowercase()) {
        Some(v) if ["1", "true", "yes", "on"].contains(&v.as_str()) => true,
        Some(v) if ["0", "false", "no", "off"].contains(&v.as_str()) => false,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_env_yields_defaults() {
        let settings = settings_from_vars(&HashMap::new());
        assert_eq!(settings.agent_binary, "codex");
        assert_eq!(settings.agent_model, FALLBACK_MODEL);
        assert_eq!(settings.candidate_count, 2);
        assert_eq!(settings.strategy, SchedulerStrategy::Parallel);
        assert_eq!(settings.score_cutoff, 90);
        assert!(!settings.keep_workspaces);
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let settings = settings_from_vars(&vars(&[
            ("TOOLFORGE_CANDIDATES", "9"),
            ("TOOLFORGE_STRATEGY", "adaptive"),
            ("TOOLFORGE_SCORE_CUTOFF", "120"),
            ("TOOLFORGE_RETRY_BUDGET", "2"),
            ("TOOLFORGE_LAUNCH_DELAY_MS", "99999"),
            ("TOOLFORGE_KEEP_WORKSPACES", "yes"),
        ]));
        assert_eq!(settings.candidate_count, 5);
        assert_eq!(settings.strategy, SchedulerStrategy::Adaptive);
        assert_eq!(settings.score_cutoff, 120);
        assert_eq!(settings.retry_budget, 2);
        assert_eq!(settings.launch_delay_ms, 30_000);
        assert!(settings.keep_workspaces);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let settings = settings_from_vars(&vars(&[
            ("TOOLFORGE_CANDIDATES", "many"),
            ("TOOLFORGE_KEEP_WORKSPACES", "maybe"),
            ("TOOLFORGE_STRATEGY", "chaotic"),
        ]));
        assert_eq!(settings.candidate_count, 2);
        assert!(!settings.keep_workspaces);
        assert_eq!(settings.strategy, SchedulerStrategy::Parallel);
    }
}
