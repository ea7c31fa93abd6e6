//! Failure taxonomy for generation-agent execution.

use serde::{Deserialize, Serialize};

use crate::process::CommandOutput;

/// Classification of an agent invocation's outcome.
///
/// Drives the executor's retry decisions: `ModelNotFound` advances the model
/// list without consuming retry budget, `UnsupportedValue`/`Timeout`/
/// `Transient` are retriable against the budget, `Unknown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    None,
    ModelNotFound,
    UnsupportedValue,
    Timeout,
    Transient,
    Unknown,
}

impl FailureKind {
    /// Whether this kind consumes retry budget when retried.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            FailureKind::UnsupportedValue | FailureKind::Timeout | FailureKind::Transient
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::None => "none",
            FailureKind::ModelNotFound => "model_not_found",
            FailureKind::UnsupportedValue => "unsupported_value",
            FailureKind::Timeout => "timeout",
            FailureKind::Transient => "transient",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a finished agent invocation. Deterministic over the captured
/// output: a timed-out process is always `Timeout` no matter what it printed.
pub fn classify_failure(result: &CommandOutput) -> FailureKind {
    if result.exit_code == 0 {
        return FailureKind::None;
    }
    if result.timed_out {
        return FailureKind::Timeout;
    }

    let combined = format!("{}\n{}", result.stderr, result.stdout).to_lowercase();

    if combined.contains("model_not_found") || combined.contains("does not exist") {
        return FailureKind::ModelNotFound;
    }
    if combined.contains("unsupported value")
        || (combined.contains("unsupported") && combined.contains("reasoning"))
    {
        return FailureKind::UnsupportedValue;
    }
    if combined.contains("429")
        || combined.contains("rate limit")
        || combined.contains("connection reset")
        || combined.contains("network error")
        || combined.contains("connection refused")
    {
        return FailureKind::Transient;
    }

    FailureKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, timed_out: bool, stderr: &str, stdout: &str) -> CommandOutput {
        let now = chrono::Utc::now();
        CommandOutput {
            program: "codex".to_string(),
            args: vec!["exec".to_string()],
            cwd: std::path::PathBuf::new(),
            started_at: now,
            ended_at: now,
            exit_code,
            timed_out,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn exit_zero_is_none() {
        assert_eq!(
            classify_failure(&output(0, false, "anything", "")),
            FailureKind::None
        );
    }

    #[test]
    fn timeout_wins_over_message_text() {
        let result = output(1, true, "model_not_found", "");
        assert_eq!(classify_failure(&result), FailureKind::Timeout);
    }

    #[test]
    fn missing_model_messages() {
        assert_eq!(
            classify_failure(&output(1, false, "error: model_not_found", "")),
            FailureKind::ModelNotFound
        );
        assert_eq!(
            classify_failure(&output(1, false, "", "The model `o9` does not exist")),
            FailureKind::ModelNotFound
        );
    }

    #[test]
    fn unsupported_reasoning_effort() {
        let result = output(
            1,
            false,
            "error: unsupported value for reasoning.effort: 'maximal'",
            "",
        );
        assert_eq!(classify_failure(&result), FailureKind::UnsupportedValue);
    }

    #[test]
    fn rate_limits_and_network_are_transient() {
        assert_eq!(
            classify_failure(&output(1, false, "HTTP 429 Too Many Requests", "")),
            FailureKind::Transient
        );
        assert_eq!(
            classify_failure(&output(1, false, "Rate limit exceeded, retry later", "")),
            FailureKind::Transient
        );
        assert_eq!(
            classify_failure(&output(1, false, "connection reset by peer", "")),
            FailureKind::Transient
        );
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(
            classify_failure(&output(1, false, "panic: something odd", "")),
            FailureKind::Unknown
        );
    }

    #[test]
    fn retriable_kinds() {
        assert!(FailureKind::Timeout.is_retriable());
        assert!(FailureKind::Transient.is_retriable());
        assert!(FailureKind::UnsupportedValue.is_retriable());
        assert!(!FailureKind::ModelNotFound.is_retriable());
        assert!(!FailureKind::Unknown.is_retriable());
        assert!(!FailureKind::None.is_retriable());
    }
}
