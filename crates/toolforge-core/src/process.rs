//! Timeout-bounded subprocess execution with full output capture.
//!
//! Every external command the orchestrator runs (worktree checkouts, the
//! generation agent, compile checks, smoke tests) goes through
//! [`run_command`], so timeout and capture semantics are identical at every
//! suspension point.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Options for a single subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory; the process inherits the current one when unset.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables layered over the inherited environment.
    pub env: HashMap<String, String>,

    /// Kill the process after this many milliseconds; 0 or unset disables.
    pub timeout_ms: Option<u64>,

    /// Bytes written to the child's stdin before it is closed.
    pub stdin: Option<String>,
}

/// Captured result of a finished (or killed) subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    /// -1 when the process was killed by a signal (including our timeout).
    pub exit_code: i32,

    /// True when the configured timeout expired before the process exited.
    pub timed_out: bool,

    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited cleanly.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// Result standing in for a subprocess that never ran. Downstream code
    /// always receives a `CommandOutput`, even when spawning itself failed.
    pub fn synthetic_failure(program: &str, args: &[String], message: &str) -> Self {
        let now = Utc::now();
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: PathBuf::new(),
            started_at: now,
            ended_at: now,
            exit_code: -1,
            timed_out: false,
            stdout: String::new(),
            stderr: message.to_string(),
        }
    }
}

/// Run `program` with `args`, capturing stdout/stderr, bounded by the
/// configured timeout. On expiry the child is killed and the partial capture
/// is returned with `timed_out` set.
pub async fn run_command(
    program: &str,
    args: &[String],
    options: RunOptions,
) -> std::io::Result<CommandOutput> {
    let cwd = options
        .cwd
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let started_at = Utc::now();

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(&cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, value) in &options.env {
        command.env(key, value);
    }

    let mut child = command.spawn()?;

    if let Some(input) = &options.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await?;
        }
    }
    drop(child.stdin.take());

    let timeout = options.timeout_ms.filter(|ms| *ms > 0);
    let (output, timed_out) = match timeout {
        Some(ms) => {
            match tokio::time::timeout(Duration::from_millis(ms), child.wait_with_output()).await {
                Ok(output) => (output?, false),
                Err(_) => {
                    // wait_with_output consumed the child; respawn-free
                    // handling relies on kill_on_drop having terminated it.
                    let now = Utc::now();
                    return Ok(CommandOutput {
                        program: program.to_string(),
                        args: args.to_vec(),
                        cwd,
                        started_at,
                        ended_at: now,
                        exit_code: -1,
                        timed_out: true,
                        stdout: String::new(),
                        stderr: String::new(),
                    });
                }
            }
        }
        None => (child.wait_with_output().await?, false),
    };

    Ok(CommandOutput {
        program: program.to_string(),
        args: args.to_vec(),
        cwd,
        started_at,
        ended_at: Utc::now(),
        exit_code: output.status.code().unwrap_or(-1),
        timed_out,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let result = run_command("echo", &["hello".to_string()], RunOptions::default())
            .await
            .unwrap();
        assert!(result.success());
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_captured() {
        let result = run_command("false", &[], RunOptions::default())
            .await
            .unwrap();
        assert!(!result.success());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn timeout_marks_result_and_kills_process() {
        let options = RunOptions {
            timeout_ms: Some(200),
            ..Default::default()
        };
        let result = run_command("sleep", &["5".to_string()], options)
            .await
            .unwrap();
        assert!(result.timed_out);
        assert!(!result.success());
        assert_eq!(result.exit_code, -1);
    }

    #[tokio::test]
    async fn stdin_is_forwarded() {
        let options = RunOptions {
            stdin: Some("ping\n".to_string()),
            ..Default::default()
        };
        let result = run_command("cat", &[], options).await.unwrap();
        assert_eq!(result.stdout, "ping\n");
    }

    #[tokio::test]
    async fn env_overlay_reaches_child() {
        let mut env = HashMap::new();
        env.insert("TOOLFORGE_TEST_MARK".to_string(), "42".to_string());
        let options = RunOptions {
            env,
            ..Default::default()
        };
        let result = run_command(
            "sh",
            &["-c".to_string(), "echo $TOOLFORGE_TEST_MARK".to_string()],
            options,
        )
        .await
        .unwrap();
        assert_eq!(result.stdout.trim(), "42");
    }

    #[test]
    fn synthetic_failure_never_succeeds() {
        let result =
            CommandOutput::synthetic_failure("codex", &["exec".to_string()], "spawn failed");
        assert!(!result.success());
        assert_eq!(result.exit_code, -1);
        assert!(result.stderr.contains("spawn failed"));
    }
}
