//! Toolforge CLI
//!
//! The `toolforge` command turns natural-language requests into runnable,
//! versioned tools.
//!
//! ## Commands
//!
//! - `generate`: race candidate generations and promote the best one
//! - `list`: show registered tools
//! - `show`: show a tool's version history
//! - `run`: execute the latest promoted version of a tool

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::Level;

use toolforge_core::{
    generate_tool, resolve_repo_root, settings_from_env, GenerationError, GenerationRequest,
    GenerationSettings, OrchestratorContext, RuntimePaths, SchedulerStrategy, TracingProgress,
};
use toolforge_registry::{FsToolRegistry, RunRecord, ToolRegistry};

#[derive(Parser)]
#[command(name = "toolforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate, version, and run small tools from natural language", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new tool from a natural-language request
    Generate {
        /// What the tool should do
        intent: Vec<String>,

        /// Optional clarification appended to the request
        #[arg(long)]
        clarification: Option<String>,

        /// Candidates to race (1-5)
        #[arg(long, env = "TOOLFORGE_CANDIDATES")]
        candidates: Option<u32>,

        /// Scheduling strategy: parallel or adaptive
        #[arg(long, env = "TOOLFORGE_STRATEGY")]
        strategy: Option<String>,

        /// Adaptive early-stop score cutoff (50-200)
        #[arg(long, env = "TOOLFORGE_SCORE_CUTOFF")]
        cutoff: Option<i64>,

        /// Retries per candidate on retriable agent failures (0-2)
        #[arg(long, env = "TOOLFORGE_RETRY_BUDGET")]
        retries: Option<u32>,

        /// Keep isolated workspaces for debugging
        #[arg(long)]
        keep_workspaces: bool,
    },

    /// List registered tools
    List,

    /// Show a tool's version history
    Show {
        /// Tool name
        name: String,
    },

    /// Run the latest promoted version of a tool
    Run {
        /// Tool name
        name: String,

        /// Arguments passed through to the tool
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    toolforge_core::init_tracing(cli.json, level);

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let paths = RuntimePaths::resolve(&cwd);
    paths.ensure().context("could not create runtime directories")?;
    let registry = FsToolRegistry::open(&paths.registry_path)?;

    match cli.command {
        Commands::Generate {
            intent,
            clarification,
            candidates,
            strategy,
            cutoff,
            retries,
            keep_workspaces,
        } => {
            let intent = intent.join(" ").trim().to_string();
            if intent.is_empty() {
                bail!("describe the tool to generate, e.g. `toolforge generate clean csv files`");
            }

            let base = settings_from_env();
            let settings = GenerationSettings::clamped(
                base.agent_binary,
                base.agent_model,
                candidates.unwrap_or(base.candidate_count),
                strategy
                    .as_deref()
                    .map(SchedulerStrategy::parse_or_default)
                    .unwrap_or(base.strategy),
                cutoff.unwrap_or(base.score_cutoff),
                retries.unwrap_or(base.retry_budget),
                base.launch_delay_ms,
                base.agent_timeout_ms,
                keep_workspaces || base.keep_workspaces,
            );

            let repo_root = resolve_repo_root(&cwd)
                .await
                .context("toolforge must run inside a git repository")?;
            let context = OrchestratorContext {
                paths,
                repo_root,
            };

            let request = GenerationRequest {
                intent,
                clarification,
            };

            match generate_tool(
                &request,
                &settings,
                &context,
                &registry,
                Arc::new(TracingProgress),
            )
            .await
            {
                Ok(outcome) => {
                    println!(
                        "Promoted {} v{} ({} candidates, winner {} score={})",
                        outcome.tool_name,
                        outcome.version,
                        outcome.candidates.len(),
                        outcome.selected.candidate_id,
                        outcome.selected.score
                    );
                    println!("  entrypoint: {}", outcome.code_path.display());
                    println!("  job dir:    {}", outcome.job_dir.display());
                    Ok(())
                }
                Err(err @ GenerationError::NoValidCandidate { .. }) => {
                    eprintln!("{err}");
                    if let Some(details) = err.candidate_details() {
                        eprintln!("{details}");
                    }
                    std::process::exit(1);
                }
                Err(err) => Err(err.into()),
            }
        }

        Commands::List => {
            let tools = registry.list_tools().await?;
            if tools.is_empty() {
                println!("No tools registered yet. Try `toolforge generate ...`");
                return Ok(());
            }
            for tool in tools {
                let last_run = tool
                    .last_run_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:<28} v{:<4} {:<8} last run: {}",
                    tool.name, tool.latest_version, tool.status, last_run
                );
            }
            Ok(())
        }

        Commands::Show { name } => {
            let Some(details) = registry.get_tool(&name).await? else {
                bail!("tool not found: {name}");
            };
            println!("{} (latest v{})", details.name, details.latest_version);
            for version in &details.versions {
                println!(
                    "  v{:<4} score={:<5} {}",
                    version.version,
                    version
                        .score
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    version.code_path
                );
            }
            Ok(())
        }

        Commands::Run { name, args } => {
            let Some(latest) = registry.latest_version(&name).await? else {
                bail!("tool not found: {name}");
            };
            let entrypoint = paths.root_dir.join(&latest.code_path);
            if !entrypoint.is_file() {
                bail!("entrypoint missing on disk: {}", entrypoint.display());
            }

            let started_at = Utc::now();
            let mut run_args = vec![entrypoint.to_string_lossy().to_string()];
            run_args.extend(args.iter().cloned());
            let result = toolforge_core::run_command(
                "python3",
                &run_args,
                toolforge_core::RunOptions::default(),
            )
            .await?;
            let ended_at = Utc::now();

            let log_stem = format!("{name}-{}", started_at.format("%Y%m%d-%H%M%S"));
            let stdout_path = paths.runs_dir.join(format!("{log_stem}-stdout.log"));
            let stderr_path = paths.runs_dir.join(format!("{log_stem}-stderr.log"));
            std::fs::write(&stdout_path, &result.stdout)?;
            std::fs::write(&stderr_path, &result.stderr)?;

            registry
                .record_run(RunRecord {
                    tool_version_id: latest.id,
                    command: "python3".to_string(),
                    args,
                    started_at,
                    ended_at,
                    exit_code: result.exit_code,
                    stdout_path: Some(stdout_path.to_string_lossy().to_string()),
                    stderr_path: Some(stderr_path.to_string_lossy().to_string()),
                })
                .await?;

            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            if result.exit_code != 0 {
                std::process::exit(result.exit_code.max(1));
            }
            Ok(())
        }
    }
}
