//! mend - autonomous code repair CLI
//!
//! ## Commands
//!
//! - `run`: sweep a directory and repair every Python file through the
//!   audit -> fix -> judge self-healing loop
//! - `audit`: analysis-only sweep, no file is modified
//! - `interpret`: parse a captured test-runner output blob and print the
//!   structured summary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use mend_core::{
    init_tracing, render_audit_report, render_mission_summary, write_mission_artifact, Auditor,
    ExecutionSignal, ExperimentLogger, LintScorer, LlmAuditor, LlmClient, LlmConfig, LlmFixer,
    LlmTestGenerator, MissionOrchestrator, PytestExecutor, PytestInterpreter, RepairConfig,
    RepairLoopController, TestOutputInterpreter, TolerancePolicy,
};

#[derive(Parser)]
#[command(name = "mend")]
#[command(author = "Mend Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Autonomous code repair pipeline", long_about = None)]
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
    /// Repair every Python file under a directory
    Run {
        /// Directory containing the files to repair
        #[arg(long)]
        target_dir: PathBuf,

        /// Maximum fix/judge cycles per file
        #[arg(long, default_value_t = 10)]
        max_iterations: u32,

        /// Pass-rate threshold for tolerance acceptance
        #[arg(long, default_value_t = 0.90)]
        pass_rate: f64,

        /// Sample floor reported in tolerance reasons
        #[arg(long, default_value_t = 10)]
        min_sample: u32,

        /// Hard timeout for one test run, in seconds
        #[arg(long, default_value_t = 60)]
        test_timeout: u64,

        /// Chat-completions API key
        #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Model for audit and test generation
        #[arg(long, default_value = "mistral-small-latest")]
        model: String,

        /// Model for fixes
        #[arg(long, default_value = "mistral-large-latest")]
        fixer_model: String,

        /// Directory for mission report artifacts
        #[arg(long, default_value = ".mend/runs")]
        report_dir: PathBuf,

        /// Experiment trace file (JSONL)
        #[arg(long, default_value = ".mend/experiment.jsonl")]
        experiment_log: PathBuf,
    },

    /// Audit every Python file under a directory without modifying anything
    Audit {
        /// Directory containing the files to audit
        #[arg(long)]
        target_dir: PathBuf,

        /// Chat-completions API key
        #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Model for the audit
        #[arg(long, default_value = "mistral-small-latest")]
        model: String,

        /// Experiment trace file (JSONL)
        #[arg(long, default_value = ".mend/experiment.jsonl")]
        experiment_log: PathBuf,
    },

    /// Interpret a captured test-runner output blob
    Interpret {
        /// File holding the raw runner output
        #[arg(long)]
        file: PathBuf,

        /// Treat the run as having hit the wall-clock timeout
        #[arg(long)]
        timed_out: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            target_dir,
            max_iterations,
            pass_rate,
            min_sample,
            test_timeout,
            api_key,
            model,
            fixer_model,
            report_dir,
            experiment_log,
        } => {
            let experiment = Arc::new(ExperimentLogger::new(experiment_log));

            let audit_client = LlmClient::new(LlmConfig::new(api_key.clone()).with_model(model.as_str()))
                .context("audit client")?;
            let fix_client = LlmClient::new(LlmConfig::new(api_key.clone()).with_model(fixer_model.as_str()))
                .context("fix client")?;
            let test_client = LlmClient::new(LlmConfig::new(api_key).with_model(model.as_str()))
                .context("test-generation client")?;

            let controller = RepairLoopController::new(
                Arc::new(LlmAuditor::new(audit_client, Arc::clone(&experiment))),
                Arc::new(LlmFixer::new(fix_client, Arc::clone(&experiment))),
                Arc::new(LlmTestGenerator::new(test_client, Arc::clone(&experiment))),
                Arc::new(
                    PytestExecutor::new(Arc::clone(&experiment))
                        .with_timeout(Duration::from_secs(test_timeout)),
                ),
                Arc::new(PytestInterpreter::new()),
                Arc::new(LintScorer),
                RepairConfig {
                    max_iterations,
                    tolerance: TolerancePolicy {
                        pass_rate_threshold: pass_rate,
                        min_sample_floor: min_sample,
                    },
                },
            );

            let report = MissionOrchestrator::new(controller).run(&target_dir).await;

            let artifact = write_mission_artifact(&report, &report_dir)
                .context("write mission artifact")?;
            info!(artifact = %artifact.display(), "mission artifact written");

            println!("{}", render_mission_summary(&report));

            if !report.success() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Audit {
            target_dir,
            api_key,
            model,
            experiment_log,
        } => {
            let experiment = Arc::new(ExperimentLogger::new(experiment_log));
            let client =
                LlmClient::new(LlmConfig::new(api_key).with_model(model.as_str())).context("audit client")?;
            let auditor = LlmAuditor::new(client, experiment);

            let files = mend_core::sandbox::find_python_files(&target_dir);
            if files.is_empty() {
                anyhow::bail!("no Python files found under {}", target_dir.display());
            }

            let mut analyses = Vec::new();
            for file in files {
                let analysis = auditor
                    .analyze(&file)
                    .await
                    .with_context(|| format!("audit {}", file.display()))?;
                analyses.push((file, analysis));
            }

            println!("{}", render_audit_report(&analyses));
            Ok(())
        }

        Commands::Interpret { file, timed_out } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let signal = if timed_out {
                ExecutionSignal::TimedOut
            } else {
                ExecutionSignal::Completed { exit_code: None }
            };

            let summary = PytestInterpreter::new().interpret(&raw, signal);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}
