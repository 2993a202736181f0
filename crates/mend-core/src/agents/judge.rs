//! Judge-side collaborators: test generation and test execution.
//!
//! Generation writes a pytest suite beside the source file, once per file
//! unless regeneration is forced. Execution runs the suite under a hard
//! wall-clock timeout; the raw output goes to the interpreter untouched.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{info, warn};

use crate::agents::llm::{extract_code_block, LlmClient};
use crate::agents::{TestExecutor, TestGenerator};
use crate::domain::error::{MendError, Result};
use crate::domain::test_report::{ExecutionSignal, TestExecution};
use crate::experiment::{ActionKind, ActionStatus, ExperimentLogger, ExperimentRecord};
use crate::sandbox::{self, DEFAULT_ALLOWED_COMPONENTS};

/// Default wall-clock budget for one test run.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The test file path for a given source file: `test_<name>.py` in the
/// same directory.
pub fn test_file_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "module.py".to_string());
    match source.parent() {
        Some(parent) => parent.join(format!("test_{name}")),
        None => PathBuf::from(format!("test_{name}")),
    }
}

pub struct LlmTestGenerator {
    client: LlmClient,
    experiment: Arc<ExperimentLogger>,
    top_level_name: Regex,
}

impl LlmTestGenerator {
    pub fn new(client: LlmClient, experiment: Arc<ExperimentLogger>) -> Self {
        Self {
            client,
            experiment,
            top_level_name: Regex::new(r"(?m)^(?:def|class)\s+(\w+)")
                .expect("hard-coded pattern is valid"),
        }
    }

    fn build_prompt(&self, file: &Path, content: &str) -> String {
        let module = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "module".to_string());
        let package = file
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        let names: Vec<String> = self
            .top_level_name
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect();
        let import_statement = if names.is_empty() {
            format!("from {package}.{module} import *")
        } else {
            format!("from {package}.{module} import {}", names.join(", "))
        };

        format!(
            "You are a senior QA engineer. Generate an exhaustive pytest suite for the Python \
             module below.\n\n\
             FILE: {file}\n\
             MODULE: {module}\n\
             IMPORT: {import_statement}\n\n\
             SOURCE:\n```python\n{content}\n```\n\n\
             Rules:\n\
             - Test the code's ACTUAL behavior; never invent behavior the source does not have.\n\
             - Cover nominal cases, edge cases (zero, negatives, empty inputs, None), and \
             expected exceptions with pytest.raises().\n\
             - Independent tests, one logical assertion each, descriptive English names \
             (test_<function>_<scenario>).\n\
             - Start the file with:\n\
             ```python\n\
             import pytest\n\
             import sys\n\
             import os\n\
             sys.path.insert(0, os.path.dirname(os.path.dirname(os.path.abspath(__file__))))\n\
             {import_statement}\n\
             ```\n\
             - At least 3 tests per detected function.\n\n\
             Reply with Python code only, runnable as `pytest file.py -v`.",
            file = file.display(),
        )
    }
}

#[async_trait]
impl TestGenerator for LlmTestGenerator {
    async fn generate_tests(&self, file: &Path) -> Result<PathBuf> {
        let content = sandbox::read_file(file).map_err(|e| {
            MendError::TestGenerationFailed(format!("cannot read {}: {e}", file.display()))
        })?;

        let prompt = self.build_prompt(file, &content);
        let target = test_file_path(file);

        let outcome: Result<PathBuf> = async {
            let response = self.client.complete(&prompt).await?;
            let test_code = extract_code_block(&response);
            if test_code.trim().is_empty() {
                return Err(MendError::TestGenerationFailed(
                    "LLM generated empty test code".to_string(),
                ));
            }

            sandbox::write_file(&target, &test_code, DEFAULT_ALLOWED_COMPONENTS)?;
            Ok(target.clone())
        }
        .await;

        let (status, error) = match &outcome {
            Ok(_) => (ActionStatus::Success, None),
            Err(e) => (ActionStatus::Failure, Some(e.to_string())),
        };

        self.experiment.record(ExperimentRecord::new(
            "Judge",
            self.client.model(),
            ActionKind::Generation,
            status,
            serde_json::json!({
                "source_file": file.display().to_string(),
                "test_file": target.display().to_string(),
                "error": error,
            }),
        ));

        match outcome {
            Ok(path) => {
                info!(test_file = %path.display(), "tests generated");
                Ok(path)
            }
            Err(e) => Err(e),
        }
    }
}

/// Runs `pytest <file> -v --tb=short` with a hard timeout.
pub struct PytestExecutor {
    binary: String,
    timeout: Duration,
    experiment: Arc<ExperimentLogger>,
}

impl PytestExecutor {
    pub fn new(experiment: Arc<ExperimentLogger>) -> Self {
        Self {
            binary: "pytest".to_string(),
            timeout: DEFAULT_TEST_TIMEOUT,
            experiment,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl TestExecutor for PytestExecutor {
    async fn run(&self, test_file: &Path) -> Result<TestExecution> {
        // Absolute path avoids cwd-dependent collection behavior.
        let absolute = std::fs::canonicalize(test_file).unwrap_or_else(|_| test_file.to_path_buf());

        let child = Command::new(&self.binary)
            .arg(&absolute)
            .arg("-v")
            .arg("--tb=short")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MendError::ExecutionFailed(format!("{}: {e}", self.binary)))?;

        let execution = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(test_file = %absolute.display(), "test run timed out, process killed");
                TestExecution {
                    raw_output: format!(
                        "test run exceeded the {}s budget and was killed",
                        self.timeout.as_secs()
                    ),
                    signal: ExecutionSignal::TimedOut,
                }
            }
            Ok(waited) => {
                let output = waited.map_err(|e| MendError::ExecutionFailed(e.to_string()))?;
                let mut raw = String::from_utf8_lossy(&output.stdout).to_string();
                raw.push_str(&String::from_utf8_lossy(&output.stderr));
                TestExecution {
                    raw_output: raw,
                    signal: ExecutionSignal::Completed {
                        exit_code: output.status.code(),
                    },
                }
            }
        };

        self.experiment.record(ExperimentRecord::new(
            "Judge",
            "pytest",
            ActionKind::Debug,
            match execution.signal {
                ExecutionSignal::Completed { exit_code: Some(0) } => ActionStatus::Success,
                _ => ActionStatus::Failure,
            },
            serde_json::json!({
                "test_file": absolute.display().to_string(),
                "signal": execution.signal,
            }),
        ));

        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::llm::LlmConfig;

    #[test]
    fn test_test_file_path_sits_beside_source() {
        let path = test_file_path(Path::new("sandbox/pkg/calc.py"));
        assert_eq!(path, Path::new("sandbox/pkg/test_calc.py"));

        let path = test_file_path(Path::new("calc.py"));
        assert_eq!(path, Path::new("test_calc.py"));
    }

    #[test]
    fn test_generation_prompt_names_detected_symbols() {
        let client = LlmClient::new(LlmConfig::new("test-key")).expect("client");
        let generator = LlmTestGenerator::new(client, Arc::new(ExperimentLogger::disabled()));

        let prompt = generator.build_prompt(
            Path::new("sandbox/calc.py"),
            "def add(a, b):\n    return a + b\n\nclass Calc:\n    pass\n",
        );
        assert!(prompt.contains("from sandbox.calc import add, Calc"));
    }

    #[test]
    fn test_generation_prompt_star_import_without_symbols() {
        let client = LlmClient::new(LlmConfig::new("test-key")).expect("client");
        let generator = LlmTestGenerator::new(client, Arc::new(ExperimentLogger::disabled()));

        let prompt = generator.build_prompt(Path::new("sandbox/calc.py"), "x = 1\n");
        assert!(prompt.contains("from sandbox.calc import *"));
    }

    #[tokio::test]
    async fn test_executor_reports_spawn_failure_as_error() {
        let executor = PytestExecutor::new(Arc::new(ExperimentLogger::disabled()))
            .with_binary("definitely-not-pytest");
        let err = executor.run(Path::new("test_nothing.py")).await.unwrap_err();
        assert!(matches!(err, MendError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn test_executor_timeout_reports_signal() {
        // A shell script that hangs stands in for a looping test suite.
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "sleep 5\n").expect("write script");

        let executor = PytestExecutor::new(Arc::new(ExperimentLogger::disabled()))
            .with_binary("sh")
            .with_timeout(Duration::from_millis(50));

        let execution = executor.run(&script).await.expect("execution");
        assert_eq!(execution.signal, ExecutionSignal::TimedOut);
        assert!(execution.raw_output.contains("budget"));
    }

    #[tokio::test]
    async fn test_executor_captures_completed_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("echo.sh");
        std::fs::write(&script, "echo collected 1 item\n").expect("write script");

        let executor =
            PytestExecutor::new(Arc::new(ExperimentLogger::disabled())).with_binary("sh");

        let execution = executor.run(&script).await.expect("execution");
        assert!(matches!(
            execution.signal,
            ExecutionSignal::Completed { exit_code: Some(0) }
        ));
        assert!(execution.raw_output.contains("collected 1 item"));
    }
}
