//! LLM-backed fix agent.
//!
//! Rewrites the target file to address a list of [`FixInstruction`]s. The
//! rewritten content passes a structural validation before it reaches disk:
//! every pre-existing top-level function/class name must survive, and the
//! file must not shrink by more than half its original line count.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::agents::llm::{extract_code_block, LlmClient};
use crate::agents::Fixer;
use crate::domain::error::{MendError, Result};
use crate::domain::instruction::FixInstruction;
use crate::experiment::{ActionKind, ActionStatus, ExperimentLogger, ExperimentRecord};
use crate::sandbox::{self, DEFAULT_ALLOWED_COMPONENTS};

pub struct LlmFixer {
    client: LlmClient,
    experiment: Arc<ExperimentLogger>,
    top_level_name: Regex,
    allowed_components: Vec<String>,
}

impl LlmFixer {
    pub fn new(client: LlmClient, experiment: Arc<ExperimentLogger>) -> Self {
        Self {
            client,
            experiment,
            top_level_name: Regex::new(r"(?m)^(?:def|class)\s+(\w+)")
                .expect("hard-coded pattern is valid"),
            allowed_components: DEFAULT_ALLOWED_COMPONENTS
                .iter()
                .map(|component| component.to_string())
                .collect(),
        }
    }

    /// Override the path components writes are restricted to.
    pub fn with_allowed_components(mut self, components: Vec<String>) -> Self {
        self.allowed_components = components;
        self
    }

    fn build_prompt(&self, file: &Path, content: &str, issues: &[FixInstruction]) -> String {
        let issue_list: String = issues
            .iter()
            .map(|issue| {
                format!(
                    "- L{}: {} (suggestion: {})\n",
                    issue.line, issue.description, issue.suggestion
                )
            })
            .collect();

        format!(
            "You are an expert Python developer. Rewrite the file below so that every listed \
             problem is fixed. Keep all existing top-level functions and classes; do not drop \
             functionality.\n\n\
             FILE: {file}\n\n\
             PROBLEMS TO FIX:\n{issue_list}\n\
             ORIGINAL SOURCE:\n```python\n{content}\n```\n\n\
             Reply with the complete corrected file in a single ```python code block.",
            file = file.display(),
        )
    }

    fn top_level_names(&self, content: &str) -> HashSet<String> {
        self.top_level_name
            .captures_iter(content)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Structural validation of the rewritten content.
    fn validate(&self, original: &str, fixed: &str) -> Result<()> {
        if fixed.trim().is_empty() {
            return Err(MendError::FixRejected("fixed content is empty".to_string()));
        }

        let original_names = self.top_level_names(original);
        let fixed_names = self.top_level_names(fixed);
        if let Some(missing) = original_names.iter().find(|name| !fixed_names.contains(*name)) {
            return Err(MendError::FixRejected(format!(
                "dropped top-level definition `{missing}`"
            )));
        }

        let original_lines = original.lines().count();
        let fixed_lines = fixed.lines().count();
        if fixed_lines * 2 < original_lines {
            return Err(MendError::FixRejected(format!(
                "content shrank from {original_lines} to {fixed_lines} lines"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Fixer for LlmFixer {
    async fn apply_fixes(&self, file: &Path, issues: &[FixInstruction]) -> Result<()> {
        if issues.is_empty() {
            debug!(file = %file.display(), "no issues to fix, skipping");
            return Ok(());
        }

        let original = sandbox::read_file(file)?;
        let prompt = self.build_prompt(file, &original, issues);

        let outcome: Result<()> = async {
            let response = self.client.complete(&prompt).await?;
            let fixed = extract_code_block(&response);
            self.validate(&original, &fixed)?;

            let allowed: Vec<&str> = self
                .allowed_components
                .iter()
                .map(String::as_str)
                .collect();
            sandbox::write_file(file, &fixed, &allowed)?;
            Ok(())
        }
        .await;

        let (status, error) = match &outcome {
            Ok(()) => (ActionStatus::Success, None),
            Err(e) => (ActionStatus::Failure, Some(e.to_string())),
        };

        self.experiment.record(ExperimentRecord::new(
            "Fixer",
            self.client.model(),
            ActionKind::Fix,
            status,
            serde_json::json!({
                "file": file.display().to_string(),
                "fixes_requested": issues.len(),
                "error": error,
            }),
        ));

        if outcome.is_ok() {
            info!(file = %file.display(), fixes = issues.len(), "fix applied");
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::llm::LlmConfig;

    fn fixer() -> LlmFixer {
        let client = LlmClient::new(LlmConfig::new("test-key")).expect("client");
        LlmFixer::new(client, Arc::new(ExperimentLogger::disabled()))
    }

    const ORIGINAL: &str = "\
def add(a, b):
    return a + b

class Calculator:
    def multiply(self, a, b):
        return a * b
";

    #[test]
    fn test_top_level_names_ignore_methods() {
        let names = fixer().top_level_names(ORIGINAL);
        assert!(names.contains("add"));
        assert!(names.contains("Calculator"));
        // `multiply` is indented, so not top-level
        assert!(!names.contains("multiply"));
    }

    #[test]
    fn test_validate_accepts_faithful_rewrite() {
        let fixed = "\
def add(a, b):
    \"\"\"Add two numbers.\"\"\"
    return a + b

class Calculator:
    def multiply(self, a, b):
        return a * b
";
        assert!(fixer().validate(ORIGINAL, fixed).is_ok());
    }

    #[test]
    fn test_validate_rejects_dropped_definition() {
        let fixed = "def add(a, b):\n    return a + b\n";
        let err = fixer().validate(ORIGINAL, fixed).unwrap_err();
        assert!(err.to_string().contains("Calculator"));
    }

    #[test]
    fn test_validate_rejects_empty_output() {
        let err = fixer().validate(ORIGINAL, "   \n").unwrap_err();
        assert!(matches!(err, MendError::FixRejected(_)));
    }

    #[test]
    fn test_validate_rejects_heavy_shrink() {
        let original: String = (0..40).map(|i| format!("x{i} = {i}\n")).collect();
        let original = format!("def keep():\n    pass\n{original}");
        let fixed = "def keep():\n    pass\n";
        let err = fixer().validate(&original, fixed).unwrap_err();
        assert!(err.to_string().contains("shrank"));
    }

    #[tokio::test]
    async fn test_empty_issue_list_is_noop() {
        // Must not touch the filesystem or the network.
        let result = fixer()
            .apply_fixes(Path::new("/nonexistent/sandbox/calc.py"), &[])
            .await;
        assert!(result.is_ok());
    }
}
