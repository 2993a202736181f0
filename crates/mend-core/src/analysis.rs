//! Static-analysis tooling: lint scoring, syntax checking, line statistics.
//!
//! The linter is invoked as a black box; its score feeds before/after
//! reporting only and never gates pass/fail decisions.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

/// Timeout for one linter invocation.
const LINT_TIMEOUT: Duration = Duration::from_secs(30);

/// One structured linter message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LintMessage {
    #[serde(default)]
    pub line: u32,

    /// Message kind as reported by the linter ("error", "warning", ...).
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub message: String,

    /// Linter symbol, e.g. "missing-function-docstring".
    #[serde(default)]
    pub symbol: String,
}

/// Result of one linter run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LintReport {
    /// Score on the linter's 0-10 scale; 0.0 when unavailable.
    pub score: f64,

    /// Combined stdout/stderr of the text-format run.
    pub raw_output: String,

    /// Structured messages from the JSON-format run.
    pub messages: Vec<LintMessage>,

    /// Whether the linter could be executed at all.
    pub available: bool,
}

impl LintReport {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            raw_output: reason.into(),
            messages: Vec::new(),
            available: false,
        }
    }
}

/// Syntax check outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntaxCheck {
    pub valid: bool,
    pub error: Option<String>,
    pub line: Option<u32>,
}

/// Line statistics for a source file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineStats {
    pub total: u32,
    pub code: u32,
    pub comments: u32,
    pub blank: u32,
}

/// Run the linter over `file`, in two passes: text format for the score,
/// JSON format for structured messages. Any failure degrades to an
/// unavailable report rather than an error.
pub async fn run_lint(file: &Path) -> LintReport {
    let text_output = match capture("pylint", &[file, Path::new("--output-format=text")]).await {
        Ok(output) => output,
        Err(reason) => return LintReport::unavailable(reason),
    };

    let score = extract_lint_score(&text_output);

    let messages = match capture("pylint", &[file, Path::new("--output-format=json")]).await {
        Ok(json_output) => serde_json::from_str(json_output.trim()).unwrap_or_default(),
        Err(_) => Vec::new(),
    };

    debug!(file = %file.display(), score, "lint run complete");

    LintReport {
        score,
        raw_output: text_output,
        messages,
        available: true,
    }
}

/// Extract the score from the linter's "rated at N/10" line.
pub fn extract_lint_score(output: &str) -> f64 {
    for line in output.lines() {
        if !line.to_lowercase().contains("rated at") {
            continue;
        }
        let after = match line.split("rated at").nth(1) {
            Some(after) => after,
            None => continue,
        };
        if let Some(score_text) = after.split('/').next() {
            if let Ok(score) = score_text.trim().parse::<f64>() {
                return score;
            }
        }
    }
    0.0
}

/// Check the file compiles as Python, via `python3 -m py_compile`.
pub async fn check_syntax(file: &Path) -> SyntaxCheck {
    let output = match capture("python3", &[Path::new("-m"), Path::new("py_compile"), file]).await {
        Ok(output) => output,
        Err(reason) => {
            return SyntaxCheck {
                valid: false,
                error: Some(reason),
                line: None,
            }
        }
    };

    if output.trim().is_empty() {
        return SyntaxCheck {
            valid: true,
            error: None,
            line: None,
        };
    }

    SyntaxCheck {
        valid: false,
        line: extract_error_line(&output),
        error: Some(output.lines().last().unwrap_or("syntax error").to_string()),
    }
}

fn extract_error_line(output: &str) -> Option<u32> {
    output.lines().find_map(|line| {
        line.split("line ")
            .nth(1)
            .and_then(|rest| rest.split([',', ')', ' ']).next())
            .and_then(|digits| digits.trim().parse().ok())
    })
}

/// Count code, comment, and blank lines.
pub fn count_lines(content: &str) -> LineStats {
    let mut stats = LineStats {
        total: 0,
        code: 0,
        comments: 0,
        blank: 0,
    };

    for line in content.lines() {
        stats.total += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            stats.blank += 1;
        } else if trimmed.starts_with('#') {
            stats.comments += 1;
        } else {
            stats.code += 1;
        }
    }

    stats
}

/// Spawn a tool, capture combined stdout+stderr, bounded by [`LINT_TIMEOUT`].
async fn capture(program: &str, args: &[&Path]) -> std::result::Result<String, String> {
    let child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("{program} not available: {e}"))?;

    let output = tokio::time::timeout(LINT_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| format!("{program} timed out after {}s", LINT_TIMEOUT.as_secs()))?
        .map_err(|e| format!("{program} failed: {e}"))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(combined)
}
