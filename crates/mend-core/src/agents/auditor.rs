//! LLM-backed audit agent.
//!
//! Combines a syntax check, a linter pass, and an LLM analysis into one
//! structured issue list. When the LLM is unreachable or returns garbage,
//! the audit degrades to a lint-only fallback rather than failing the file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::agents::llm::LlmClient;
use crate::agents::{AuditReport, Auditor};
use crate::analysis::{self, LintReport, SyntaxCheck};
use crate::domain::error::{MendError, Result};
use crate::domain::instruction::{FixInstruction, IssueCategory, Severity};
use crate::experiment::{ActionKind, ActionStatus, ExperimentLogger, ExperimentRecord};
use crate::sandbox;

/// Issue cap taken from the linter when falling back without an LLM.
const FALLBACK_MESSAGE_CAP: usize = 20;

/// Lint messages quoted in the analysis prompt.
const PROMPT_MESSAGE_CAP: usize = 15;

pub struct LlmAuditor {
    client: LlmClient,
    experiment: Arc<ExperimentLogger>,
}

impl LlmAuditor {
    pub fn new(client: LlmClient, experiment: Arc<ExperimentLogger>) -> Self {
        Self { client, experiment }
    }

    fn build_prompt(
        &self,
        file: &Path,
        content: &str,
        lint: &LintReport,
        syntax: &SyntaxCheck,
    ) -> String {
        let stats = analysis::count_lines(content);
        let syntax_line = if syntax.valid {
            "valid".to_string()
        } else {
            format!(
                "INVALID - {} (line {})",
                syntax.error.as_deref().unwrap_or("unknown"),
                syntax.line.unwrap_or(0)
            )
        };

        let mut lint_summary = String::new();
        for message in lint.messages.iter().take(PROMPT_MESSAGE_CAP) {
            lint_summary.push_str(&format!(
                "- line {}: [{}] {}\n",
                message.line, message.kind, message.message
            ));
        }

        format!(
            "You are an expert Python code reviewer. Analyse the file below and produce a \
             structured refactoring plan.\n\n\
             FILE: {file}\n\
             CODE LINES: {code} | COMMENTS: {comments} | BLANK: {blank}\n\
             SYNTAX: {syntax_line}\n\
             LINT SCORE: {score:.2}/10\n\n\
             LINT MESSAGES:\n{lint_summary}\n\
             SOURCE:\n```python\n{content}\n```\n\n\
             Identify every issue in these categories: BUG (HIGH severity: crashes, wrong \
             logic, unhandled exceptions), QUALITY (MEDIUM: missing docstrings, poor names, \
             duplication), STYLE (LOW: formatting, import order), TESTS (MEDIUM: untested \
             critical paths).\n\n\
             Reply with JSON only, no markdown fences, in this shape:\n\
             {{\"issues\": [{{\"severity\": \"HIGH\", \"type\": \"BUG\", \"line\": 15, \
             \"description\": \"...\", \"suggestion\": \"...\"}}], \"summary\": \"...\"}}",
            file = file.display(),
            code = stats.code,
            comments = stats.comments,
            blank = stats.blank,
            score = lint.score,
        )
    }

    /// Lint-only report used when the LLM path is unavailable.
    fn fallback_report(&self, lint: &LintReport, syntax: &SyntaxCheck, reason: &str) -> AuditReport {
        let mut issues = Vec::new();

        if !syntax.valid {
            issues.push(
                FixInstruction::new(
                    Severity::High,
                    IssueCategory::Bug,
                    format!(
                        "Syntax error: {}",
                        syntax.error.as_deref().unwrap_or("unknown")
                    ),
                    "Fix the syntax so the file parses.",
                )
                .with_line(syntax.line.unwrap_or(0)),
            );
        }

        for message in lint.messages.iter().take(FALLBACK_MESSAGE_CAP) {
            let severity = match message.kind.as_str() {
                "error" => Severity::High,
                "warning" => Severity::Medium,
                _ => Severity::Low,
            };
            issues.push(
                FixInstruction::new(
                    severity,
                    IssueCategory::Quality,
                    message.message.clone(),
                    format!("See linter rule: {}", message.symbol),
                )
                .with_line(message.line),
            );
        }

        AuditReport {
            issues,
            lint_score: lint.score,
            summary: format!("lint-only fallback audit ({reason})"),
        }
    }

    fn parse_response(&self, response: &str, lint_score: f64) -> Option<AuditReport> {
        let start = response.find('{')?;
        let end = response.rfind('}')?;
        let raw: RawAudit = serde_json::from_str(&response[start..=end]).ok()?;

        let issues = raw
            .issues
            .into_iter()
            .filter(|issue| !issue.description.trim().is_empty())
            .map(|issue| {
                FixInstruction::new(
                    parse_severity(&issue.severity),
                    parse_category(&issue.category),
                    issue.description,
                    issue.suggestion,
                )
                .with_line(issue.line)
            })
            .collect();

        Some(AuditReport {
            issues,
            lint_score,
            summary: if raw.summary.is_empty() {
                "audit complete".to_string()
            } else {
                raw.summary
            },
        })
    }
}

#[async_trait]
impl Auditor for LlmAuditor {
    async fn analyze(&self, file: &Path) -> Result<AuditReport> {
        let content = sandbox::read_file(file)
            .map_err(|e| MendError::AuditFailed(format!("cannot read {}: {e}", file.display())))?;

        let syntax = analysis::check_syntax(file).await;
        let lint = analysis::run_lint(file).await;
        if !lint.available {
            warn!(file = %file.display(), "linter unavailable, audit will be LLM-only");
        }

        let prompt = self.build_prompt(file, &content, &lint, &syntax);

        let report = match self.client.complete(&prompt).await {
            Ok(response) => match self.parse_response(&response, lint.score) {
                Some(report) => {
                    self.experiment.record(ExperimentRecord::new(
                        "Auditor",
                        self.client.model(),
                        ActionKind::Analysis,
                        ActionStatus::Success,
                        serde_json::json!({
                            "file": file.display().to_string(),
                            "lint_score": lint.score,
                            "issues_found": report.issues.len(),
                            "syntax_valid": syntax.valid,
                        }),
                    ));
                    report
                }
                None => {
                    warn!(file = %file.display(), "LLM response held no parseable JSON, using lint fallback");
                    self.record_failure(file, "unparseable response");
                    self.fallback_report(&lint, &syntax, "unparseable LLM response")
                }
            },
            Err(e) => {
                warn!(file = %file.display(), error = %e, "LLM audit failed, using lint fallback");
                self.record_failure(file, &e.to_string());
                self.fallback_report(&lint, &syntax, &e.to_string())
            }
        };

        info!(
            file = %file.display(),
            issues = report.issues.len(),
            score = report.lint_score,
            "audit complete"
        );

        Ok(report)
    }
}

impl LlmAuditor {
    fn record_failure(&self, file: &Path, error: &str) {
        self.experiment.record(ExperimentRecord::new(
            "Auditor",
            self.client.model(),
            ActionKind::Analysis,
            ActionStatus::Failure,
            serde_json::json!({
                "file": file.display().to_string(),
                "error": error,
            }),
        ));
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawAudit {
    #[serde(default)]
    issues: Vec<RawIssue>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    severity: String,
    #[serde(rename = "type", default)]
    category: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    suggestion: String,
}

fn parse_severity(text: &str) -> Severity {
    match text.to_ascii_uppercase().as_str() {
        "HIGH" => Severity::High,
        "LOW" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn parse_category(text: &str) -> IssueCategory {
    match text.to_ascii_uppercase().as_str() {
        "BUG" => IssueCategory::Bug,
        "STYLE" => IssueCategory::Style,
        "TESTS" => IssueCategory::Tests,
        _ => IssueCategory::Quality,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::llm::LlmConfig;
    use crate::analysis::LintMessage;

    fn auditor() -> LlmAuditor {
        let client = LlmClient::new(LlmConfig::new("test-key")).expect("client");
        LlmAuditor::new(client, Arc::new(ExperimentLogger::disabled()))
    }

    #[test]
    fn test_parse_response_extracts_issues() {
        let response = r#"Sure, here is the plan:
{"issues": [{"severity": "HIGH", "type": "BUG", "line": 4,
 "description": "division by zero in ratio()",
 "suggestion": "guard the denominator"}],
 "summary": "one critical bug"}"#;

        let report = auditor().parse_response(response, 6.2).expect("report");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::High);
        assert_eq!(report.issues[0].category, IssueCategory::Bug);
        assert_eq!(report.issues[0].line, 4);
        assert!((report.lint_score - 6.2).abs() < f64::EPSILON);
        assert_eq!(report.summary, "one critical bug");
    }

    #[test]
    fn test_parse_response_tolerates_unknown_labels() {
        let response = r#"{"issues": [{"severity": "CRITICAL", "type": "PERF",
 "description": "slow loop", "suggestion": "memoize"}]}"#;
        let report = auditor().parse_response(response, 5.0).expect("report");
        assert_eq!(report.issues[0].severity, Severity::Medium);
        assert_eq!(report.issues[0].category, IssueCategory::Quality);
    }

    #[test]
    fn test_parse_response_rejects_non_json() {
        assert!(auditor().parse_response("no json here", 5.0).is_none());
    }

    #[test]
    fn test_fallback_report_includes_syntax_error() {
        let lint = LintReport {
            score: 2.0,
            raw_output: String::new(),
            messages: vec![LintMessage {
                line: 9,
                kind: "warning".to_string(),
                message: "unused import os".to_string(),
                symbol: "unused-import".to_string(),
            }],
            available: true,
        };
        let syntax = SyntaxCheck {
            valid: false,
            error: Some("invalid syntax".to_string()),
            line: Some(3),
        };

        let report = auditor().fallback_report(&lint, &syntax, "LLM offline");
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].severity, Severity::High);
        assert_eq!(report.issues[0].line, 3);
        assert_eq!(report.issues[1].severity, Severity::Medium);
        assert!(report.summary.contains("LLM offline"));
    }

    #[test]
    fn test_severity_and_category_parsing() {
        assert_eq!(parse_severity("high"), Severity::High);
        assert_eq!(parse_severity("nonsense"), Severity::Medium);
        assert_eq!(parse_category("bug"), IssueCategory::Bug);
        assert_eq!(parse_category("nonsense"), IssueCategory::Quality);
    }
}
