//! The bounded self-healing repair loop for one file.
//!
//! Sequence: audit once, fix once, judge with freshly generated tests,
//! then loop fix-and-rejudge against structured diagnostics until the
//! suite passes or the iteration budget runs out. On exhaustion the
//! tolerance policy gets the final word.
//!
//! Per-iteration failures are values the controller matches on; only an
//! audit failure or the very first fix failure is terminal for a file,
//! because they precede any judged baseline and leave nothing to retry
//! against. The latest attempted fix is never rolled back, so the
//! closest-to-passing state stays on disk for inspection.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{Auditor, Fixer, QualityScorer, TestExecutor, TestGenerator};
use crate::domain::error::MendError;
use crate::domain::instruction::{FixInstruction, IssueCategory, Severity};
use crate::domain::repair::{FileRepairResult, JudgeFailure, RepairAttempt, RepairVerdict};
use crate::domain::test_report::TestRunSummary;
use crate::interpreter::TestOutputInterpreter;
use crate::tolerance::{evaluate_tolerance, TolerancePolicy};

/// Raw-output lines quoted by the synthetic fallback instruction.
const SYNTHETIC_TAIL_LINES: usize = 30;

/// Controller configuration, passed in explicitly at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    /// Maximum fix/judge cycles after the initial judgment.
    pub max_iterations: u32,

    /// Tolerance policy applied on budget exhaustion.
    pub tolerance: TolerancePolicy,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: TolerancePolicy::default(),
        }
    }
}

/// Drives the audit → fix → judge state machine for single files.
pub struct RepairLoopController {
    auditor: Arc<dyn Auditor>,
    fixer: Arc<dyn Fixer>,
    test_generator: Arc<dyn TestGenerator>,
    test_executor: Arc<dyn TestExecutor>,
    interpreter: Arc<dyn TestOutputInterpreter>,
    scorer: Arc<dyn QualityScorer>,
    config: RepairConfig,
}

impl RepairLoopController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auditor: Arc<dyn Auditor>,
        fixer: Arc<dyn Fixer>,
        test_generator: Arc<dyn TestGenerator>,
        test_executor: Arc<dyn TestExecutor>,
        interpreter: Arc<dyn TestOutputInterpreter>,
        scorer: Arc<dyn QualityScorer>,
        config: RepairConfig,
    ) -> Self {
        Self {
            auditor,
            fixer,
            test_generator,
            test_executor,
            interpreter,
            scorer,
            config,
        }
    }

    /// Repair one file through the full state machine. Infallible at this
    /// level: every failure mode folds into the returned verdict.
    pub async fn repair_file(&self, file: &Path) -> FileRepairResult {
        info!(file = %file.display(), "starting repair");

        let initial_score = self.score_or_zero(file).await;
        let mut attempts: Vec<RepairAttempt> = Vec::new();

        // Phase 1: audit. Terminal on failure; without an issue list there
        // is nothing to drive a fix.
        let audit = match self.auditor.analyze(file).await {
            Ok(audit) => audit,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "audit failed");
                return self.terminal_failure(
                    file,
                    initial_score,
                    format!("audit failed: {e}"),
                    attempts,
                );
            }
        };
        info!(file = %file.display(), issues = audit.issues.len(), "audit complete");

        // Phase 2: initial fix. Terminal on failure; there is no judged
        // baseline yet to fall back to.
        if let Err(e) = self.fixer.apply_fixes(file, &audit.issues).await {
            warn!(file = %file.display(), error = %e, "initial fix failed");
            return self.terminal_failure(
                file,
                initial_score,
                format!("fix failed: {e}"),
                attempts,
            );
        }

        // Phase 3: first judgment, with forced test generation. Tests are
        // generated once per file; only the source changes afterwards.
        let test_file = match self.test_generator.generate_tests(file).await {
            Ok(path) => path,
            Err(e) => {
                let failure = JudgeFailure::Generation {
                    detail: match &e {
                        MendError::TestGenerationFailed(detail) => detail.clone(),
                        other => other.to_string(),
                    },
                };
                warn!(file = %file.display(), error = %failure, "test generation failed");
                attempts.push(RepairAttempt::new(
                    0,
                    audit.issues.clone(),
                    failure_summary(&failure),
                ));
                return self.terminal_failure(file, initial_score, failure.to_string(), attempts);
            }
        };

        let mut summary = self.judge_once(&test_file).await;
        attempts.push(RepairAttempt::new(0, audit.issues.clone(), summary.clone()));

        // Phase 4: self-healing loop, strictly bounded.
        let mut iterations_used = 0u32;
        while !summary.succeeded && iterations_used < self.config.max_iterations {
            iterations_used += 1;
            info!(
                file = %file.display(),
                iteration = iterations_used,
                max = self.config.max_iterations,
                passed = summary.passed,
                failed = summary.failed,
                errored = summary.errored,
                "repair iteration"
            );

            // The fixer always receives a non-empty issue list: structured
            // diagnostics when the interpreter produced them, otherwise one
            // synthetic instruction wrapping the raw output.
            let instructions = if summary.diagnostics.is_empty() {
                vec![synthetic_instruction(&summary.raw_output)]
            } else {
                summary.diagnostics.clone()
            };

            if let Err(e) = self.fixer.apply_fixes(file, &instructions).await {
                // One fixer failure must not abort the file; the iteration
                // is spent and the previous judged state stands.
                warn!(
                    file = %file.display(),
                    iteration = iterations_used,
                    error = %e,
                    "fix attempt failed, skipping iteration"
                );
                continue;
            }

            summary = self.judge_once(&test_file).await;
            attempts.push(RepairAttempt::new(
                iterations_used,
                instructions,
                summary.clone(),
            ));
        }

        // Phase 5: verdict.
        let (verdict, tolerance_applied) = if summary.succeeded {
            (RepairVerdict::Succeeded, false)
        } else {
            let tolerance = evaluate_tolerance(
                &self.config.tolerance,
                summary.passed,
                summary.failed,
                summary.errored,
            );
            if tolerance.acceptable {
                info!(file = %file.display(), reason = %tolerance.reason, "tolerance applied");
                (
                    RepairVerdict::Tolerated {
                        pass_rate: tolerance.pass_rate,
                        reason: tolerance.reason,
                    },
                    true,
                )
            } else {
                (
                    RepairVerdict::Failed {
                        reason: format!("iteration budget exhausted: {}", tolerance.reason),
                    },
                    false,
                )
            }
        };

        let final_score = self.score_or_zero(file).await;
        info!(
            file = %file.display(),
            iterations = iterations_used,
            success = verdict.is_success(),
            initial_score,
            final_score,
            "repair finished"
        );

        FileRepairResult {
            file: file.to_path_buf(),
            verdict,
            initial_score,
            final_score,
            iterations_used,
            tolerance_applied,
            tests_passed: summary.passed,
            tests_failed: summary.failed,
            attempts,
        }
    }

    /// One judge evaluation: run the existing test file and interpret the
    /// output. Executor errors become a [`JudgeFailure`] value and degrade
    /// to an errored summary so the loop can continue.
    async fn judge_once(&self, test_file: &Path) -> TestRunSummary {
        match self.test_executor.run(test_file).await {
            Ok(execution) => self
                .interpreter
                .interpret(&execution.raw_output, execution.signal),
            Err(e) => {
                let failure = JudgeFailure::Execution {
                    detail: match &e {
                        MendError::ExecutionFailed(detail) => detail.clone(),
                        other => other.to_string(),
                    },
                };
                warn!(test_file = %test_file.display(), error = %failure, "judge step failed");
                failure_summary(&failure)
            }
        }
    }

    /// Scoring is report-only; a failing scorer degrades to 0.0.
    async fn score_or_zero(&self, file: &Path) -> f64 {
        match self.scorer.score(file).await {
            Ok(score) => score,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "quality score unavailable");
                0.0
            }
        }
    }

    fn terminal_failure(
        &self,
        file: &Path,
        initial_score: f64,
        reason: String,
        attempts: Vec<RepairAttempt>,
    ) -> FileRepairResult {
        let (tests_passed, tests_failed) = attempts
            .last()
            .map(|attempt| (attempt.summary.passed, attempt.summary.failed))
            .unwrap_or((0, 0));

        FileRepairResult {
            file: file.to_path_buf(),
            verdict: RepairVerdict::Failed { reason },
            initial_score,
            final_score: initial_score,
            iterations_used: 0,
            tolerance_applied: false,
            tests_passed,
            tests_failed,
            attempts,
        }
    }
}

/// Last bounded window of raw output, for synthetic instructions.
fn output_tail(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let start = lines.len().saturating_sub(SYNTHETIC_TAIL_LINES);
    lines[start..].join("\n")
}

fn synthetic_instruction(raw_output: &str) -> FixInstruction {
    FixInstruction::new(
        Severity::High,
        IssueCategory::Bug,
        format!("Test failures detected:\n{}", output_tail(raw_output)),
        "Analyse the test errors and correct the source code.",
    )
}

/// A recoverable judge failure rendered as one errored unit, with a
/// synthetic diagnostic so the fixer still receives something actionable.
fn failure_summary(failure: &JudgeFailure) -> TestRunSummary {
    let suggestion = match failure {
        JudgeFailure::Generation { .. } => "Make sure the source file is valid and importable.",
        JudgeFailure::Execution { .. } => {
            "Make sure the test runner is installed and the source is importable."
        }
    };
    let diagnostic = FixInstruction::new(
        Severity::High,
        IssueCategory::Bug,
        failure.to_string(),
        suggestion,
    );
    TestRunSummary::failing(0, 0, 1, failure.to_string(), vec![diagnostic])
}
