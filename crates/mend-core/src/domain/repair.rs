//! Per-file repair records: attempts, verdicts, and the final result.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::instruction::FixInstruction;
use crate::domain::test_report::TestRunSummary;

/// Recoverable failure of one judge step inside the repair loop.
///
/// These are values the controller pattern-matches on, not errors that
/// unwind the loop. Only audit failure and the very first fix failure are
/// terminal for a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JudgeFailure {
    /// The test-generation collaborator produced no usable test file.
    Generation { detail: String },

    /// The test-runner process could not be executed at all.
    Execution { detail: String },
}

impl std::fmt::Display for JudgeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JudgeFailure::Generation { detail } => write!(f, "test generation failed: {detail}"),
            JudgeFailure::Execution { detail } => write!(f, "test execution failed: {detail}"),
        }
    }
}

/// One iteration record of the self-healing loop.
///
/// Created when the judge re-evaluates and immutable afterwards; the
/// sequence is retained for the final report only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepairAttempt {
    /// 1-based loop iteration; 0 is the pre-loop judgment.
    pub iteration: u32,

    /// Instructions handed to the fixer for this iteration.
    pub instructions_used: Vec<FixInstruction>,

    /// Test summary observed after the fix.
    pub summary: TestRunSummary,

    /// When the judge recorded this attempt.
    pub recorded_at: DateTime<Utc>,
}

impl RepairAttempt {
    pub fn new(
        iteration: u32,
        instructions_used: Vec<FixInstruction>,
        summary: TestRunSummary,
    ) -> Self {
        Self {
            iteration,
            instructions_used,
            summary,
            recorded_at: Utc::now(),
        }
    }
}

/// Terminal state of one file's repair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepairVerdict {
    /// The generated suite passed fully within the iteration budget.
    Succeeded,

    /// The budget was exhausted but the tolerance policy accepted the result.
    Tolerated { pass_rate: f64, reason: String },

    /// The file could not be repaired.
    Failed { reason: String },
}

impl RepairVerdict {
    /// Whether the verdict counts as overall success (tolerated included).
    pub fn is_success(&self) -> bool {
        matches!(self, RepairVerdict::Succeeded | RepairVerdict::Tolerated { .. })
    }
}

/// Final per-file outcome, owned by the repair loop controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRepairResult {
    /// The repaired source file.
    pub file: PathBuf,

    /// Terminal verdict.
    pub verdict: RepairVerdict,

    /// Lint score before the first fix (0-10).
    pub initial_score: f64,

    /// Lint score after the loop exited (0-10).
    pub final_score: f64,

    /// Loop iterations consumed (excludes the pre-loop judgment).
    pub iterations_used: u32,

    /// Whether the tolerance policy was the reason for acceptance.
    pub tolerance_applied: bool,

    /// Passing-test count from the last judged summary.
    pub tests_passed: u32,

    /// Failing-test count from the last judged summary.
    pub tests_failed: u32,

    /// Full attempt history, in order.
    pub attempts: Vec<RepairAttempt>,
}

impl FileRepairResult {
    /// Whether this file counts as a success for mission tallies.
    pub fn is_success(&self) -> bool {
        self.verdict.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_report::TestRunSummary;

    fn passing_attempt(iteration: u32) -> RepairAttempt {
        RepairAttempt::new(iteration, Vec::new(), TestRunSummary::passing(5, "5 passed"))
    }

    #[test]
    fn test_verdict_success_classification() {
        assert!(RepairVerdict::Succeeded.is_success());
        assert!(RepairVerdict::Tolerated {
            pass_rate: 0.9,
            reason: "acceptable pass rate".to_string()
        }
        .is_success());
        assert!(!RepairVerdict::Failed {
            reason: "audit failed".to_string()
        }
        .is_success());
    }

    #[test]
    fn test_judge_failure_display() {
        let failure = JudgeFailure::Generation {
            detail: "empty test body".to_string(),
        };
        assert!(failure.to_string().contains("test generation failed"));

        let failure = JudgeFailure::Execution {
            detail: "pytest not found".to_string(),
        };
        assert!(failure.to_string().contains("pytest not found"));
    }

    #[test]
    fn test_file_result_serde_roundtrip() {
        let result = FileRepairResult {
            file: PathBuf::from("sandbox/calc.py"),
            verdict: RepairVerdict::Succeeded,
            initial_score: 4.5,
            final_score: 8.7,
            iterations_used: 3,
            tolerance_applied: false,
            tests_passed: 9,
            tests_failed: 0,
            attempts: vec![passing_attempt(0)],
        };

        let json = serde_json::to_string(&result).expect("serialize");
        let back: FileRepairResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(result, back);
        assert!(back.is_success());
    }
}
