//! Aggregate result of one test execution.

use serde::{Deserialize, Serialize};

use crate::domain::instruction::FixInstruction;

/// How a test-runner invocation ended, as observed by the executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionSignal {
    /// The runner process exited on its own.
    Completed { exit_code: Option<i32> },

    /// The runner was killed after exceeding the wall-clock budget.
    TimedOut,
}

/// Raw output of one test-runner invocation, before interpretation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestExecution {
    /// Combined stdout and stderr of the run.
    pub raw_output: String,

    /// Termination signal.
    pub signal: ExecutionSignal,
}

/// Structured summary of one test execution.
///
/// Built exclusively by a [`TestOutputInterpreter`](crate::interpreter::TestOutputInterpreter);
/// the constructors below enforce the diagnostics invariants so ambiguity
/// can never present as success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestRunSummary {
    /// Number of passing tests.
    pub passed: u32,

    /// Number of failing tests.
    pub failed: u32,

    /// Number of errored units (collection failures and timeouts count as one).
    pub errored: u32,

    /// True iff no test failed or errored and the run was not a collection failure.
    pub succeeded: bool,

    /// Full raw runner output, retained for audit.
    pub raw_output: String,

    /// Ordered per-failure diagnostics. Empty iff `succeeded`.
    pub diagnostics: Vec<FixInstruction>,
}

impl TestRunSummary {
    /// A fully successful run. Diagnostics are empty by construction.
    pub fn passing(passed: u32, raw_output: impl Into<String>) -> Self {
        Self {
            passed,
            failed: 0,
            errored: 0,
            succeeded: true,
            raw_output: raw_output.into(),
            diagnostics: Vec::new(),
        }
    }

    /// A non-successful run. `diagnostics` must be non-empty; callers that
    /// derived nothing structured must supply a generic fallback first.
    pub fn failing(
        passed: u32,
        failed: u32,
        errored: u32,
        raw_output: impl Into<String>,
        diagnostics: Vec<FixInstruction>,
    ) -> Self {
        debug_assert!(
            !diagnostics.is_empty(),
            "a failing summary must carry at least one diagnostic"
        );
        Self {
            passed,
            failed,
            errored,
            succeeded: false,
            raw_output: raw_output.into(),
            diagnostics,
        }
    }

    /// Total number of counted units.
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.errored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instruction::{IssueCategory, Severity};

    #[test]
    fn test_passing_summary_has_no_diagnostics() {
        let summary = TestRunSummary::passing(12, "===== 12 passed =====");
        assert!(summary.succeeded);
        assert_eq!(summary.total(), 12);
        assert!(summary.diagnostics.is_empty());
    }

    #[test]
    fn test_failing_summary_keeps_diagnostics() {
        let diag = FixInstruction::new(
            Severity::High,
            IssueCategory::Bug,
            "test_divide failed",
            "check the division guard",
        );
        let summary = TestRunSummary::failing(9, 1, 0, "9 passed, 1 failed", vec![diag]);
        assert!(!summary.succeeded);
        assert_eq!(summary.total(), 10);
        assert_eq!(summary.diagnostics.len(), 1);
    }

    #[test]
    fn test_execution_signal_serde() {
        let signals = [
            ExecutionSignal::Completed { exit_code: Some(1) },
            ExecutionSignal::Completed { exit_code: None },
            ExecutionSignal::TimedOut,
        ];
        for signal in &signals {
            let json = serde_json::to_string(signal).expect("serialize");
            let back: ExecutionSignal = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*signal, back);
        }
    }

    #[test]
    fn test_summary_serde_roundtrip() {
        let summary = TestRunSummary::passing(3, "===== 3 passed in 0.01s =====");
        let json = serde_json::to_string(&summary).expect("serialize");
        let back: TestRunSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(summary, back);
    }
}
