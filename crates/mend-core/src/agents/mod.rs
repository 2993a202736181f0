//! Collaborator contracts consumed by the repair loop.
//!
//! The controller only ever sees these traits; the LLM-backed
//! implementations live in the submodules and can be swapped for stubs in
//! tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;
use crate::domain::instruction::FixInstruction;
use crate::domain::test_report::TestExecution;

pub mod auditor;
pub mod fixer;
pub mod judge;
pub mod llm;
pub mod scorer;

pub use auditor::LlmAuditor;
pub use fixer::LlmFixer;
pub use judge::{LlmTestGenerator, PytestExecutor};
pub use llm::{LlmClient, LlmConfig};
pub use scorer::LintScorer;

/// Output of the audit phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditReport {
    /// Structured issues to hand to the fixer. May be empty.
    pub issues: Vec<FixInstruction>,

    /// External lint score for the file (0-10).
    pub lint_score: f64,

    /// One-paragraph human summary of the audit.
    pub summary: String,
}

/// Produces a structured issue list for a file.
///
/// An error here is terminal for the file: without an issue list there is
/// nothing to drive a fix.
#[async_trait]
pub trait Auditor: Send + Sync {
    async fn analyze(&self, file: &Path) -> Result<AuditReport>;
}

/// Mutates the file in place to address the given issues.
///
/// Implementations must preserve pre-existing top-level function/class
/// names and reject output that shrinks the file by more than half its
/// original line count. An empty issue list is a no-op.
#[async_trait]
pub trait Fixer: Send + Sync {
    async fn apply_fixes(&self, file: &Path, issues: &[FixInstruction]) -> Result<()>;
}

/// Writes a test file for the given source file and returns its path.
#[async_trait]
pub trait TestGenerator: Send + Sync {
    async fn generate_tests(&self, file: &Path) -> Result<PathBuf>;
}

/// Executes a test file under a hard wall-clock timeout.
///
/// A timeout is reported through [`ExecutionSignal::TimedOut`]
/// (crate::domain::ExecutionSignal), not as an error; errors mean the
/// runner could not be started at all.
#[async_trait]
pub trait TestExecutor: Send + Sync {
    async fn run(&self, test_file: &Path) -> Result<TestExecution>;
}

/// Scores a file on a 0-10 quality scale. Report-only.
#[async_trait]
pub trait QualityScorer: Send + Sync {
    async fn score(&self, file: &Path) -> Result<f64>;
}
