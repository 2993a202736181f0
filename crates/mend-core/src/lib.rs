//! mend core library
//!
//! The iterative repair engine: audit a file, apply a fix, generate and
//! execute tests, and loop fixes against structured failure diagnostics
//! inside a bounded self-healing loop with a tolerance policy at the end.

pub mod agents;
pub mod analysis;
pub mod artifact;
pub mod domain;
pub mod experiment;
pub mod interpreter;
pub mod mission;
pub mod repair_loop;
pub mod report;
pub mod sandbox;
pub mod telemetry;
pub mod tolerance;

pub use agents::{
    AuditReport, Auditor, Fixer, LintScorer, LlmAuditor, LlmClient, LlmConfig, LlmFixer,
    LlmTestGenerator, PytestExecutor, QualityScorer, TestExecutor, TestGenerator,
};

pub use domain::{
    ErrorKind, ExecutionSignal, FileRepairResult, FixInstruction, IssueCategory, JudgeFailure,
    MendError, MissionReport, RepairAttempt, RepairVerdict, Result, Severity, TestExecution,
    TestRunSummary,
};

pub use artifact::{content_digest, read_mission_artifact, write_mission_artifact};
pub use experiment::{ActionKind, ActionStatus, ExperimentLogger, ExperimentRecord};
pub use interpreter::{PytestInterpreter, TestOutputInterpreter};
pub use mission::MissionOrchestrator;
pub use repair_loop::{RepairConfig, RepairLoopController};
pub use report::{render_audit_report, render_mission_summary};
pub use telemetry::init_tracing;
pub use tolerance::{evaluate_tolerance, TolerancePolicy, ToleranceVerdict};

/// mend version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
