//! Domain types for the mend repair pipeline.

pub mod error;
pub mod instruction;
pub mod mission;
pub mod repair;
pub mod test_report;

pub use error::{MendError, Result};
pub use instruction::{ErrorKind, FixInstruction, IssueCategory, Severity};
pub use mission::{MissionReport, MISSION_SCHEMA_VERSION};
pub use repair::{FileRepairResult, JudgeFailure, RepairAttempt, RepairVerdict};
pub use test_report::{ExecutionSignal, TestExecution, TestRunSummary};
