//! Run-level mission report aggregating per-file repair results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::repair::FileRepairResult;

/// Schema version stamped into persisted mission artifacts.
pub const MISSION_SCHEMA_VERSION: &str = "1";

/// Aggregate report for one mission over a target directory.
///
/// Built incrementally by the mission orchestrator; per-file results are
/// appended, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionReport {
    /// Artifact schema version.
    pub schema_version: String,

    /// Unique mission identifier.
    pub mission_id: Uuid,

    /// Directory the mission swept.
    pub target_dir: PathBuf,

    /// Wall-clock start.
    pub started_at: DateTime<Utc>,

    /// Wall-clock end; `None` while the mission is in flight.
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of files attempted.
    pub files_processed: u32,

    /// Files whose verdict counts as success (tolerated included).
    pub files_succeeded: u32,

    /// Files that ended in a failed verdict.
    pub files_failed: u32,

    /// Per-file outcomes, in discovery order.
    pub results: Vec<FileRepairResult>,
}

impl MissionReport {
    /// Start an empty report for `target_dir`.
    pub fn begin(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_version: MISSION_SCHEMA_VERSION.to_string(),
            mission_id: Uuid::new_v4(),
            target_dir: target_dir.into(),
            started_at: Utc::now(),
            finished_at: None,
            files_processed: 0,
            files_succeeded: 0,
            files_failed: 0,
            results: Vec::new(),
        }
    }

    /// Record one file's outcome and update the tallies.
    pub fn record(&mut self, result: FileRepairResult) {
        self.files_processed += 1;
        if result.is_success() {
            self.files_succeeded += 1;
        } else {
            self.files_failed += 1;
        }
        self.results.push(result);
    }

    /// Close the report.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// True iff no file ended in a failed verdict.
    pub fn success(&self) -> bool {
        self.files_failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repair::RepairVerdict;

    fn file_result(verdict: RepairVerdict) -> FileRepairResult {
        FileRepairResult {
            file: PathBuf::from("sandbox/example.py"),
            verdict,
            initial_score: 3.0,
            final_score: 7.0,
            iterations_used: 2,
            tolerance_applied: false,
            tests_passed: 4,
            tests_failed: 0,
            attempts: Vec::new(),
        }
    }

    #[test]
    fn test_tallies_track_verdicts() {
        let mut report = MissionReport::begin("sandbox");
        report.record(file_result(RepairVerdict::Succeeded));
        report.record(file_result(RepairVerdict::Failed {
            reason: "budget exhausted".to_string(),
        }));
        report.record(file_result(RepairVerdict::Tolerated {
            pass_rate: 0.92,
            reason: "acceptable pass rate".to_string(),
        }));

        assert_eq!(report.files_processed, 3);
        assert_eq!(report.files_succeeded, 2);
        assert_eq!(report.files_failed, 1);
        assert!(!report.success());
    }

    #[test]
    fn test_finish_stamps_end_time() {
        let mut report = MissionReport::begin("sandbox");
        assert!(report.finished_at.is_none());
        report.finish();
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let mut report = MissionReport::begin("sandbox");
        report.record(file_result(RepairVerdict::Succeeded));
        report.finish();

        let json = serde_json::to_string(&report).expect("serialize");
        let back: MissionReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(report, back);
    }
}
