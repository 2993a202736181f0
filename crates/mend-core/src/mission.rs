//! Mission orchestration: one repair loop per discovered file.
//!
//! Files are processed strictly sequentially; the test collaborator
//! executes real code against a shared working directory, so nothing here
//! is concurrent. One file's failure never blocks the rest of the sweep.

use std::path::Path;

use tracing::{info, warn};

use crate::domain::mission::MissionReport;
use crate::repair_loop::RepairLoopController;
use crate::sandbox;

pub struct MissionOrchestrator {
    controller: RepairLoopController,
}

impl MissionOrchestrator {
    pub fn new(controller: RepairLoopController) -> Self {
        Self { controller }
    }

    /// Sweep `target_dir` and repair every Python file found, in discovery
    /// order. Returns the aggregate report; an empty directory yields an
    /// empty (successful) report.
    pub async fn run(&self, target_dir: &Path) -> MissionReport {
        let mut report = MissionReport::begin(target_dir);
        let files = sandbox::find_python_files(target_dir);

        if files.is_empty() {
            warn!(target = %target_dir.display(), "no Python files found");
            report.finish();
            return report;
        }

        info!(
            target = %target_dir.display(),
            files = files.len(),
            mission = %report.mission_id,
            "mission started"
        );

        for file in &files {
            let result = self.controller.repair_file(file).await;
            report.record(result);
        }

        report.finish();
        info!(
            mission = %report.mission_id,
            processed = report.files_processed,
            succeeded = report.files_succeeded,
            failed = report.files_failed,
            "mission complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::agents::{AuditReport, Auditor, Fixer, QualityScorer, TestExecutor, TestGenerator};
    use crate::domain::error::{MendError, Result};
    use crate::domain::instruction::FixInstruction;
    use crate::domain::test_report::{ExecutionSignal, TestExecution};
    use crate::interpreter::PytestInterpreter;
    use crate::repair_loop::RepairConfig;

    /// Audits fail for files whose name contains "broken"; everything else
    /// sails through with a passing suite.
    struct SelectiveAuditor;

    #[async_trait]
    impl Auditor for SelectiveAuditor {
        async fn analyze(&self, file: &Path) -> Result<AuditReport> {
            if file.to_string_lossy().contains("broken") {
                return Err(MendError::AuditFailed("unreadable".to_string()));
            }
            Ok(AuditReport {
                issues: Vec::new(),
                lint_score: 8.0,
                summary: "clean".to_string(),
            })
        }
    }

    struct NoopFixer;

    #[async_trait]
    impl Fixer for NoopFixer {
        async fn apply_fixes(&self, _file: &Path, _issues: &[FixInstruction]) -> Result<()> {
            Ok(())
        }
    }

    struct NoopGenerator;

    #[async_trait]
    impl TestGenerator for NoopGenerator {
        async fn generate_tests(&self, file: &Path) -> Result<PathBuf> {
            Ok(file.with_file_name("test_generated.py"))
        }
    }

    struct PassingExecutor;

    #[async_trait]
    impl TestExecutor for PassingExecutor {
        async fn run(&self, _test_file: &Path) -> Result<TestExecution> {
            Ok(TestExecution {
                raw_output: "===== 5 passed in 0.02s =====".to_string(),
                signal: ExecutionSignal::Completed { exit_code: Some(0) },
            })
        }
    }

    struct FixedScorer;

    #[async_trait]
    impl QualityScorer for FixedScorer {
        async fn score(&self, _file: &Path) -> Result<f64> {
            Ok(6.5)
        }
    }

    fn orchestrator() -> MissionOrchestrator {
        MissionOrchestrator::new(RepairLoopController::new(
            Arc::new(SelectiveAuditor),
            Arc::new(NoopFixer),
            Arc::new(NoopGenerator),
            Arc::new(PassingExecutor),
            Arc::new(PytestInterpreter::new()),
            Arc::new(FixedScorer),
            RepairConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_empty_directory_yields_empty_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let report = orchestrator().run(dir.path()).await;
        assert_eq!(report.files_processed, 0);
        assert!(report.success());
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox_dir = dir.path().join("sandbox");
        std::fs::create_dir_all(&sandbox_dir).expect("mkdir");
        std::fs::write(sandbox_dir.join("good.py"), "x = 1\n").expect("write");
        std::fs::write(sandbox_dir.join("broken.py"), "x = 1\n").expect("write");
        std::fs::write(sandbox_dir.join("fine.py"), "x = 1\n").expect("write");

        let report = orchestrator().run(dir.path()).await;
        assert_eq!(report.files_processed, 3);
        assert_eq!(report.files_failed, 1);
        assert_eq!(report.files_succeeded, 2);
        assert!(!report.success());
    }
}
