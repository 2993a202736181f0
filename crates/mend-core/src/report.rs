//! Human-readable report rendering for missions and audits.

use std::path::PathBuf;

use crate::agents::AuditReport;
use crate::domain::mission::MissionReport;
use crate::domain::repair::RepairVerdict;

/// Issues shown per file in the audit report.
const AUDIT_ISSUE_CAP: usize = 5;

/// Render the end-of-mission summary.
pub fn render_mission_summary(report: &MissionReport) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(70));
    out.push_str("\nMISSION SUMMARY\n");
    out.push_str(&"=".repeat(70));
    out.push('\n');
    out.push_str(&format!("Target:    {}\n", report.target_dir.display()));
    out.push_str(&format!("Processed: {}\n", report.files_processed));
    out.push_str(&format!("Succeeded: {}\n", report.files_succeeded));
    out.push_str(&format!("Failed:    {}\n", report.files_failed));
    out.push('\n');

    for result in &report.results {
        let verdict = match &result.verdict {
            RepairVerdict::Succeeded => "PASS".to_string(),
            RepairVerdict::Tolerated { reason, .. } => format!("PASS (tolerance: {reason})"),
            RepairVerdict::Failed { reason } => format!("FAIL ({reason})"),
        };
        out.push_str(&format!("- {}\n", result.file.display()));
        out.push_str(&format!(
            "    verdict: {verdict}\n    lint: {:.2} -> {:.2} ({:+.2}) | iterations: {} | tests: {} passed, {} failed\n",
            result.initial_score,
            result.final_score,
            result.final_score - result.initial_score,
            result.iterations_used,
            result.tests_passed,
            result.tests_failed,
        ));
    }

    out.push_str(&"=".repeat(70));
    out.push('\n');
    out
}

/// Render an audit-only sweep report.
pub fn render_audit_report(analyses: &[(PathBuf, AuditReport)]) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(70));
    out.push_str("\nCODE AUDIT REPORT\n");
    out.push_str(&"=".repeat(70));
    out.push('\n');

    let total_issues: usize = analyses.iter().map(|(_, a)| a.issues.len()).sum();
    let average_score = if analyses.is_empty() {
        0.0
    } else {
        analyses.iter().map(|(_, a)| a.lint_score).sum::<f64>() / analyses.len() as f64
    };

    out.push_str(&format!("Files analysed: {}\n", analyses.len()));
    out.push_str(&format!("Total issues:   {total_issues}\n"));
    out.push_str(&format!("Average score:  {average_score:.2}/10\n\n"));

    for (file, analysis) in analyses {
        out.push_str(&format!(
            "- {} (score {:.2}/10, {} issue(s))\n",
            file.display(),
            analysis.lint_score,
            analysis.issues.len()
        ));
        for issue in analysis.issues.iter().take(AUDIT_ISSUE_CAP) {
            out.push_str(&format!(
                "    [{:?}] L{}: {}\n",
                issue.severity, issue.line, issue.description
            ));
        }
        if analysis.issues.len() > AUDIT_ISSUE_CAP {
            out.push_str(&format!(
                "    ... and {} more\n",
                analysis.issues.len() - AUDIT_ISSUE_CAP
            ));
        }
    }

    out.push_str(&"=".repeat(70));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instruction::{FixInstruction, IssueCategory, Severity};
    use crate::domain::repair::FileRepairResult;

    #[test]
    fn test_mission_summary_lists_every_file() {
        let mut report = MissionReport::begin("sandbox");
        report.record(FileRepairResult {
            file: PathBuf::from("sandbox/good.py"),
            verdict: RepairVerdict::Succeeded,
            initial_score: 4.0,
            final_score: 9.0,
            iterations_used: 2,
            tolerance_applied: false,
            tests_passed: 8,
            tests_failed: 0,
            attempts: Vec::new(),
        });
        report.record(FileRepairResult {
            file: PathBuf::from("sandbox/bad.py"),
            verdict: RepairVerdict::Failed {
                reason: "iteration budget exhausted: insufficient pass rate: 50.0% (threshold: 90%)"
                    .to_string(),
            },
            initial_score: 3.0,
            final_score: 3.5,
            iterations_used: 10,
            tolerance_applied: false,
            tests_passed: 5,
            tests_failed: 5,
            attempts: Vec::new(),
        });
        report.finish();

        let rendered = render_mission_summary(&report);
        assert!(rendered.contains("sandbox/good.py"));
        assert!(rendered.contains("sandbox/bad.py"));
        assert!(rendered.contains("Succeeded: 1"));
        assert!(rendered.contains("Failed:    1"));
        assert!(rendered.contains("+5.00"));
    }

    #[test]
    fn test_audit_report_caps_issue_listing() {
        let issues: Vec<FixInstruction> = (0..8)
            .map(|i| {
                FixInstruction::new(
                    Severity::Medium,
                    IssueCategory::Quality,
                    format!("issue {i}"),
                    "fix it",
                )
            })
            .collect();
        let analyses = vec![(
            PathBuf::from("sandbox/calc.py"),
            AuditReport {
                issues,
                lint_score: 5.5,
                summary: "messy".to_string(),
            },
        )];

        let rendered = render_audit_report(&analyses);
        assert!(rendered.contains("issue 0"));
        assert!(rendered.contains("issue 4"));
        assert!(!rendered.contains("issue 5"));
        assert!(rendered.contains("... and 3 more"));
    }

    #[test]
    fn test_audit_report_empty() {
        let rendered = render_audit_report(&[]);
        assert!(rendered.contains("Files analysed: 0"));
        assert!(rendered.contains("Average score:  0.00/10"));
    }
}
