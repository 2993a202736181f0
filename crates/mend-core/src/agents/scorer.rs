//! Lint-backed quality scorer.

use std::path::Path;

use async_trait::async_trait;

use crate::agents::QualityScorer;
use crate::analysis;
use crate::domain::error::{MendError, Result};

/// Scores files with the external linter's 0-10 rating.
///
/// Consumed for before/after reporting only; callers degrade a missing
/// linter to 0.0 rather than failing the repair.
#[derive(Debug, Default, Clone, Copy)]
pub struct LintScorer;

#[async_trait]
impl QualityScorer for LintScorer {
    async fn score(&self, file: &Path) -> Result<f64> {
        let report = analysis::run_lint(file).await;
        if !report.available {
            return Err(MendError::ScoreUnavailable(report.raw_output));
        }
        Ok(report.score)
    }
}
