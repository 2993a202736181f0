//! Tolerance policy for accepting near-passing results.
//!
//! After the repair loop exhausts its iteration budget, a partially
//! passing suite may still be accepted so that negligible residual
//! failures (or environment noise) do not waste further repair cycles.

use serde::{Deserialize, Serialize};

/// Threshold configuration, passed in explicitly at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TolerancePolicy {
    /// Minimum pass rate for acceptance.
    pub pass_rate_threshold: f64,

    /// Sample size below which acceptance is reported as "thin".
    ///
    /// Deliberately informational only: it shapes the verdict's reason
    /// text but never gates acceptance, so a small fully-passing suite is
    /// not rejected merely for being small. Worth revisiting if thin
    /// samples turn out to over-accept in practice.
    pub min_sample_floor: u32,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            pass_rate_threshold: 0.90,
            min_sample_floor: 10,
        }
    }
}

/// Outcome of a tolerance evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToleranceVerdict {
    /// Whether the result is accepted as a terminal success.
    pub acceptable: bool,

    /// passed / total, 0.0 when no test executed.
    pub pass_rate: f64,

    /// Deterministic explanation derived only from the counts and the
    /// threshold.
    pub reason: String,
}

/// Evaluate aggregate counts against the policy.
pub fn evaluate_tolerance(
    policy: &TolerancePolicy,
    passed: u32,
    failed: u32,
    errored: u32,
) -> ToleranceVerdict {
    let total = passed + failed + errored;

    if total == 0 {
        return ToleranceVerdict {
            acceptable: false,
            pass_rate: 0.0,
            reason: "no tests executed".to_string(),
        };
    }

    let pass_rate = f64::from(passed) / f64::from(total);
    let percent = pass_rate * 100.0;

    if pass_rate >= policy.pass_rate_threshold {
        let sample = if total >= policy.min_sample_floor {
            "robust sample"
        } else {
            "thin sample"
        };
        ToleranceVerdict {
            acceptable: true,
            pass_rate,
            reason: format!(
                "acceptable pass rate: {percent:.1}% ({passed}/{total} tests passed, {sample})"
            ),
        }
    } else {
        ToleranceVerdict {
            acceptable: false,
            pass_rate,
            reason: format!(
                "insufficient pass rate: {percent:.1}% (threshold: {:.0}%)",
                policy.pass_rate_threshold * 100.0
            ),
        }
    }
}
