//! Digest-verified JSON artifacts for mission reports.
//!
//! Each artifact is written as pretty JSON next to a `.digest` sidecar
//! holding its SHA-256. Readers verify the digest before deserializing, so
//! a tampered or truncated report is detected instead of trusted.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::error::{MendError, Result};
use crate::domain::mission::MissionReport;

/// Hex SHA-256 of a byte slice.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Persist `<dir>/<mission_id>/mission.json` and its digest sidecar.
pub fn write_mission_artifact(report: &MissionReport, dir: &Path) -> Result<PathBuf> {
    let run_dir = dir.join(report.mission_id.to_string());
    std::fs::create_dir_all(&run_dir)?;

    let artifact_path = run_dir.join("mission.json");
    let digest_path = run_dir.join("mission.digest");
    let json = serde_json::to_vec_pretty(report)?;
    let digest = content_digest(&json);

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(&digest_path, digest.as_bytes())?;

    Ok(artifact_path)
}

/// Read and verify `<dir>/<mission_id>/mission.json`.
pub fn read_mission_artifact(mission_id: &str, dir: &Path) -> Result<MissionReport> {
    let run_dir = dir.join(mission_id);
    let artifact_path = run_dir.join("mission.json");
    let digest_path = run_dir.join("mission.digest");

    let json = std::fs::read(&artifact_path)?;
    let expected = std::fs::read_to_string(&digest_path)?;
    let actual = content_digest(&json);
    if expected.trim() != actual {
        return Err(MendError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
        assert_eq!(content_digest(b"abc").len(), 64);
    }

    #[test]
    fn test_artifact_roundtrip() {
        let mut report = MissionReport::begin("sandbox");
        report.finish();

        let dir = tempdir().expect("tempdir");
        let path = write_mission_artifact(&report, dir.path()).expect("write");
        assert!(path.exists());

        let loaded =
            read_mission_artifact(&report.mission_id.to_string(), dir.path()).expect("read");
        assert_eq!(loaded.mission_id, report.mission_id);
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let mut report = MissionReport::begin("sandbox");
        report.finish();

        let dir = tempdir().expect("tempdir");
        let path = write_mission_artifact(&report, dir.path()).expect("write");

        let mut content = std::fs::read_to_string(&path).expect("read");
        content.push(' ');
        std::fs::write(&path, content).expect("tamper");

        let err = read_mission_artifact(&report.mission_id.to_string(), dir.path()).unwrap_err();
        assert!(matches!(err, MendError::DigestMismatch { .. }));
    }
}
