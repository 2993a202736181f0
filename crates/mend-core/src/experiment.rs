//! Append-only JSONL trace of agent actions.
//!
//! Every audit, generation, fix, and test-execution action is recorded for
//! later analysis. Logging must never fail the run; write errors degrade
//! to a tracing warning.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What kind of action an agent performed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Analysis,
    Generation,
    Fix,
    Debug,
}

/// Whether the action succeeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failure,
}

/// One line of the experiment trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub model: String,
    pub action: ActionKind,
    pub status: ActionStatus,
    pub details: serde_json::Value,
}

impl ExperimentRecord {
    pub fn new(
        agent: impl Into<String>,
        model: impl Into<String>,
        action: ActionKind,
        status: ActionStatus,
        details: serde_json::Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            agent: agent.into(),
            model: model.into(),
            action,
            status,
            details,
        }
    }
}

/// JSONL writer for [`ExperimentRecord`]s.
pub struct ExperimentLogger {
    target: Option<Mutex<PathBuf>>,
}

impl ExperimentLogger {
    /// Log to `path`, creating parent directories on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Some(Mutex::new(path.into())),
        }
    }

    /// A logger that drops every record. Useful in tests.
    pub fn disabled() -> Self {
        Self { target: None }
    }

    /// Append one record.
    pub fn record(&self, record: ExperimentRecord) {
        let Some(target) = &self.target else {
            return;
        };

        let path = match target.lock() {
            Ok(path) => path,
            Err(_) => return,
        };

        if let Err(e) = append_line(&path, &record) {
            warn!(error = %e, path = %path.display(), "failed to append experiment record");
        }
    }
}

fn append_line(path: &Path, record: &ExperimentRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let line = serde_json::to_string(record)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}
