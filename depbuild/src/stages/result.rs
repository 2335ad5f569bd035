//! Stage result types.

use crate::core::{StageKind, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file written into the target tree, with its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFile {
    /// Destination path.
    pub path: PathBuf,
    /// Hex-encoded SHA-256 of the file contents.
    pub sha256: String,
}

/// What a successful stage produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Log files written by tools during the stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<PathBuf>,
    /// Libraries installed during the stage.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed: Vec<InstalledFile>,
}

impl StageOutput {
    /// An output with nothing to report.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Records a log file.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<PathBuf>) -> Self {
        self.logs.push(log.into());
        self
    }

    /// Records an installed file.
    #[must_use]
    pub fn with_installed(mut self, file: InstalledFile) -> Self {
        self.installed.push(file);
        self
    }
}

/// Outcome of one stage applied to one dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Dependency name.
    pub dependency: String,
    /// Stage kind.
    pub stage: StageKind,
    /// Stage status.
    pub status: StageStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// What the stage produced.
    #[serde(default)]
    pub output: StageOutput,
    /// Error message if the stage did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a completed stage result.
    #[must_use]
    pub fn completed(
        dependency: impl Into<String>,
        stage: StageKind,
        started_at: DateTime<Utc>,
        output: StageOutput,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            stage,
            status: StageStatus::Ok,
            started_at,
            ended_at: Utc::now(),
            output,
            error: None,
        }
    }

    /// Creates a failed stage result.
    #[must_use]
    pub fn failed(
        dependency: impl Into<String>,
        stage: StageKind,
        started_at: DateTime<Utc>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            stage,
            status: StageStatus::Fail,
            started_at,
            ended_at: Utc::now(),
            output: StageOutput::empty(),
            error: Some(error.into()),
        }
    }

    /// Creates a result for a stage skipped because of cancellation.
    #[must_use]
    pub fn cancelled(
        dependency: impl Into<String>,
        stage: StageKind,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            dependency: dependency.into(),
            stage,
            status: StageStatus::Cancel,
            started_at: now,
            ended_at: now,
            output: StageOutput::empty(),
            error: Some(reason.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Ok
    }
}
