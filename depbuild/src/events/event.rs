//! Typed pipeline events.

use crate::core::StageKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// What a [`BuildEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A run started.
    #[serde(rename = "pipeline.started")]
    PipelineStarted,
    /// Every dependency was installed.
    #[serde(rename = "pipeline.completed")]
    PipelineCompleted,
    /// The run ended with an error.
    #[serde(rename = "pipeline.failed")]
    PipelineFailed,
    /// A dependency entered the pipeline.
    #[serde(rename = "dependency.started")]
    DependencyStarted,
    /// A dependency reached the installed state.
    #[serde(rename = "dependency.installed")]
    DependencyInstalled,
    /// A dependency was aborted by a failure or a cancellation.
    #[serde(rename = "dependency.aborted")]
    DependencyAborted,
    /// A stage finished successfully.
    #[serde(rename = "stage.completed")]
    StageCompleted,
    /// A stage failed.
    #[serde(rename = "stage.failed")]
    StageFailed,
}

impl EventKind {
    /// Dotted event name, e.g. `stage.completed`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline.started",
            Self::PipelineCompleted => "pipeline.completed",
            Self::PipelineFailed => "pipeline.failed",
            Self::DependencyStarted => "dependency.started",
            Self::DependencyInstalled => "dependency.installed",
            Self::DependencyAborted => "dependency.aborted",
            Self::StageCompleted => "stage.completed",
            Self::StageFailed => "stage.failed",
        }
    }

    /// Returns true for events that report something going wrong.
    #[must_use]
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::PipelineFailed | Self::DependencyAborted | Self::StageFailed
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress event published by a pipeline.
///
/// Run events carry `run_id`; dependency and stage events carry the
/// dependency name and, for stage events, the stage kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// Event kind.
    pub kind: EventKind,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Run the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    /// Dependency the event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Stage the event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
    /// Error, cancellation reason or summary text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Duration of the stage or run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Files installed, for `dependency.installed`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
}

impl BuildEvent {
    /// Creates an event with no details.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            run_id: None,
            dependency: None,
            stage: None,
            message: None,
            duration_ms: None,
            paths: Vec::new(),
        }
    }

    /// Creates an event about a dependency.
    #[must_use]
    pub fn for_dependency(kind: EventKind, dependency: impl Into<String>) -> Self {
        let mut event = Self::new(kind);
        event.dependency = Some(dependency.into());
        event
    }

    /// Sets the run identifier.
    #[must_use]
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Sets the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageKind) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the installed files.
    #[must_use]
    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }
}
