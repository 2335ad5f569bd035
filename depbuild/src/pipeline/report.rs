//! Run reports.

use crate::core::DependencyState;
use crate::errors::BuildError;
use crate::stages::{InstalledFile, StageResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What happened to one dependency during a run.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    /// Dependency name.
    pub name: String,
    /// Final state.
    pub state: DependencyState,
    /// One result per stage that was attempted.
    pub stages: Vec<StageResult>,
}

impl DependencyReport {
    /// Creates a report for a dependency that has not started.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: DependencyState::Pending,
            stages: Vec::new(),
        }
    }

    /// Libraries installed for this dependency.
    pub fn installed(&self) -> impl Iterator<Item = &InstalledFile> {
        self.stages.iter().flat_map(|stage| stage.output.installed.iter())
    }

    /// Returns true if the dependency was installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.state == DependencyState::Installed
    }
}

/// Outcome of a whole pipeline run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Identifier of the run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
    /// One report per dependency that entered the pipeline, in input order.
    pub dependencies: Vec<DependencyReport>,
    /// Errors that ended the run; empty on success.
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<BuildError>,
}

fn serialize_errors<S>(errors: &[BuildError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}

impl RunReport {
    /// Starts a new, empty report.
    #[must_use]
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            ended_at: now,
            dependencies: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Marks the report as finished.
    pub fn finish(&mut self) {
        self.ended_at = Utc::now();
    }

    /// Returns true if every dependency was installed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Looks up the report of a dependency.
    #[must_use]
    pub fn dependency(&self, name: &str) -> Option<&DependencyReport> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    /// Returns the first error, if any.
    #[must_use]
    pub fn first_error(&self) -> Option<&BuildError> {
        self.errors.first()
    }

    /// Converts the report into the run result, keeping the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error that ended the run.
    pub fn into_result(self) -> Result<(), BuildError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
