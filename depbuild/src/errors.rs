//! Error types for the dependency build pipeline.
//!
//! Every stage failure is mapped onto [`BuildError`]. The pipeline is fail-fast:
//! the first error ends the run and is returned to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The source archive for a dependency was not found in the working directory.
    #[error("Unable to decompress {name}: archive {} not found", path.display())]
    MissingArchive {
        /// Dependency name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },

    /// The extractor could not be launched, exited non-zero, or produced no tree.
    #[error("Failed to extract {name}: {reason}")]
    ExtractionFailure {
        /// Dependency name.
        name: String,
        /// What went wrong.
        reason: String,
        /// Log file holding the extractor output, if one was written.
        log: Option<PathBuf>,
    },

    /// The generator or the make tool could not be launched or exited non-zero.
    #[error("Failed to build {name}: {reason}")]
    BuildFailure {
        /// Dependency name.
        name: String,
        /// What went wrong.
        reason: String,
        /// Log file holding the tool output, if one was written.
        log: Option<PathBuf>,
    },

    /// A declared artifact or include directory was not present at install time.
    #[error("{name}: expected {} was not produced", path.display())]
    MissingArtifact {
        /// Dependency name.
        name: String,
        /// Path that was expected.
        path: PathBuf,
    },

    /// A program required by the toolchain is not on `PATH`.
    #[error("Required tool '{tool}' was not found on PATH")]
    ToolNotFound {
        /// Program name as configured.
        tool: String,
    },

    /// The run was cancelled before the dependency finished.
    #[error("{name} cancelled: {reason}")]
    Cancelled {
        /// Dependency name.
        name: String,
        /// Cancellation reason.
        reason: String,
    },

    /// A configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A filesystem operation failed.
    #[error("IO error while {context}: {source}")]
    Io {
        /// What the pipeline was doing.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildError {
    /// Wraps an IO error with a description of the failed operation.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the dependency this error is attributed to, if any.
    #[must_use]
    pub fn dependency(&self) -> Option<&str> {
        match self {
            Self::MissingArchive { name, .. }
            | Self::ExtractionFailure { name, .. }
            | Self::BuildFailure { name, .. }
            | Self::MissingArtifact { name, .. }
            | Self::Cancelled { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the log file associated with a tool failure.
    #[must_use]
    pub fn log_path(&self) -> Option<&PathBuf> {
        match self {
            Self::ExtractionFailure { log, .. } | Self::BuildFailure { log, .. } => log.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the error is a cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors raised while loading or validating a [`crate::config::BuildContext`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration {}: {source}", path.display())]
    Read {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but is not usable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
