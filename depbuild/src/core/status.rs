//! Stage kind, stage status and per-dependency state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The step a stage performs for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Remove previously installed outputs and the stale source tree.
    Clean,
    /// Check that the source archive is present.
    Verify,
    /// Decompress the archive into the working directory.
    Extract,
    /// Run the generator and the make tool.
    Build,
    /// Copy headers and libraries into the target tree.
    Install,
}

impl StageKind {
    /// All stage kinds in execution order.
    pub const ALL: [Self; 5] = [
        Self::Clean,
        Self::Verify,
        Self::Extract,
        Self::Build,
        Self::Install,
    ];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Verify => write!(f, "verify"),
            Self::Extract => write!(f, "extract"),
            Self::Build => write!(f, "build"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// The outcome status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage failed.
    Fail,
    /// Stage was cancelled before it ran.
    Cancel,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Fail => write!(f, "fail"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

/// Lifecycle of one dependency through the pipeline.
///
/// `Pending → Cleaned → Verified → Extracted → Built → Installed`, where `Built`
/// is skipped for header-only dependencies. Any failure ends in `Aborted`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum DependencyState {
    /// Not started.
    #[default]
    Pending,
    /// Old outputs removed.
    Cleaned,
    /// Archive found.
    Verified,
    /// Archive decompressed.
    Extracted,
    /// Build tools ran successfully.
    Built,
    /// Artifacts copied into the target tree.
    Installed,
    /// Processing stopped with the given reason.
    Aborted(String),
}

impl DependencyState {
    /// Returns the state reached after `kind` completes successfully.
    #[must_use]
    pub fn after(kind: StageKind) -> Self {
        match kind {
            StageKind::Clean => Self::Cleaned,
            StageKind::Verify => Self::Verified,
            StageKind::Extract => Self::Extracted,
            StageKind::Build => Self::Built,
            StageKind::Install => Self::Installed,
        }
    }

    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Installed | Self::Aborted(_))
    }

    /// Returns true if the dependency was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }
}

impl fmt::Display for DependencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Cleaned => write!(f, "cleaned"),
            Self::Verified => write!(f, "verified"),
            Self::Extracted => write!(f, "extracted"),
            Self::Built => write!(f, "built"),
            Self::Installed => write!(f, "installed"),
            Self::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Clean.to_string(), "clean");
        assert_eq!(StageKind::Extract.to_string(), "extract");
        assert_eq!(StageKind::Install.to_string(), "install");
    }

    #[test]
    fn test_stage_kind_order() {
        assert_eq!(StageKind::ALL.first(), Some(&StageKind::Clean));
        assert_eq!(StageKind::ALL.last(), Some(&StageKind::Install));
    }

    #[test]
    fn test_state_after_stage() {
        assert_eq!(DependencyState::after(StageKind::Verify), DependencyState::Verified);
        assert_eq!(DependencyState::after(StageKind::Build), DependencyState::Built);
        assert!(DependencyState::after(StageKind::Install).is_terminal());
        assert!(!DependencyState::after(StageKind::Extract).is_terminal());
    }

    #[test]
    fn test_aborted_state() {
        let state = DependencyState::Aborted("archive missing".to_string());
        assert!(state.is_terminal());
        assert!(state.is_aborted());
        assert_eq!(state.to_string(), "aborted: archive missing");
    }

    #[test]
    fn test_state_serialize() {
        let json = serde_json::to_string(&DependencyState::Installed).unwrap();
        assert_eq!(json, r#"{"state":"installed"}"#);

        let json = serde_json::to_string(&StageStatus::Cancel).unwrap();
        assert_eq!(json, r#""cancel""#);
    }
}
