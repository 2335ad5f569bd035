//! Removal of previously installed outputs.

use super::{Stage, StageContext, StageOutput};
use crate::core::{DependencySpec, StageKind};
use crate::errors::BuildError;
use crate::utils::remove_path;
use std::path::PathBuf;
use tracing::{debug, info};

/// Removes everything a previous run installed or extracted for a dependency.
///
/// Absent paths are not an error, so running the stage twice is harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanStage;

impl CleanStage {
    /// Paths owned by the dependency in the target tree and working directory.
    #[must_use]
    pub fn owned_paths(spec: &DependencySpec, ctx: &StageContext<'_>) -> Vec<PathBuf> {
        let include_dir = ctx.build.include_dir();
        let mut paths: Vec<PathBuf> = spec
            .includes
            .iter()
            .flat_map(|include| include.entries())
            .map(|entry| include_dir.join(entry))
            .collect();

        for lib_dir in ctx.build.lib_dirs() {
            paths.extend(spec.artifacts.iter().map(|artifact| lib_dir.join(artifact)));
        }

        paths.push(spec.source_dir(&ctx.build.work_dir));
        paths
    }
}

impl Stage for CleanStage {
    fn kind(&self) -> StageKind {
        StageKind::Clean
    }

    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError> {
        info!(dependency = %spec.name, "Cleaning up old files");

        for path in Self::owned_paths(spec, ctx) {
            let removed = remove_path(&path)
                .map_err(|e| BuildError::io(format!("removing {}", path.display()), e))?;
            if removed {
                debug!(dependency = %spec.name, path = %path.display(), "Removed");
            }
        }
        Ok(StageOutput::empty())
    }
}
