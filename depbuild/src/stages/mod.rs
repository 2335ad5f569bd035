//! Stage trait and the five pipeline stages.
//!
//! Each dependency goes through clean, verify, extract, build (compiled
//! dependencies only) and install, in that order.

mod build;
mod clean;
mod extract;
mod install;
mod result;
mod verify;

pub use build::{BuildStage, COMPILE_LOG, CONFIGURE_LOG};
pub use clean::CleanStage;
pub use extract::{extraction_log, ExtractStage};
pub use install::InstallStage;
pub use result::{InstalledFile, StageOutput, StageResult};
pub use verify::VerifyStage;

use crate::config::BuildContext;
use crate::core::{DependencySpec, StageKind};
use crate::errors::BuildError;
use crate::toolchain::ToolRunner;
use std::fmt::Debug;

/// Everything a stage may read while it runs.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    /// Paths and toolchain settings.
    pub build: &'a BuildContext,
    /// Runner for external tools.
    pub tools: &'a dyn ToolRunner,
}

impl<'a> StageContext<'a> {
    /// Creates a new stage context.
    #[must_use]
    pub fn new(build: &'a BuildContext, tools: &'a dyn ToolRunner) -> Self {
        Self { build, tools }
    }
}

impl Debug for StageContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("build", self.build)
            .finish_non_exhaustive()
    }
}

/// Trait for pipeline stages.
///
/// Stages are stateless; all inputs come from the dependency and the context.
/// Paths are always derived from the context, never from the process working
/// directory.
pub trait Stage: Send + Sync + Debug {
    /// Returns the kind of the stage.
    fn kind(&self) -> StageKind;

    /// Executes the stage for one dependency.
    ///
    /// # Errors
    ///
    /// Returns the error that aborts the dependency.
    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError>;
}

/// Returns the stages a dependency goes through, in order.
#[must_use]
pub fn stages_for(spec: &DependencySpec) -> Vec<&'static dyn Stage> {
    let mut stages: Vec<&'static dyn Stage> = vec![&CleanStage, &VerifyStage, &ExtractStage];
    if spec.needs_build() {
        stages.push(&BuildStage);
    }
    stages.push(&InstallStage);
    stages
}
