//! Generator and make invocation for compiled dependencies.

use super::{Stage, StageContext, StageOutput};
use crate::config::ToolCommand;
use crate::core::{BuildStep, DependencySpec, StageKind};
use crate::errors::BuildError;
use crate::toolchain::ToolInvocation;
use crate::utils::copy_file;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Log file receiving generator output, inside the build directory.
pub const CONFIGURE_LOG: &str = "configure.log";
/// Log file receiving build tool output, inside the build directory.
pub const COMPILE_LOG: &str = "compile.log";

/// Configures and compiles a dependency.
///
/// Overlay files are copied into the extracted tree first, then the generator
/// and the build tool run in the build directory. Both exit codes are checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStage;

impl BuildStage {
    fn copy_overlays(
        spec: &DependencySpec,
        step: &BuildStep,
        work_dir: &Path,
    ) -> Result<(), BuildError> {
        let source_dir = spec.source_dir(work_dir);
        for overlay in &step.overlay_files {
            let from = work_dir.join(overlay);
            if !from.is_file() {
                return Err(BuildError::BuildFailure {
                    name: spec.name.clone(),
                    reason: format!("build file {} is missing", from.display()),
                    log: None,
                });
            }
            copy_file(&from, &source_dir.join(overlay))
                .map_err(|e| BuildError::io(format!("copying {}", from.display()), e))?;
        }
        Ok(())
    }

    fn run_tool(
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
        command: &ToolCommand,
        extra: &[&str],
        cwd: &Path,
        log: PathBuf,
    ) -> Result<PathBuf, BuildError> {
        let invocation = ToolInvocation::from_command(command, extra.iter().copied(), cwd)
            .with_log(&log);

        let failure = |reason: String| BuildError::BuildFailure {
            name: spec.name.clone(),
            reason,
            log: Some(log.clone()),
        };

        let outcome = ctx
            .tools
            .run(&invocation)
            .map_err(|e| failure(format!("could not run '{}': {e}", command.program)))?;

        if !outcome.is_success() {
            warn!(
                dependency = %spec.name,
                log = %log.display(),
                "{} {}", command.program, outcome.describe()
            );
            return Err(failure(format!("'{}' {}", command.program, outcome.describe())));
        }
        Ok(log)
    }
}

impl Stage for BuildStage {
    fn kind(&self) -> StageKind {
        StageKind::Build
    }

    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError> {
        let Some(step) = &spec.build else {
            return Ok(StageOutput::empty());
        };
        let work_dir = &ctx.build.work_dir;
        let toolchain = &ctx.build.toolchain;

        Self::copy_overlays(spec, step, work_dir)?;

        let build_dir = step.build_dir(&spec.source_dir(work_dir));
        fs::create_dir_all(&build_dir)
            .map_err(|e| BuildError::io(format!("creating {}", build_dir.display()), e))?;

        let compile_log = build_dir.join(COMPILE_LOG);
        info!(
            dependency = %spec.name,
            "Building {} - check {} for progress", spec.name, compile_log.display()
        );
        info!(
            dependency = %spec.name,
            "Generator command: {} {}", toolchain.generator.display(), step.configure_target()
        );

        let configure_log = Self::run_tool(
            spec,
            ctx,
            &toolchain.generator,
            &[step.configure_target()],
            &build_dir,
            build_dir.join(CONFIGURE_LOG),
        )?;

        info!(dependency = %spec.name, "Compiling");
        let compile_log = Self::run_tool(spec, ctx, &toolchain.make, &[], &build_dir, compile_log)?;

        Ok(StageOutput::empty()
            .with_log(configure_log)
            .with_log(compile_log))
    }
}
