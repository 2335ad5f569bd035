//! Archive extraction.

use super::{Stage, StageContext, StageOutput};
use crate::core::{DependencySpec, StageKind};
use crate::errors::BuildError;
use crate::toolchain::ToolInvocation;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Log file receiving extractor output for a dependency.
#[must_use]
pub fn extraction_log(spec: &DependencySpec, work_dir: &Path) -> PathBuf {
    work_dir.join(format!("{}_unzip.log", spec.name))
}

/// Decompresses the archive into the working directory with the extractor
/// configured for its format.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStage;

impl Stage for ExtractStage {
    fn kind(&self) -> StageKind {
        StageKind::Extract
    }

    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError> {
        let work_dir = &ctx.build.work_dir;
        let log = extraction_log(spec, work_dir);
        let extractor = ctx.build.toolchain.extractor(spec.format);

        info!(dependency = %spec.name, archive = %spec.archive_file_name(), "Decompressing");

        let invocation =
            ToolInvocation::from_command(extractor, [spec.archive_file_name()], work_dir.clone())
                .with_log(&log);

        let failure = |reason: String| BuildError::ExtractionFailure {
            name: spec.name.clone(),
            reason,
            log: Some(log.clone()),
        };

        let outcome = ctx
            .tools
            .run(&invocation)
            .map_err(|e| failure(format!("could not run '{}': {e}", extractor.program)))?;

        if !outcome.is_success() {
            warn!(
                dependency = %spec.name,
                log = %log.display(),
                "Extractor {}", outcome.describe()
            );
            return Err(failure(format!("'{}' {}", extractor.program, outcome.describe())));
        }

        let source_dir = spec.source_dir(work_dir);
        if !source_dir.is_dir() {
            return Err(failure(format!(
                "archive did not contain {}",
                source_dir.display()
            )));
        }

        Ok(StageOutput::empty().with_log(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildContext;
    use crate::core::default_dependencies;
    use crate::testing::FakeToolRunner;
    use crate::toolchain::{MockToolRunner, ToolOutcome};

    #[test]
    fn test_extract_uses_format_tool() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let tools = FakeToolRunner::for_catalog(&build.toolchain);
        let ctx = StageContext::new(&build, &tools);
        let specs = default_dependencies();

        let output = ExtractStage.execute(&specs[0], &ctx).unwrap();
        ExtractStage.execute(&specs[1], &ctx).unwrap();

        assert_eq!(
            tools.command_lines(),
            vec![
                "unzip -o armadillo-code-9.900.x.zip",
                "7za x -bd -y lapack-3.9.0.7z",
            ]
        );
        assert_eq!(output.logs, vec![dir.path().join("armadillo_unzip.log")]);
        assert!(dir.path().join("armadillo-code-9.900.x/include/armadillo").is_file());
        assert!(tools.calls().iter().all(|call| call.cwd == dir.path()));
    }

    #[test]
    fn test_non_zero_exit_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let specs = default_dependencies();

        let mut tools = MockToolRunner::new();
        tools
            .expect_run()
            .times(1)
            .returning(|_| Ok(ToolOutcome::exit(2)));
        let ctx = StageContext::new(&build, &tools);

        let err = ExtractStage.execute(&specs[1], &ctx).unwrap_err();
        match err {
            BuildError::ExtractionFailure { name, reason, log } => {
                assert_eq!(name, "lapack");
                assert!(reason.contains("exited with status 2"));
                assert_eq!(log, Some(dir.path().join("lapack_unzip.log")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_launch_failure_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let specs = default_dependencies();

        let mut tools = MockToolRunner::new();
        tools.expect_run().returning(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"))
        });
        let ctx = StageContext::new(&build, &tools);

        let err = ExtractStage.execute(&specs[2], &ctx).unwrap_err();
        assert!(matches!(err, BuildError::ExtractionFailure { .. }));
        assert!(err.to_string().contains("could not run '7za'"));
    }

    #[test]
    fn test_missing_tree_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let tools = FakeToolRunner::new("make");
        let ctx = StageContext::new(&build, &tools);
        let specs = default_dependencies();

        let err = ExtractStage.execute(&specs[2], &ctx).unwrap_err();
        assert!(err.to_string().contains("archive did not contain"));
    }
}
