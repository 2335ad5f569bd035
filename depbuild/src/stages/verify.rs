//! Archive presence check.

use super::{Stage, StageContext, StageOutput};
use crate::core::{DependencySpec, StageKind};
use crate::errors::BuildError;
use tracing::error;

/// Fails with [`BuildError::MissingArchive`] when the archive is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyStage;

impl Stage for VerifyStage {
    fn kind(&self) -> StageKind {
        StageKind::Verify
    }

    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError> {
        let path = spec.archive_path(&ctx.build.work_dir);
        if path.is_file() {
            return Ok(StageOutput::empty());
        }

        error!(
            dependency = %spec.name,
            archive = %path.display(),
            "Unable to decompress {}", spec.archive_file_name()
        );
        Err(BuildError::MissingArchive {
            name: spec.name.clone(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildContext;
    use crate::core::default_dependencies;
    use crate::testing::FakeToolRunner;

    #[test]
    fn test_present_archive() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let tools = FakeToolRunner::new("make");
        let specs = default_dependencies();
        std::fs::write(dir.path().join("lapack-3.9.0.7z"), b"7z").unwrap();

        let ctx = StageContext::new(&build, &tools);
        assert!(VerifyStage.execute(&specs[1], &ctx).is_ok());
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let tools = FakeToolRunner::new("make");
        let specs = default_dependencies();

        let ctx = StageContext::new(&build, &tools);
        let err = VerifyStage.execute(&specs[2], &ctx).unwrap_err();

        assert!(matches!(err, BuildError::MissingArchive { ref name, .. } if name == "kthohr"));
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn test_directory_is_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let build = BuildContext::new(dir.path(), "i", "d", "r");
        let tools = FakeToolRunner::new("make");
        let specs = default_dependencies();
        std::fs::create_dir(dir.path().join("kthohr.7z")).unwrap();

        let ctx = StageContext::new(&build, &tools);
        assert!(VerifyStage.execute(&specs[2], &ctx).is_err());
    }
}
