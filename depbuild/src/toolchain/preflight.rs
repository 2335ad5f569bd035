//! Host tool checks run before a build.

use crate::config::{BuildContext, ToolCommand};
use crate::core::DependencySpec;
use crate::errors::BuildError;
use tracing::{debug, info};

/// Returns the programs the given dependencies need, without duplicates.
#[must_use]
pub fn required_tools<'a>(specs: &[DependencySpec], ctx: &'a BuildContext) -> Vec<&'a ToolCommand> {
    let mut tools: Vec<&ToolCommand> = Vec::new();
    let mut push = |tool: &'a ToolCommand| {
        if !tools.iter().any(|t| t.program == tool.program) {
            tools.push(tool);
        }
    };

    for spec in specs {
        push(ctx.toolchain.extractor(spec.format));
        if spec.needs_build() {
            push(&ctx.toolchain.generator);
            push(&ctx.toolchain.make);
        }
    }
    tools
}

/// Checks that every program the dependencies need is on `PATH`.
///
/// # Errors
///
/// Returns [`BuildError::ToolNotFound`] for the first missing program.
pub fn check_toolchain(specs: &[DependencySpec], ctx: &BuildContext) -> Result<(), BuildError> {
    for tool in required_tools(specs, ctx) {
        match which::which(&tool.program) {
            Ok(path) => debug!(tool = %tool.program, path = %path.display(), "Found tool"),
            Err(_) => {
                return Err(BuildError::ToolNotFound {
                    tool: tool.program.clone(),
                })
            }
        }
    }
    info!("Toolchain preflight passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::core::{default_dependencies, ArchiveFormat};

    #[test]
    fn test_required_tools_for_catalog() {
        let ctx = BuildContext::new("w", "i", "d", "r");
        let programs: Vec<_> = required_tools(&default_dependencies(), &ctx)
            .into_iter()
            .map(|t| t.program.as_str())
            .collect();
        assert_eq!(programs, vec!["unzip", "7za", "cmake", "make"]);
    }

    #[test]
    fn test_header_only_needs_no_build_tools() {
        let ctx = BuildContext::new("w", "i", "d", "r");
        let specs = default_dependencies();
        let programs: Vec<_> = required_tools(&specs[..1], &ctx)
            .into_iter()
            .map(|t| t.program.as_str())
            .collect();
        assert_eq!(programs, vec!["unzip"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_tool() {
        let toolchain = ToolchainConfig::default()
            .with_extractor(ArchiveFormat::SevenZip, ToolCommand::new("sh"))
            .with_generator(ToolCommand::new("sh"))
            .with_make(ToolCommand::new("depbuild-definitely-missing-make"));
        let ctx = BuildContext::new("w", "i", "d", "r").with_toolchain(toolchain);
        let specs = default_dependencies();

        let err = check_toolchain(&specs[1..2], &ctx).unwrap_err();
        assert!(matches!(
            err,
            BuildError::ToolNotFound { ref tool } if tool == "depbuild-definitely-missing-make"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_all_tools_present() {
        let toolchain = ToolchainConfig::default()
            .with_extractor(ArchiveFormat::Zip, ToolCommand::new("sh"));
        let ctx = BuildContext::new("w", "i", "d", "r").with_toolchain(toolchain);
        let specs = default_dependencies();

        assert!(check_toolchain(&specs[..1], &ctx).is_ok());
    }
}
