//! Build context: target paths and toolchain settings.

use crate::core::ArchiveFormat;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An external program and its fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Program name or path.
    pub program: String,
    /// Arguments placed before any per-invocation arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds a leading argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Renders the command for log output.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Programs used to extract and build dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Build-file generator, e.g. `cmake -G "MinGW Makefiles"`.
    #[serde(default = "default_generator")]
    pub generator: ToolCommand,
    /// Build tool, e.g. `mingw32-make`.
    #[serde(default = "default_make")]
    pub make: ToolCommand,
    /// Extractor for `.zip` archives.
    #[serde(default = "default_unzip")]
    pub unzip: ToolCommand,
    /// Extractor for `.7z` archives.
    #[serde(default = "default_seven_zip")]
    pub seven_zip: ToolCommand,
}

fn default_generator() -> ToolCommand {
    ToolCommand::new("cmake")
}

fn default_make() -> ToolCommand {
    ToolCommand::new("make")
}

fn default_unzip() -> ToolCommand {
    ToolCommand::new("unzip").arg("-o")
}

fn default_seven_zip() -> ToolCommand {
    ToolCommand::new("7za").arg("x").arg("-bd").arg("-y")
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            make: default_make(),
            unzip: default_unzip(),
            seven_zip: default_seven_zip(),
        }
    }
}

impl ToolchainConfig {
    /// Returns the extractor for an archive format.
    #[must_use]
    pub fn extractor(&self, format: ArchiveFormat) -> &ToolCommand {
        match format {
            ArchiveFormat::Zip => &self.unzip,
            ArchiveFormat::SevenZip => &self.seven_zip,
        }
    }

    /// Sets the generator.
    #[must_use]
    pub fn with_generator(mut self, generator: ToolCommand) -> Self {
        self.generator = generator;
        self
    }

    /// Sets the build tool.
    #[must_use]
    pub fn with_make(mut self, make: ToolCommand) -> Self {
        self.make = make;
        self
    }

    /// Sets the extractor for a format.
    #[must_use]
    pub fn with_extractor(mut self, format: ArchiveFormat, command: ToolCommand) -> Self {
        match format {
            ArchiveFormat::Zip => self.unzip = command,
            ArchiveFormat::SevenZip => self.seven_zip = command,
        }
        self
    }

    fn commands(&self) -> [(&'static str, &ToolCommand); 4] {
        [
            ("generator", &self.generator),
            ("make", &self.make),
            ("unzip", &self.unzip),
            ("seven_zip", &self.seven_zip),
        ]
    }
}

/// Paths and toolchain settings consumed by the pipeline.
///
/// Relative target paths are resolved against `work_dir`; the pipeline never
/// changes the process working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    /// Directory holding the archives, where they are extracted and built.
    pub work_dir: PathBuf,
    /// Destination for headers.
    pub target_include_path: PathBuf,
    /// Destination for debug libraries.
    pub target_debug_lib_path: PathBuf,
    /// Destination for release libraries.
    pub target_release_lib_path: PathBuf,
    /// Toolchain programs.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

impl BuildContext {
    /// Creates a context with the default toolchain.
    #[must_use]
    pub fn new(
        work_dir: impl Into<PathBuf>,
        target_include_path: impl Into<PathBuf>,
        target_debug_lib_path: impl Into<PathBuf>,
        target_release_lib_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            target_include_path: target_include_path.into(),
            target_debug_lib_path: target_debug_lib_path.into(),
            target_release_lib_path: target_release_lib_path.into(),
            toolchain: ToolchainConfig::default(),
        }
    }

    /// Sets the toolchain.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: ToolchainConfig) -> Self {
        self.toolchain = toolchain;
        self
    }

    /// Parses a context from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the context is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let ctx: Self = serde_json::from_str(json)?;
        ctx.validate()?;
        Ok(ctx)
    }

    /// Loads a context from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid context.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks that every path and program is set.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = [
            ("work_dir", &self.work_dir),
            ("target_include_path", &self.target_include_path),
            ("target_debug_lib_path", &self.target_debug_lib_path),
            ("target_release_lib_path", &self.target_release_lib_path),
        ];
        for (field, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} cannot be empty")));
            }
        }
        for (field, command) in self.toolchain.commands() {
            if command.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "toolchain.{field}.program cannot be empty"
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }

    /// Resolved include destination.
    #[must_use]
    pub fn include_dir(&self) -> PathBuf {
        self.resolve(&self.target_include_path)
    }

    /// Resolved debug library destination.
    #[must_use]
    pub fn debug_lib_dir(&self) -> PathBuf {
        self.resolve(&self.target_debug_lib_path)
    }

    /// Resolved release library destination.
    #[must_use]
    pub fn release_lib_dir(&self) -> PathBuf {
        self.resolve(&self.target_release_lib_path)
    }

    /// Both library destinations, debug first.
    #[must_use]
    pub fn lib_dirs(&self) -> [PathBuf; 2] {
        [self.debug_lib_dir(), self.release_lib_dir()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_json() {
        let ctx = BuildContext::from_json_str(
            r#"{
                "work_dir": "/src/ThirdParty/kthohr",
                "target_include_path": "/out/include",
                "target_debug_lib_path": "/out/debug",
                "target_release_lib_path": "/out/release"
            }"#,
        )
        .unwrap();

        assert_eq!(ctx.toolchain, ToolchainConfig::default());
        assert_eq!(ctx.toolchain.seven_zip.display(), "7za x -bd -y");
        assert_eq!(ctx.include_dir(), PathBuf::from("/out/include"));
    }

    #[test]
    fn test_toolchain_override() {
        let ctx = BuildContext::from_json_str(
            r#"{
                "work_dir": "w",
                "target_include_path": "i",
                "target_debug_lib_path": "d",
                "target_release_lib_path": "r",
                "toolchain": {
                    "generator": {"program": "cmake", "args": ["-G", "MinGW Makefiles"]},
                    "make": {"program": "mingw32-make"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(ctx.toolchain.generator.args, vec!["-G", "MinGW Makefiles"]);
        assert_eq!(ctx.toolchain.make.program, "mingw32-make");
        assert_eq!(ctx.toolchain.unzip, default_unzip());
    }

    #[test]
    fn test_relative_targets_resolve_against_work_dir() {
        let ctx = BuildContext::new("/work", "include", "lib/debug", "/abs/release");
        assert_eq!(ctx.include_dir(), PathBuf::from("/work/include"));
        assert_eq!(ctx.debug_lib_dir(), PathBuf::from("/work/lib/debug"));
        assert_eq!(ctx.release_lib_dir(), PathBuf::from("/abs/release"));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let ctx = BuildContext::new("", "i", "d", "r");
        let err = ctx.validate().unwrap_err();
        assert!(err.to_string().contains("work_dir"));

        let ctx = BuildContext::new("w", "i", "d", "r").with_toolchain(
            ToolchainConfig::default().with_make(ToolCommand::new(" ")),
        );
        assert!(ctx.validate().unwrap_err().to_string().contains("make"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BuildContext::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = BuildContext::from_json_file("/nonexistent/depbuild.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_extractor_by_format() {
        let toolchain = ToolchainConfig::default()
            .with_extractor(ArchiveFormat::Zip, ToolCommand::new("bsdtar").arg("-xf"));
        assert_eq!(toolchain.extractor(ArchiveFormat::Zip).program, "bsdtar");
        assert_eq!(toolchain.extractor(ArchiveFormat::SevenZip).program, "7za");
    }
}
