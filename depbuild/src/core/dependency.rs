//! Dependency specifications.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Compression format of a source archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// A `.zip` archive.
    Zip,
    /// A `.7z` archive.
    SevenZip,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::SevenZip => "7z",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where the generator runs relative to the extracted tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BuildLayout {
    /// A fresh directory inside the extracted tree, configured against `..`.
    OutOfSource {
        /// Directory name relative to the extracted tree.
        dir: String,
    },
    /// The extracted tree itself, configured against `.`.
    InSource,
}

/// How a compiled dependency is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Build directory layout.
    pub layout: BuildLayout,
    /// Files copied from the working directory into the extracted tree before configuring.
    #[serde(default)]
    pub overlay_files: Vec<String>,
    /// Directory holding the produced artifacts, relative to the build directory.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
}

fn default_artifact_dir() -> String {
    ".".to_string()
}

impl BuildStep {
    /// Creates an out-of-source build step.
    #[must_use]
    pub fn out_of_source(dir: impl Into<String>) -> Self {
        Self {
            layout: BuildLayout::OutOfSource { dir: dir.into() },
            overlay_files: Vec::new(),
            artifact_dir: default_artifact_dir(),
        }
    }

    /// Creates an in-source build step.
    #[must_use]
    pub fn in_source() -> Self {
        Self {
            layout: BuildLayout::InSource,
            overlay_files: Vec::new(),
            artifact_dir: default_artifact_dir(),
        }
    }

    /// Adds an overlay file.
    #[must_use]
    pub fn with_overlay(mut self, file: impl Into<String>) -> Self {
        self.overlay_files.push(file.into());
        self
    }

    /// Sets the artifact directory.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<String>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Returns the build directory for an extracted tree.
    #[must_use]
    pub fn build_dir(&self, source_dir: &Path) -> PathBuf {
        match &self.layout {
            BuildLayout::OutOfSource { dir } => source_dir.join(dir),
            BuildLayout::InSource => source_dir.to_path_buf(),
        }
    }

    /// Returns the source path argument handed to the generator.
    #[must_use]
    pub fn configure_target(&self) -> &'static str {
        match self.layout {
            BuildLayout::OutOfSource { .. } => "..",
            BuildLayout::InSource => ".",
        }
    }
}

/// A directory of headers installed under the target include path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeInstall {
    /// Directory relative to the extracted tree.
    pub source: String,
    /// Subdirectory under the include path; `None` merges into the include root.
    #[serde(default)]
    pub destination: Option<String>,
    /// Top-level entries a merge install owns under the include root.
    #[serde(default)]
    pub owned_entries: Vec<String>,
}

impl IncludeInstall {
    /// Installs `source` into its own subdirectory of the include path.
    #[must_use]
    pub fn into_subdir(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: Some(destination.into()),
            owned_entries: Vec::new(),
        }
    }

    /// Merges the contents of `source` into the include root.
    #[must_use]
    pub fn merged<I, S>(source: impl Into<String>, owned_entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.into(),
            destination: None,
            owned_entries: owned_entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Entries under the include root that belong to this install.
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        match &self.destination {
            Some(dest) => vec![dest.as_str()],
            None => self.owned_entries.iter().map(String::as_str).collect(),
        }
    }
}

/// One third-party dependency processed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Short name used in messages and errors.
    pub name: String,
    /// Archive file name without extension; also the name of the extracted tree.
    pub archive_stem: String,
    /// Archive format.
    pub format: ArchiveFormat,
    /// Build step, absent for header-only dependencies.
    #[serde(default)]
    pub build: Option<BuildStep>,
    /// Static libraries produced by the build.
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Header directories to install.
    #[serde(default)]
    pub includes: Vec<IncludeInstall>,
}

impl DependencySpec {
    /// Creates a header-only dependency with no artifacts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        archive_stem: impl Into<String>,
        format: ArchiveFormat,
    ) -> Self {
        Self {
            name: name.into(),
            archive_stem: archive_stem.into(),
            format,
            build: None,
            artifacts: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// Sets the build step.
    #[must_use]
    pub fn with_build(mut self, build: BuildStep) -> Self {
        self.build = Some(build);
        self
    }

    /// Adds a produced artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifacts.push(artifact.into());
        self
    }

    /// Adds an include installation.
    #[must_use]
    pub fn with_include(mut self, include: IncludeInstall) -> Self {
        self.includes.push(include);
        self
    }

    /// Archive file name, e.g. `lapack-3.9.0.7z`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.{}", self.archive_stem, self.format.extension())
    }

    /// Archive location inside the working directory.
    #[must_use]
    pub fn archive_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.archive_file_name())
    }

    /// Extracted tree inside the working directory.
    #[must_use]
    pub fn source_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.archive_stem)
    }

    /// Directory where built artifacts are found.
    #[must_use]
    pub fn artifact_dir(&self, work_dir: &Path) -> PathBuf {
        let source = self.source_dir(work_dir);
        match &self.build {
            Some(build) => build.build_dir(&source).join(&build.artifact_dir),
            None => source,
        }
    }

    /// Returns true if the dependency has a build step.
    #[must_use]
    pub fn needs_build(&self) -> bool {
        self.build.is_some()
    }
}

/// Rejects a path field that could escape the directory it is joined onto.
///
/// Only plain relative components are accepted. `allow_current` admits the
/// single value `.`, used for directories that are read but never removed.
fn check_relative(
    spec: &DependencySpec,
    field: &str,
    value: &str,
    allow_current: bool,
) -> Result<(), ConfigError> {
    if allow_current && value == "." {
        return Ok(());
    }
    let path = Path::new(value);
    let plain = path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    let dotted = value
        .split(['/', '\\'])
        .any(|part| part.is_empty() || part == "." || part == "..");
    if plain && !dotted {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!(
        "dependency '{}' has an unsafe {field} '{value}': \
         expected a relative path without '.' or '..'",
        spec.name
    )))
}

fn check_paths(spec: &DependencySpec) -> Result<(), ConfigError> {
    check_relative(spec, "archive name", &spec.archive_stem, false)?;
    for artifact in &spec.artifacts {
        check_relative(spec, "artifact", artifact, false)?;
    }
    for include in &spec.includes {
        check_relative(spec, "include source", &include.source, true)?;
        if let Some(dest) = &include.destination {
            check_relative(spec, "include destination", dest, false)?;
        } else if include.owned_entries.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "dependency '{}' merges headers without naming the entries it owns",
                spec.name
            )));
        }
        for entry in &include.owned_entries {
            check_relative(spec, "include entry", entry, false)?;
        }
    }
    if let Some(build) = &spec.build {
        if let BuildLayout::OutOfSource { dir } = &build.layout {
            check_relative(spec, "build directory", dir, false)?;
        }
        for overlay in &build.overlay_files {
            check_relative(spec, "overlay file", overlay, false)?;
        }
        check_relative(spec, "artifact directory", &build.artifact_dir, true)?;
    }
    Ok(())
}

/// Validates an ordered list of dependency specifications.
///
/// Every path a spec contributes is joined onto the working directory or a
/// target directory and later removed by the clean stage, so each must be a
/// plain relative path.
///
/// # Errors
///
/// Returns an error if a name or archive stem is empty or duplicated, or if a
/// path field is empty, absolute or contains `.` or `..`.
pub fn validate_specs(specs: &[DependencySpec]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut stems = HashSet::new();

    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "dependency name cannot be empty".to_string(),
            ));
        }
        if spec.archive_stem.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "dependency '{}' has an empty archive name",
                spec.name
            )));
        }
        check_paths(spec)?;
        if !names.insert(spec.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "dependency '{}' is declared twice",
                spec.name
            )));
        }
        if !stems.insert(spec.archive_stem.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "archive '{}' is used by more than one dependency",
                spec.archive_stem
            )));
        }
    }
    Ok(())
}

/// Validates that no two specifications install to the same location.
///
/// Required before dependencies are processed concurrently, since each
/// dependency cleans its own outputs.
///
/// # Errors
///
/// Returns an error naming the first shared artifact or include entry.
pub fn validate_disjoint_outputs(specs: &[DependencySpec]) -> Result<(), ConfigError> {
    let mut artifacts = HashSet::new();
    let mut entries = HashSet::new();

    for spec in specs {
        for artifact in &spec.artifacts {
            if !artifacts.insert(artifact.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "artifact '{artifact}' is produced by more than one dependency"
                )));
            }
        }
        for entry in spec.includes.iter().flat_map(IncludeInstall::entries) {
            if !entries.insert(entry) {
                return Err(ConfigError::Invalid(format!(
                    "include entry '{entry}' is installed by more than one dependency"
                )));
            }
        }
    }
    Ok(())
}
