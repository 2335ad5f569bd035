//! Copying headers and libraries into the target tree.

use super::{InstalledFile, Stage, StageContext, StageOutput};
use crate::core::{DependencySpec, StageKind};
use crate::errors::BuildError;
use crate::utils::{copy_file, copy_tree, sha256_file};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Installs include directories and artifacts, overwriting existing files.
///
/// Every artifact is copied into both the debug and the release library path.
/// Merged includes copy only the entries the dependency owns. All sources are
/// checked before anything is copied.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallStage;

/// A header file or directory to copy into the include tree.
#[derive(Debug)]
struct HeaderCopy {
    from: PathBuf,
    to: PathBuf,
}

fn missing(spec: &DependencySpec, path: PathBuf) -> BuildError {
    BuildError::MissingArtifact {
        name: spec.name.clone(),
        path,
    }
}

impl InstallStage {
    fn plan_headers(
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<HeaderCopy>, BuildError> {
        let source_dir = spec.source_dir(&ctx.build.work_dir);
        let include_dir = ctx.build.include_dir();
        let mut copies = Vec::new();

        for include in &spec.includes {
            let from = source_dir.join(&include.source);
            if !from.is_dir() {
                return Err(missing(spec, from));
            }
            match &include.destination {
                Some(dest) => copies.push(HeaderCopy {
                    from,
                    to: include_dir.join(dest),
                }),
                None => {
                    for entry in &include.owned_entries {
                        let entry_from = from.join(entry);
                        if !entry_from.exists() {
                            return Err(missing(spec, entry_from));
                        }
                        copies.push(HeaderCopy {
                            from: entry_from,
                            to: include_dir.join(entry),
                        });
                    }
                }
            }
        }
        Ok(copies)
    }
}

impl Stage for InstallStage {
    fn kind(&self) -> StageKind {
        StageKind::Install
    }

    fn execute(
        &self,
        spec: &DependencySpec,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutput, BuildError> {
        info!(dependency = %spec.name, "Moving files across");

        let headers = Self::plan_headers(spec, ctx)?;
        let artifact_dir = spec.artifact_dir(&ctx.build.work_dir);
        let artifacts = spec
            .artifacts
            .iter()
            .map(|artifact| {
                let from = artifact_dir.join(artifact);
                if from.is_file() {
                    Ok((from, artifact))
                } else {
                    Err(missing(spec, from))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        for header in &headers {
            let result = if header.from.is_dir() {
                copy_tree(&header.from, &header.to).map(|files| files.len())
            } else {
                copy_file(&header.from, &header.to).map(|_| 1)
            };
            let copied = result
                .map_err(|e| BuildError::io(format!("copying {}", header.from.display()), e))?;
            debug!(
                dependency = %spec.name,
                files = copied,
                to = %header.to.display(),
                "Installed headers"
            );
        }

        let mut output = StageOutput::empty();
        for (from, artifact) in artifacts {
            for lib_dir in ctx.build.lib_dirs() {
                fs::create_dir_all(&lib_dir)
                    .map_err(|e| BuildError::io(format!("creating {}", lib_dir.display()), e))?;
                let to = lib_dir.join(artifact);
                copy_file(&from, &to)
                    .map_err(|e| BuildError::io(format!("copying {}", from.display()), e))?;
                let sha256 = sha256_file(&to)
                    .map_err(|e| BuildError::io(format!("hashing {}", to.display()), e))?;
                output = output.with_installed(InstalledFile { path: to, sha256 });
            }
        }

        Ok(output)
    }
}
