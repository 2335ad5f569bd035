//! A scripted toolchain that imitates extractors and build tools on disk.

use crate::config::{BuildContext, ToolchainConfig};
use crate::core::{DependencySpec, KTHOHR};
use crate::toolchain::{ToolInvocation, ToolOutcome, ToolRunner};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

type FakeTree = Vec<(String, Vec<u8>)>;

fn to_tree(files: &[(&str, &str)]) -> FakeTree {
    files
        .iter()
        .map(|(path, contents)| ((*path).to_string(), contents.as_bytes().to_vec()))
        .collect()
}

fn write_tree(root: &Path, tree: &FakeTree) -> io::Result<()> {
    for (relative, contents) in tree {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }
    Ok(())
}

/// A [`ToolRunner`] that never spawns processes.
///
/// Running an extractor whose arguments name a registered archive writes that
/// archive's files under the invocation directory. Running the make program
/// in a directory ending with a registered suffix writes that build's outputs.
/// Every invocation with a log gets a log file.
#[derive(Debug)]
pub struct FakeToolRunner {
    make_program: String,
    archives: Mutex<HashMap<String, FakeTree>>,
    builds: Mutex<Vec<(PathBuf, FakeTree)>>,
    failures: Mutex<HashMap<String, i32>>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl FakeToolRunner {
    /// Creates a runner that treats `make_program` as the build tool.
    #[must_use]
    pub fn new(make_program: impl Into<String>) -> Self {
        Self {
            make_program: make_program.into(),
            archives: Mutex::new(HashMap::new()),
            builds: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates a runner scripted for the default dependency catalog.
    #[must_use]
    pub fn for_catalog(toolchain: &ToolchainConfig) -> Self {
        Self::new(toolchain.make.program.clone())
            .with_archive(
                "armadillo-code-9.900.x.zip",
                &[
                    (
                        "armadillo-code-9.900.x/include/armadillo",
                        "#include \"armadillo_bits/config.hpp\"\n",
                    ),
                    (
                        "armadillo-code-9.900.x/include/armadillo_bits/config.hpp",
                        "#define ARMA_USE_LAPACK\n",
                    ),
                    ("armadillo-code-9.900.x/README.md", "Armadillo\n"),
                ],
            )
            .with_archive(
                "lapack-3.9.0.7z",
                &[("lapack-3.9.0/CMakeLists.txt", "project(LAPACK)\n")],
            )
            .with_build_output(
                "lapack-3.9.0/build",
                &[("lib/libblas.a", "!<arch>\nblas"), ("lib/liblapack.a", "!<arch>\nlapack")],
            )
            .with_archive(
                "kthohr.7z",
                &[
                    ("kthohr/include/mcmc.hpp", "namespace mcmc {}\n"),
                    ("kthohr/include/misc/mcmc_options.hpp", "#pragma once\n"),
                    ("kthohr/src/rwmh.cpp", "// rwmh\n"),
                ],
            )
            .with_build_output(KTHOHR, &[("libkthohr.a", "!<arch>\nkthohr")])
    }

    /// Registers the files an archive extracts to, relative to the working directory.
    #[must_use]
    pub fn with_archive(self, archive: &str, files: &[(&str, &str)]) -> Self {
        self.archives.lock().insert(archive.to_string(), to_tree(files));
        self
    }

    /// Registers the files the build tool writes in a directory ending with `dir_suffix`.
    #[must_use]
    pub fn with_build_output(self, dir_suffix: impl Into<PathBuf>, files: &[(&str, &str)]) -> Self {
        self.builds.lock().push((dir_suffix.into(), to_tree(files)));
        self
    }

    /// Makes every invocation of `program` exit with `code`.
    #[must_use]
    pub fn failing(self, program: impl Into<String>, code: i32) -> Self {
        self.failures.lock().insert(program.into(), code);
        self
    }

    /// Returns every invocation seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }

    /// Returns the command lines seen so far.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToolInvocation::command_line).collect()
    }

    /// Forgets recorded invocations.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl ToolRunner for FakeToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> io::Result<ToolOutcome> {
        self.calls.lock().push(invocation.clone());

        if let Some(log) = &invocation.log {
            fs::write(log, format!("{}\n", invocation.command_line()))?;
        }

        if let Some(code) = self.failures.lock().get(&invocation.program) {
            return Ok(ToolOutcome::exit(*code));
        }

        let archive_tree = {
            let archives = self.archives.lock();
            invocation
                .args
                .iter()
                .find_map(|arg| archives.get(arg).cloned())
        };
        if let Some(tree) = archive_tree {
            write_tree(&invocation.cwd, &tree)?;
            return Ok(ToolOutcome::success());
        }

        if invocation.program == self.make_program {
            let builds = self.builds.lock();
            for (suffix, tree) in builds.iter() {
                if invocation.cwd.ends_with(suffix) {
                    write_tree(&invocation.cwd, tree)?;
                }
            }
        }

        Ok(ToolOutcome::success())
    }
}

/// Prepares a working directory for the given dependencies.
///
/// Creates the working directory, an archive file for every dependency except those
/// named in `omit`, and every overlay file a build step needs.
pub fn seed_work_dir(
    ctx: &BuildContext,
    specs: &[DependencySpec],
    omit: &[&str],
) -> io::Result<()> {
    fs::create_dir_all(&ctx.work_dir)?;
    for spec in specs {
        if !omit.contains(&spec.name.as_str()) {
            fs::write(spec.archive_path(&ctx.work_dir), b"archive")?;
        }
        if let Some(build) = &spec.build {
            for overlay in &build.overlay_files {
                fs::write(ctx.work_dir.join(overlay), b"add_library(kthohr STATIC)\n")?;
            }
        }
    }
    Ok(())
}
