//! The fixed set of third-party libraries built for the model.

use super::dependency::{ArchiveFormat, BuildStep, DependencySpec, IncludeInstall};

/// Header-only linear algebra library.
pub const ARMADILLO: &str = "armadillo";
/// Reference BLAS/LAPACK.
pub const LAPACK: &str = "lapack";
/// Statistics and MCMC library.
pub const KTHOHR: &str = "kthohr";

/// Returns the three dependencies in build order.
///
/// The statistics library ships without a build file, so the working
/// directory must provide a `CMakeLists.txt` that is copied into its tree.
#[must_use]
pub fn default_dependencies() -> Vec<DependencySpec> {
    vec![
        DependencySpec::new(ARMADILLO, "armadillo-code-9.900.x", ArchiveFormat::Zip)
            .with_include(IncludeInstall::merged(
                "include",
                ["armadillo", "armadillo_bits"],
            )),
        DependencySpec::new(LAPACK, "lapack-3.9.0", ArchiveFormat::SevenZip)
            .with_build(BuildStep::out_of_source("build").with_artifact_dir("lib"))
            .with_artifact("libblas.a")
            .with_artifact("liblapack.a"),
        DependencySpec::new(KTHOHR, "kthohr", ArchiveFormat::SevenZip)
            .with_build(BuildStep::in_source().with_overlay("CMakeLists.txt"))
            .with_artifact("libkthohr.a")
            .with_include(IncludeInstall::into_subdir("include", KTHOHR)),
    ]
}
