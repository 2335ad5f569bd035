//! Core domain model types.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage kind, stage status and dependency state enums
//! - Dependency specifications and their validation
//! - The default dependency catalog

mod catalog;
mod dependency;
mod status;

pub use catalog::{default_dependencies, ARMADILLO, KTHOHR, LAPACK};
pub use dependency::{
    validate_disjoint_outputs, validate_specs, ArchiveFormat, BuildLayout, BuildStep,
    DependencySpec, IncludeInstall,
};
pub use status::{DependencyState, StageKind, StageStatus};
