//! # Depbuild
//!
//! Prepares the third-party numerical libraries a model links against.
//!
//! Each dependency is taken from an archive in a working directory and run
//! through a fixed stage sequence:
//!
//! - **Clean**: remove headers, libraries and sources left by earlier runs
//! - **Verify**: require the archive to be present
//! - **Extract**: decompress with the extractor configured for its format
//! - **Build**: generate build files and compile (compiled libraries only)
//! - **Install**: copy headers into the include path and libraries into
//!   both the debug and release library paths
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use depbuild::prelude::*;
//!
//! let ctx = BuildContext::new("ThirdParty/work", "include", "lib/debug", "lib/release");
//! let pipeline = Pipeline::system();
//! pipeline.run(&default_dependencies(), &ctx)?;
//! # Ok::<(), depbuild::errors::BuildError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod toolchain;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{BuildContext, ToolCommand, ToolchainConfig};
    pub use crate::core::{
        default_dependencies, ArchiveFormat, BuildLayout, BuildStep, DependencySpec,
        DependencyState, IncludeInstall, StageKind, StageStatus,
    };
    pub use crate::errors::{BuildError, ConfigError};
    pub use crate::events::{
        BuildEvent, CollectingEventSink, EventKind, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{ConcurrentPipeline, FailureMode, Pipeline, RunReport};
    pub use crate::stages::Stage;
    pub use crate::toolchain::{check_toolchain, SystemToolRunner, ToolRunner};
}
