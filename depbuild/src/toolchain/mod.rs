//! External toolchain access.
//!
//! Extractors, the build-file generator and the make tool are reached only
//! through [`ToolRunner`], so stages never spawn processes directly.

mod preflight;
mod runner;

pub use preflight::{check_toolchain, required_tools};
#[cfg(test)]
pub use runner::MockToolRunner;
pub use runner::{SystemToolRunner, ToolInvocation, ToolOutcome, ToolRunner};
