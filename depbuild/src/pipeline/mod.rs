//! Pipeline execution.
//!
//! This module provides:
//! - The sequential [`Pipeline`], one dependency after another
//! - The [`ConcurrentPipeline`] with fail-fast and best-effort modes
//! - Run reports

mod concurrent;
mod report;
mod runner;


pub use concurrent::{ConcurrentPipeline, FailureMode};
pub use report::{DependencyReport, RunReport};
pub use runner::Pipeline;
