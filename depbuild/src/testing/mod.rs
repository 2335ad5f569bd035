//! Testing utilities for pipelines.
//!
//! This module provides:
//! - A scripted toolchain that imitates extraction and builds on disk
//! - Working-directory seeding

mod fakes;

pub use fakes::{seed_work_dir, FakeToolRunner};
