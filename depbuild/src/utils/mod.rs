//! Utility functions.

pub mod fs;

pub use fs::{copy_file, copy_tree, remove_path, sha256_file};
