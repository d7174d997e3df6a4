//! Core application functionality
//!
//! This module contains the application layer around the atlas pipeline:
//! - CLI handling
//! - Build configuration files
//! - Error types
//! - The build runner

pub mod cli;
pub mod config_file;
pub mod errors;
pub mod platform;
pub mod runner;

// Re-export commonly used items
pub use cli::CliArgs;
pub use config_file::BuildConfig;
pub use errors::{AtlasError, AtlasResult};
pub use runner::{build_atlas, run_app, write_output, BuildOutput, RunContext};
