//! Command-line parsing for the clctx binary.

pub mod config;
pub mod error;

pub use config::{BackendChoice, CliConfig, Command};
pub use error::CliError;
