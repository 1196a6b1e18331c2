use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clctx_env::{BACKEND, BackendKind};
use tracing::Level;

use super::error::CliError;

/// Round trips upload `0..count` as `i32`, so the count must fit that range.
pub const MAX_ROUNDTRIP_COUNT: usize = i32::MAX as usize;

/// Command-line interface configuration for the clctx binary
#[derive(Debug, Parser)]
#[command(name = "clctx")]
#[command(about = "Probe a compute backend, compile kernels through the program cache, run buffer round trips", long_about = None)]
pub struct CliConfig {
    /// Backend to open (defaults to CLCTX_BACKEND, then the host emulator)
    #[arg(long, value_enum, value_name = "BACKEND", global = true)]
    pub backend: Option<BackendChoice>,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Print the device behind the selected backend
    Probe,
    /// Compile a kernel source file and extract kernels from it
    Compile {
        /// Kernel source file; relative paths resolve against CLCTX_KERNEL_DIR
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Kernel to extract (repeatable)
        #[arg(long = "kernel", value_name = "NAME")]
        kernels: Vec<String>,
    },
    /// Upload a sequence of integers to the device and read it back
    Roundtrip {
        /// Number of i32 elements to transfer
        #[arg(long, default_value_t = 1024)]
        count: usize,
    },
}

/// Backend selection on the command line.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendChoice {
    /// In-process emulated device
    Host,
    /// OpenCL (requires the `opencl` feature)
    Opencl,
    /// Apple Metal (requires the `metal` feature, macOS only)
    Metal,
}

impl From<BackendChoice> for BackendKind {
    fn from(value: BackendChoice) -> Self {
        match value {
            BackendChoice::Host => BackendKind::Host,
            BackendChoice::Opencl => BackendKind::OpenCl,
            BackendChoice::Metal => BackendKind::Metal,
        }
    }
}

impl CliConfig {
    /// The `--backend` flag, falling back to `CLCTX_BACKEND` and then the host emulator.
    pub fn resolve_backend(&self) -> Result<BackendKind, CliError> {
        if let Some(choice) = self.backend {
            return Ok(choice.into());
        }
        BACKEND
            .get()
            .map(Option::unwrap_or_default)
            .map_err(|err| CliError::config_error(err.to_string()))
    }

    /// Raise `configured` to debug or trace depending on `-v` occurrences.
    pub fn log_level(&self, configured: Level) -> Level {
        let requested = match self.verbose {
            0 => return configured,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        // `Level` orders TRACE as the greatest (most verbose) level.
        requested.max(configured)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        if let Command::Roundtrip { count } = self.command {
            if count == 0 {
                return Err(CliError::invalid_argument("--count must be at least 1"));
            }
            if count > MAX_ROUNDTRIP_COUNT {
                return Err(CliError::invalid_argument(format!("--count must be at most {MAX_ROUNDTRIP_COUNT}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
