use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// An argument value is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested backend was not compiled into this binary
    #[error("Backend '{backend}' is not available; rebuild with `--features {feature}`")]
    BackendUnavailable { backend: String, feature: &'static str },

    /// A value read back from the device differs from what was written
    #[error("Round trip mismatch at element {index}: wrote {expected}, read {actual}")]
    RoundTripMismatch { index: usize, expected: i32, actual: i32 },

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl CliError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
