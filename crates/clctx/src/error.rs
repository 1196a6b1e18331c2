use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`ContextError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A size or argument check failed before any native call was issued.
    Validation,
    /// The native API reported a failure (including program builds and kernel lookups).
    NativeCall,
    /// Waiting on a completion event failed.
    EventWait,
}

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("requested {requested} elements but the buffer holds {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("{call} failed: {message}")]
    NativeCall { call: &'static str, message: String },
    #[error("failed to build program {program}:\n{log}")]
    ProgramBuild { program: String, log: String },
    #[error("kernel '{kernel}' not found in program {program}")]
    KernelNotFound { program: String, kernel: String },
    #[error("failed to read kernel source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("event wait failed: {0}")]
    EventWait(String),
    #[error("operation refused, the computation already failed: {cause}")]
    Aborted { kind: ErrorKind, cause: String },
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapacityExceeded { .. } => ErrorKind::Validation,
            Self::EventWait(_) => ErrorKind::EventWait,
            Self::Aborted { kind, .. } => *kind,
            Self::NativeCall { .. } | Self::ProgramBuild { .. } | Self::KernelNotFound { .. } | Self::SourceRead { .. } => {
                ErrorKind::NativeCall
            }
        }
    }

    #[inline]
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Failure reported by a [`ComputeApi`](crate::backend::ComputeApi) implementation.
///
/// Backends do not know which program identity a build belongs to, so build and
/// lookup failures are re-labelled by the cache before they reach callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{call} failed: {message}")]
    Call { call: &'static str, message: String },
    #[error("program build failed:\n{log}")]
    Build { log: String },
    #[error("kernel '{name}' not found")]
    MissingKernel { name: String },
    #[error("{0}")]
    Event(String),
}

impl BackendError {
    pub fn call(call: &'static str, message: impl Into<String>) -> Self {
        Self::Call {
            call,
            message: message.into(),
        }
    }

    /// Reclassify a failure raised while waiting on or releasing an event.
    pub fn into_event(self) -> Self {
        match self {
            Self::Event(_) => self,
            other => Self::Event(other.to_string()),
        }
    }

    /// Attach the program identity to build and kernel lookup failures.
    pub fn in_program(self, program: &str) -> ContextError {
        match self {
            Self::Build { log } => ContextError::ProgramBuild {
                program: program.to_string(),
                log,
            },
            Self::MissingKernel { name } => ContextError::KernelNotFound {
                program: program.to_string(),
                kernel: name,
            },
            other => other.into(),
        }
    }
}

impl From<BackendError> for ContextError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Call { call, message } => ContextError::NativeCall { call, message },
            BackendError::Build { log } => ContextError::ProgramBuild {
                program: "<unnamed>".to_string(),
                log,
            },
            BackendError::MissingKernel { name } => ContextError::KernelNotFound {
                program: "<unnamed>".to_string(),
                kernel: name,
            },
            BackendError::Event(message) => ContextError::EventWait(message),
        }
    }
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;
