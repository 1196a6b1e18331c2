use std::{
    borrow::Cow, fmt, hash::{Hash, Hasher}, path::{Path, PathBuf}
};

use rustc_hash::FxHasher;

use crate::error::ContextError;

/// Where a program's source text comes from. Equal values are the same program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgramSource {
    /// Kernel source file; relative paths are resolved against the kernel directory.
    File(PathBuf),
    /// Literal source text.
    Source(String),
}

impl ProgramSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn source(text: impl Into<String>) -> Self {
        Self::Source(text.into())
    }

    /// The identity this source is cached under.
    pub fn resolve(&self, kernel_dir: Option<&Path>) -> Cow<'_, ProgramSource> {
        match (self, kernel_dir) {
            (Self::File(path), Some(dir)) if path.is_relative() => Cow::Owned(Self::File(dir.join(path))),
            _ => Cow::Borrowed(self),
        }
    }

    /// Source text to compile.
    pub fn load(&self) -> Result<Cow<'_, str>, ContextError> {
        match self {
            Self::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| ContextError::SourceRead { path: path.clone(), source }),
            Self::Source(text) => Ok(Cow::Borrowed(text)),
        }
    }

    /// Short label used in logs, metrics and error messages.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProgramSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Source(text) => {
                let mut hasher = FxHasher::default();
                text.hash(&mut hasher);
                write!(f, "<source {:016x}>", hasher.finish())
            }
        }
    }
}

impl From<&Path> for ProgramSource {
    fn from(value: &Path) -> Self {
        Self::File(value.to_path_buf())
    }
}

impl From<PathBuf> for ProgramSource {
    fn from(value: PathBuf) -> Self {
        Self::File(value)
    }
}

/// Cache key of one compiled kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub program: ProgramSource,
    pub name: String,
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.program, self.name)
    }
}
