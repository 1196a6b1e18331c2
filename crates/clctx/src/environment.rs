use std::{path::PathBuf, sync::Arc};

use clctx_env::{BUILD_OPTIONS, EnvVarError, KERNEL_DIR};

use crate::backend::ComputeApi;

/// Settings that shape how programs are located and compiled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOptions {
    /// Compiler options handed to every program build.
    pub build_options: String,
    /// Base directory for relative kernel source paths.
    pub kernel_dir: Option<PathBuf>,
}

impl ContextOptions {
    /// Read `CLCTX_BUILD_OPTIONS` and `CLCTX_KERNEL_DIR`.
    pub fn from_env() -> Result<Self, EnvVarError> {
        Ok(Self {
            build_options: BUILD_OPTIONS.get()?.unwrap_or_default(),
            kernel_dir: KERNEL_DIR.get()?,
        })
    }

    pub fn with_build_options(mut self, options: impl Into<String>) -> Self {
        self.build_options = options.into();
        self
    }

    pub fn with_kernel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.kernel_dir = Some(dir.into());
        self
    }
}

/// Read-only handle bundle (device, queue and native context) an execution context runs against.
///
/// Cloning is cheap; the backend is shared and never mutated by the context.
pub struct Environment<A: ComputeApi> {
    api: Arc<A>,
    options: ContextOptions,
}

impl<A: ComputeApi> Clone for Environment<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            options: self.options.clone(),
        }
    }
}

impl<A: ComputeApi> Environment<A> {
    pub fn new(api: A) -> Self {
        Self::from_shared(Arc::new(api), ContextOptions::default())
    }

    pub fn with_options(api: A, options: ContextOptions) -> Self {
        Self::from_shared(Arc::new(api), options)
    }

    pub fn from_shared(api: Arc<A>, options: ContextOptions) -> Self {
        Self { api, options }
    }

    #[inline]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[inline]
    pub fn shared_api(&self) -> &Arc<A> {
        &self.api
    }

    #[inline]
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }
}
