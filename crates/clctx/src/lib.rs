//! Execution context for native GPU compute APIs.
//!
//! A [`Context`] carries a read-only [`Environment`], a [`CleanupRegistry`] of pending
//! release actions and a program/kernel cache. Computations run through [`run`] and its
//! variants, which decide what happens to the registry when the computation ends.
//!
//! ```
//! use clctx::{CleanupPolicy, Environment, HostDevice, MemFlags, run_clean};
//!
//! let env = Environment::new(HostDevice::new());
//! let values = run_clean(&env, |ctx| {
//!     let buffer = ctx.init_buffer(MemFlags::READ_WRITE, &[1i32, 2, 3, 4], CleanupPolicy::Managed)?;
//!     ctx.read_buffer(&buffer, 4, &[])
//! })?;
//! assert_eq!(values, vec![1, 2, 3, 4]);
//! # Ok::<(), clctx::ContextError>(())
//! ```

pub use backend::{ComputeApi, DeviceInfo, HostCall, HostDevice, HostStats};
pub use buffer::{Buffer, CleanupPolicy};
pub use caching::{CacheStats, KernelCache, ProgramSource};
pub use cleanup::{CleanupRegistry, ReleaseAction, ReleaseKey};
pub use context::{Context, Outcome, run, run_checked, run_clean, run_leaky, run_or_abort};
pub use element::{BufferElement, ElementType, MemFlags};
pub use environment::{ContextOptions, Environment};
pub use error::{BackendError, ContextError, ErrorKind};

#[cfg(all(feature = "metal", target_os = "macos"))]
pub use backend::MetalDevice;
#[cfg(feature = "opencl")]
pub use backend::OpenClDevice;

pub mod backend;
pub mod buffer;
pub mod caching;
pub mod cleanup;
pub mod context;
pub mod element;
pub mod environment;
pub mod error;

mod tests;
