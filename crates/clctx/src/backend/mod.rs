//! Native compute API seam.
//!
//! [`ComputeApi`] lists the native operations the execution context issues. Every
//! call blocks until the device has finished the work it enqueued, so callers never
//! observe partially completed transfers.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{element::MemFlags, error::BackendError};

pub mod host;
#[cfg(all(feature = "metal", target_os = "macos"))]
pub mod metal;
#[cfg(feature = "opencl")]
pub mod opencl;

pub use host::{HostCall, HostDevice, HostStats};
#[cfg(all(feature = "metal", target_os = "macos"))]
pub use metal::MetalDevice;
#[cfg(feature = "opencl")]
pub use opencl::OpenClDevice;

/// Descriptive information about the device behind a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub backend: &'static str,
    pub platform: String,
    pub name: String,
    pub version: String,
    pub max_alloc_bytes: Option<u64>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} / {} ({})", self.backend, self.platform, self.name, self.version)?;
        if let Some(max) = self.max_alloc_bytes {
            write!(f, ", max alloc {max} bytes")?;
        }
        Ok(())
    }
}

/// Operations a native backend provides to the execution context.
///
/// Handles are cheap clones of reference-counted native objects. Release of a
/// memory object is explicit through [`ComputeApi::release_mem`]; the remaining
/// handle kinds live as long as the cache that holds them.
pub trait ComputeApi: 'static {
    type Mem: Clone + 'static;
    type Program: Clone + 'static;
    type Kernel: Clone + 'static;
    type Event: 'static;

    fn info(&self) -> DeviceInfo;

    fn create_buffer(&self, flags: MemFlags, bytes: usize) -> Result<Self::Mem, BackendError>;

    /// Decrement the native reference count of `mem`.
    fn release_mem(&self, mem: &Self::Mem) -> Result<(), BackendError>;

    /// Blocking copy from `mem` into `dst`, after every event in `wait_list` completed.
    fn enqueue_read(&self, mem: &Self::Mem, dst: &mut [u8], wait_list: &[Self::Event]) -> Result<Option<Self::Event>, BackendError>;

    /// Blocking copy from `src` into the start of `mem`.
    fn enqueue_write(&self, mem: &Self::Mem, src: &[u8], wait_list: &[Self::Event]) -> Result<Option<Self::Event>, BackendError>;

    fn wait_for_events(&self, events: &[Self::Event]) -> Result<(), BackendError>;

    fn release_event(&self, event: Self::Event) -> Result<(), BackendError>;

    fn build_program(&self, source: &str, options: &str) -> Result<Self::Program, BackendError>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, BackendError>;
}

/// Shared handle to a native object that RAII backends release on demand.
///
/// Clones refer to the same slot; after [`Releasable::release`] every clone
/// reports the object as released.
pub struct Releasable<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Releasable<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> Releasable<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Run `f` against the live object.
    pub fn with<R>(&self, call: &'static str, f: impl FnOnce(&T) -> Result<R, BackendError>) -> Result<R, BackendError> {
        let guard = self.slot.lock();
        match guard.as_ref() {
            Some(value) => f(value),
            None => Err(BackendError::call(call, "memory object was already released")),
        }
    }

    /// Drop the native object. Fails if it was already released.
    pub fn release(&self, call: &'static str) -> Result<(), BackendError> {
        match self.slot.lock().take() {
            Some(value) => {
                drop(value);
                Ok(())
            }
            None => Err(BackendError::call(call, "memory object was already released")),
        }
    }

    pub fn is_released(&self) -> bool {
        self.slot.lock().is_none()
    }
}
