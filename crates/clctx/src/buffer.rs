//! Typed buffers over native memory objects.

use std::{
    fmt, marker::PhantomData, sync::{
        Arc, atomic::{AtomicBool, Ordering}
    }
};

use clctx_instrumentation::{MetricEvent, record_metric};
use tracing::debug;

use crate::{
    backend::ComputeApi, cleanup::ReleaseKey, context::Context, element::{BufferElement, ElementType, MemFlags}, error::{BackendError, ContextError}
};

/// Whether an allocation's release is registered with the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupPolicy {
    /// Register a release action that runs when the context's registry is swept.
    #[default]
    Managed,
    /// The caller releases the buffer through [`Context::release_buffer`].
    Manual,
}

/// Device memory holding `len` elements of `T`.
///
/// The memory object is released at most once. The registered release action and
/// [`Context::release_buffer`] share a flag, so whichever runs second is a no-op even
/// when the action was moved to another registry by nesting or adoption.
pub struct Buffer<T: BufferElement, A: ComputeApi> {
    len: usize,
    mem: A::Mem,
    flags: MemFlags,
    cleanup: Option<ReleaseKey>,
    released: Arc<AtomicBool>,
    _element: PhantomData<T>,
}

impl<T: BufferElement, A: ComputeApi> fmt::Debug for Buffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("element", &T::ELEMENT)
            .field("len", &self.len)
            .field("flags", &self.flags)
            .field("cleanup", &self.cleanup)
            .finish()
    }
}

impl<T: BufferElement, A: ComputeApi> Buffer<T, A> {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.len * size_of::<T>()
    }

    #[inline]
    pub fn element_type(&self) -> ElementType {
        T::ELEMENT
    }

    #[inline]
    pub fn flags(&self) -> MemFlags {
        self.flags
    }

    /// Native memory object, for binding as a kernel argument.
    #[inline]
    pub fn mem(&self) -> &A::Mem {
        &self.mem
    }

    /// Registry entry that releases this buffer, if it is managed.
    #[inline]
    pub fn cleanup_key(&self) -> Option<ReleaseKey> {
        self.cleanup
    }

    #[inline]
    pub fn is_managed(&self) -> bool {
        self.cleanup.is_some()
    }

    fn check_capacity(&self, requested: usize) -> Result<(), ContextError> {
        if requested > self.len {
            return Err(ContextError::CapacityExceeded {
                requested,
                capacity: self.len,
            });
        }
        Ok(())
    }

    pub fn release(self, ctx: &mut Context<A>) -> Result<(), ContextError> {
        ctx.release_buffer(self)
    }
}

impl<A: ComputeApi> Context<A> {
    /// Allocate device memory for `count` elements of `T`.
    pub fn alloc_buffer<T: BufferElement>(&mut self, flags: MemFlags, count: usize, policy: CleanupPolicy) -> Result<Buffer<T, A>, ContextError> {
        self.ensure_live()?;
        let Some(bytes) = count.checked_mul(size_of::<T>()) else {
            return Err(self.fail(ContextError::CapacityExceeded {
                requested: count,
                capacity: usize::MAX / size_of::<T>(),
            }));
        };

        let mem = self.native(|api| api.create_buffer(flags, bytes))?;
        let released = Arc::new(AtomicBool::new(false));
        let cleanup = match policy {
            CleanupPolicy::Managed => {
                let api = Arc::clone(self.environment().shared_api());
                let handle = mem.clone();
                let released = Arc::clone(&released);
                Some(self.cleanup.register(move || {
                    if released.swap(true, Ordering::AcqRel) {
                        return Ok(());
                    }
                    api.release_mem(&handle)?;
                    record_metric!(MetricEvent::BufferReleased { bytes: bytes as u64 });
                    Ok(())
                }))
            }
            CleanupPolicy::Manual => None,
        };

        debug!(element = T::ELEMENT.cl_name(), count, bytes, ?policy, "allocated buffer");
        record_metric!(MetricEvent::BufferAllocated {
            bytes: bytes as u64,
            managed: cleanup.is_some(),
        });
        Ok(Buffer {
            len: count,
            mem,
            flags,
            cleanup,
            released,
            _element: PhantomData,
        })
    }

    /// Allocate a buffer sized to `data` and upload it in one blocking write.
    pub fn init_buffer<T: BufferElement>(&mut self, flags: MemFlags, data: &[T], policy: CleanupPolicy) -> Result<Buffer<T, A>, ContextError> {
        let buffer = self.alloc_buffer::<T>(flags, data.len(), policy)?;
        if let Err(err) = self.write_buffer(&buffer, data) {
            if policy == CleanupPolicy::Manual
                && !buffer.released.swap(true, Ordering::AcqRel)
                && let Err(release_err) = self.api().release_mem(&buffer.mem)
            {
                debug!(error = %release_err, "failed to release buffer after a failed upload");
            }
            return Err(err);
        }
        Ok(buffer)
    }

    /// Blocking read of the first `count` elements, after every event in `wait_list` completed.
    pub fn read_buffer<T: BufferElement>(&mut self, buffer: &Buffer<T, A>, count: usize, wait_list: &[A::Event]) -> Result<Vec<T>, ContextError> {
        self.ensure_live()?;
        let checked = buffer.check_capacity(count);
        self.check(checked)?;

        if !wait_list.is_empty() {
            self.native(|api| api.wait_for_events(wait_list).map_err(BackendError::into_event))?;
        }
        let mut out = vec![T::default(); count];
        let completion = self.native(|api| api.enqueue_read(&buffer.mem, bytemuck::cast_slice_mut(&mut out), wait_list))?;
        self.finish_event(completion)?;
        Ok(out)
    }

    /// Blocking write of `data` into the start of `buffer`.
    pub fn write_buffer<T: BufferElement>(&mut self, buffer: &Buffer<T, A>, data: &[T]) -> Result<(), ContextError> {
        self.ensure_live()?;
        let checked = buffer.check_capacity(data.len());
        self.check(checked)?;

        let completion = self.native(|api| api.enqueue_write(&buffer.mem, bytemuck::cast_slice(data), &[]))?;
        self.finish_event(completion)
    }

    /// Release the buffer's memory object. A managed buffer's registry entry is removed first.
    ///
    /// The entry may live in a registry this context no longer holds (a nested child,
    /// or one adopted under a new key). That entry then finds the buffer released and
    /// does nothing when it runs.
    pub fn release_buffer<T: BufferElement>(&mut self, buffer: Buffer<T, A>) -> Result<(), ContextError> {
        if let Some(key) = buffer.cleanup {
            self.cleanup.unregister(key);
        }
        if buffer.released.swap(true, Ordering::AcqRel) {
            debug!(element = T::ELEMENT.cl_name(), "buffer already released by its cleanup action");
            return Ok(());
        }
        self.native(|api| api.release_mem(&buffer.mem))?;
        debug!(element = T::ELEMENT.cl_name(), bytes = buffer.size_bytes(), "released buffer");
        record_metric!(MetricEvent::BufferReleased {
            bytes: buffer.size_bytes() as u64,
        });
        Ok(())
    }

    /// Wait for and release a completion event. The event is released even when the wait fails.
    /// Either failure is reported as an event wait failure.
    fn finish_event(&mut self, completion: Option<A::Event>) -> Result<(), ContextError> {
        let Some(event) = completion else {
            return Ok(());
        };
        self.native(|api| {
            let waited = api.wait_for_events(std::slice::from_ref(&event));
            let released = api.release_event(event);
            waited.and(released).map_err(BackendError::into_event)
        })
    }
}
