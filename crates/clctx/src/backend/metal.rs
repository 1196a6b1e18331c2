//! Apple Metal backend.
//!
//! Programs map to `MTLLibrary` objects and kernels to compute pipeline states.
//! Buffers use shared storage so host reads and writes are plain memory copies;
//! Metal has no completion events at this level, so the event type is uninhabited.

use std::{convert::Infallible, ptr::NonNull};

use objc2::{rc::Retained, runtime::ProtocolObject};
use objc2_foundation::NSString;
use objc2_metal::{
    MTLBuffer, MTLCommandQueue, MTLCompileOptions, MTLComputePipelineState, MTLCreateSystemDefaultDevice, MTLDevice, MTLLibrary, MTLResourceOptions
};
use tracing::{debug, info};

use super::{ComputeApi, DeviceInfo, Releasable};
use crate::{element::MemFlags, error::BackendError};

type MtlBuffer = Retained<ProtocolObject<dyn MTLBuffer>>;

pub struct MetalDevice {
    device: Retained<ProtocolObject<dyn MTLDevice>>,
    command_queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
}

impl MetalDevice {
    pub fn system_default() -> Result<Self, BackendError> {
        let device =
            MTLCreateSystemDefaultDevice().ok_or_else(|| BackendError::call("MTLCreateSystemDefaultDevice", "no Metal device available"))?;
        let command_queue = device
            .newCommandQueue()
            .ok_or_else(|| BackendError::call("newCommandQueue", "command queue creation failed"))?;
        info!(device = %device.name(), "opened Metal device");
        Ok(Self { device, command_queue })
    }

    pub fn device(&self) -> &Retained<ProtocolObject<dyn MTLDevice>> {
        &self.device
    }

    pub fn command_queue(&self) -> &Retained<ProtocolObject<dyn MTLCommandQueue>> {
        &self.command_queue
    }

    fn contents(buffer: &MtlBuffer) -> NonNull<u8> {
        buffer.contents().cast::<u8>()
    }
}

impl ComputeApi for MetalDevice {
    type Mem = Releasable<MtlBuffer>;
    type Program = Retained<ProtocolObject<dyn MTLLibrary>>;
    type Kernel = Retained<ProtocolObject<dyn MTLComputePipelineState>>;
    type Event = Infallible;

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            backend: "metal",
            platform: "Apple Metal".to_string(),
            name: self.device.name().to_string(),
            version: String::new(),
            max_alloc_bytes: Some(self.device.maxBufferLength() as u64),
        }
    }

    fn create_buffer(&self, _flags: MemFlags, bytes: usize) -> Result<Self::Mem, BackendError> {
        // Metal refuses zero-length buffers.
        let buffer = self
            .device
            .newBufferWithLength_options(bytes.max(1), MTLResourceOptions::StorageModeShared)
            .ok_or_else(|| BackendError::call("newBufferWithLength", format!("allocation of {bytes} bytes failed")))?;
        debug!(bytes, "created Metal buffer");
        Ok(Releasable::new(buffer))
    }

    fn release_mem(&self, mem: &Self::Mem) -> Result<(), BackendError> {
        mem.release("release")
    }

    fn enqueue_read(&self, mem: &Self::Mem, dst: &mut [u8], _wait_list: &[Infallible]) -> Result<Option<Infallible>, BackendError> {
        mem.with("contents", |buffer| {
            if dst.len() > buffer.length() {
                return Err(BackendError::call("contents", "read past the end of the buffer"));
            }
            // SAFETY: shared storage is host visible, the length was checked above and all
            // calls block so no GPU work touches the buffer concurrently.
            unsafe { std::ptr::copy_nonoverlapping(Self::contents(buffer).as_ptr(), dst.as_mut_ptr(), dst.len()) };
            Ok(None)
        })
    }

    fn enqueue_write(&self, mem: &Self::Mem, src: &[u8], _wait_list: &[Infallible]) -> Result<Option<Infallible>, BackendError> {
        mem.with("contents", |buffer| {
            if src.len() > buffer.length() {
                return Err(BackendError::call("contents", "write past the end of the buffer"));
            }
            // SAFETY: see `enqueue_read`.
            unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), Self::contents(buffer).as_ptr(), src.len()) };
            Ok(None)
        })
    }

    fn wait_for_events(&self, _events: &[Infallible]) -> Result<(), BackendError> {
        Ok(())
    }

    fn release_event(&self, event: Infallible) -> Result<(), BackendError> {
        match event {}
    }

    fn build_program(&self, source: &str, options: &str) -> Result<Self::Program, BackendError> {
        if !options.trim().is_empty() {
            debug!(options, "Metal ignores OpenCL-style build options");
        }
        let source_ns = NSString::from_str(source);
        let compile_options = MTLCompileOptions::new();
        self.device
            .newLibraryWithSource_options_error(&source_ns, Some(&compile_options))
            .map_err(|err| BackendError::Build { log: err.to_string() })
    }

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, BackendError> {
        let fn_name = NSString::from_str(name);
        let function = program
            .newFunctionWithName(&fn_name)
            .ok_or_else(|| BackendError::MissingKernel { name: name.to_string() })?;
        self.device
            .newComputePipelineStateWithFunction_error(&function)
            .map_err(|err| BackendError::call("newComputePipelineStateWithFunction", err.to_string()))
    }
}
