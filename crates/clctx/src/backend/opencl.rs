//! OpenCL backend through the `ocl` crate.

use std::sync::Arc;

use clctx_env::{DEVICE_TYPE, DeviceKind, OPENCL_PLATFORM};
use ocl::{
    Buffer, Context, Device, Event, Kernel, Platform, Program, Queue, enums::{DeviceInfo as ClDeviceInfo, DeviceInfoResult}, flags
};
use tracing::{debug, info};

use super::{ComputeApi, DeviceInfo, Releasable};
use crate::{element::MemFlags, error::BackendError};

fn cl_error(call: &'static str) -> impl FnOnce(ocl::Error) -> BackendError {
    move |err| BackendError::call(call, err.to_string())
}

fn device_type(kind: DeviceKind) -> flags::DeviceType {
    match kind {
        DeviceKind::Gpu => flags::DeviceType::GPU,
        DeviceKind::Cpu => flags::DeviceType::CPU,
        DeviceKind::Accelerator => flags::DeviceType::ACCELERATOR,
        DeviceKind::Any => flags::DeviceType::ALL,
    }
}

fn mem_flags(flags: MemFlags) -> flags::MemFlags {
    let device = match (flags.device_readable(), flags.device_writable()) {
        (true, false) => flags::MemFlags::new().read_only(),
        (false, true) => flags::MemFlags::new().write_only(),
        _ => flags::MemFlags::new().read_write(),
    };
    match (flags.contains(MemFlags::HOST_READ), flags.contains(MemFlags::HOST_WRITE)) {
        (true, false) => device.host_read_only(),
        (false, true) => device.host_write_only(),
        (false, false) => device.host_no_access(),
        (true, true) => device,
    }
}

/// Device, context and in-order queue on one OpenCL platform.
pub struct OpenClDevice {
    platform: Platform,
    device: Device,
    context: Context,
    queue: Queue,
}

impl OpenClDevice {
    /// Open the first device of `kind` on the first platform whose name contains
    /// `platform_hint` (case-insensitive), or on any platform when no hint is given.
    pub fn open(platform_hint: Option<&str>, kind: DeviceKind) -> Result<Self, BackendError> {
        let hint = platform_hint.map(str::to_ascii_lowercase);
        let mut last_error = None;

        for platform in Platform::list() {
            if let Some(hint) = &hint {
                let name = platform.name().map_err(cl_error("clGetPlatformInfo"))?;
                if !name.to_ascii_lowercase().contains(hint.as_str()) {
                    continue;
                }
            }
            match Device::list(platform, Some(device_type(kind))) {
                Ok(devices) => {
                    if let Some(device) = devices.into_iter().next() {
                        return Self::with_device(platform, device);
                    }
                }
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        Err(BackendError::call(
            "clGetDeviceIDs",
            last_error.unwrap_or_else(|| format!("no {kind} device found")),
        ))
    }

    /// Open a device using `CLCTX_OPENCL_PLATFORM` and `CLCTX_DEVICE_TYPE`.
    pub fn from_env() -> Result<Self, BackendError> {
        let platform = OPENCL_PLATFORM.get().map_err(|err| BackendError::call("clGetPlatformIDs", err.to_string()))?;
        let kind = DEVICE_TYPE
            .get()
            .map_err(|err| BackendError::call("clGetDeviceIDs", err.to_string()))?
            .unwrap_or_default();
        Self::open(platform.as_deref(), kind)
    }

    pub fn with_device(platform: Platform, device: Device) -> Result<Self, BackendError> {
        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(cl_error("clCreateContext"))?;
        let queue = Queue::new(&context, device, None).map_err(cl_error("clCreateCommandQueue"))?;
        info!(
            device = %device.name().unwrap_or_default(),
            platform = %platform.name().unwrap_or_default(),
            "opened OpenCL device"
        );
        Ok(Self {
            platform,
            device,
            context,
            queue,
        })
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    fn wait_all(events: &[Event]) -> Result<(), BackendError> {
        for event in events {
            event.wait_for().map_err(|err| BackendError::Event(err.to_string()))?;
        }
        Ok(())
    }
}

impl ComputeApi for OpenClDevice {
    type Mem = Releasable<Buffer<u8>>;
    type Program = Arc<Program>;
    type Kernel = Arc<Kernel>;
    type Event = Event;

    fn info(&self) -> DeviceInfo {
        let max_alloc_bytes = match self.device.info(ClDeviceInfo::MaxMemAllocSize) {
            Ok(DeviceInfoResult::MaxMemAllocSize(bytes)) => Some(bytes),
            _ => None,
        };
        DeviceInfo {
            backend: "opencl",
            platform: self.platform.name().unwrap_or_default(),
            name: self.device.name().unwrap_or_default(),
            version: self.device.version().map(|version| version.to_string()).unwrap_or_default(),
            max_alloc_bytes,
        }
    }

    fn create_buffer(&self, flags: MemFlags, bytes: usize) -> Result<Self::Mem, BackendError> {
        // Zero-sized memory objects are invalid in OpenCL.
        let buffer = Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(mem_flags(flags))
            .len(bytes.max(1))
            .build()
            .map_err(cl_error("clCreateBuffer"))?;
        debug!(bytes, "created OpenCL buffer");
        Ok(Releasable::new(buffer))
    }

    fn release_mem(&self, mem: &Self::Mem) -> Result<(), BackendError> {
        mem.release("clReleaseMemObject")
    }

    fn enqueue_read(&self, mem: &Self::Mem, dst: &mut [u8], wait_list: &[Event]) -> Result<Option<Event>, BackendError> {
        if dst.is_empty() {
            Self::wait_all(wait_list)?;
            return Ok(None);
        }
        mem.with("clEnqueueReadBuffer", |buffer| {
            let mut completion = Event::empty();
            buffer
                .read(dst)
                .block(true)
                .ewait(wait_list)
                .enew(&mut completion)
                .enq()
                .map_err(cl_error("clEnqueueReadBuffer"))?;
            Ok(Some(completion))
        })
    }

    fn enqueue_write(&self, mem: &Self::Mem, src: &[u8], wait_list: &[Event]) -> Result<Option<Event>, BackendError> {
        if src.is_empty() {
            Self::wait_all(wait_list)?;
            return Ok(None);
        }
        mem.with("clEnqueueWriteBuffer", |buffer| {
            let mut completion = Event::empty();
            buffer
                .write(src)
                .block(true)
                .ewait(wait_list)
                .enew(&mut completion)
                .enq()
                .map_err(cl_error("clEnqueueWriteBuffer"))?;
            Ok(Some(completion))
        })
    }

    fn wait_for_events(&self, events: &[Event]) -> Result<(), BackendError> {
        Self::wait_all(events)
    }

    fn release_event(&self, event: Event) -> Result<(), BackendError> {
        drop(event);
        Ok(())
    }

    fn build_program(&self, source: &str, options: &str) -> Result<Self::Program, BackendError> {
        let program = Program::builder()
            .src(source)
            .devices(self.device)
            .cmplr_opt(options)
            .build(&self.context)
            .map_err(|err| BackendError::Build { log: err.to_string() })?;
        Ok(Arc::new(program))
    }

    fn create_kernel(&self, program: &Self::Program, name: &str) -> Result<Self::Kernel, BackendError> {
        let kernel = Kernel::builder()
            .program(program)
            .name(name)
            .queue(self.queue.clone())
            .build()
            .map_err(|err| {
                debug!(kernel = name, error = %err, "kernel extraction failed");
                BackendError::MissingKernel { name: name.to_string() }
            })?;
        Ok(Arc::new(kernel))
    }
}
