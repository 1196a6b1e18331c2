//! In-process emulated device.
//!
//! Memory objects are host byte vectors and programs are "compiled" by scanning the
//! source for kernel entry points. Every native call is counted and any call kind can
//! be made to fail, which lets the context's release and caching guarantees be
//! checked without a GPU.

use std::sync::{Arc, LazyLock};

use fancy_regex::Regex;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::{ComputeApi, DeviceInfo};
use crate::{element::MemFlags, error::BackendError};

const DEFAULT_MAX_ALLOC_BYTES: u64 = 256 * 1024 * 1024;

static KERNEL_ENTRY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?<![\w])(?:__kernel|kernel)\s+void\s+([A-Za-z_]\w*)\s*\(").ok());

/// Native call kinds issued against a [`HostDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    CreateBuffer,
    ReleaseMem,
    Read,
    Write,
    WaitEvents,
    ReleaseEvent,
    BuildProgram,
    CreateKernel,
}

impl HostCall {
    /// The OpenCL entry point this call stands in for.
    pub const fn native_name(self) -> &'static str {
        match self {
            HostCall::CreateBuffer => "clCreateBuffer",
            HostCall::ReleaseMem => "clReleaseMemObject",
            HostCall::Read => "clEnqueueReadBuffer",
            HostCall::Write => "clEnqueueWriteBuffer",
            HostCall::WaitEvents => "clWaitForEvents",
            HostCall::ReleaseEvent => "clReleaseEvent",
            HostCall::BuildProgram => "clBuildProgram",
            HostCall::CreateKernel => "clCreateKernel",
        }
    }
}

/// Call counters accumulated by a [`HostDevice`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    pub native_calls: u64,
    pub buffers_created: u64,
    pub buffers_released: u64,
    pub reads: u64,
    pub writes: u64,
    pub programs_built: u64,
    pub kernels_created: u64,
    pub events_created: u64,
    pub events_released: u64,
}

impl HostStats {
    #[inline]
    pub fn live_buffers(&self) -> u64 {
        self.buffers_created.saturating_sub(self.buffers_released)
    }

    #[inline]
    pub fn outstanding_events(&self) -> u64 {
        self.events_created.saturating_sub(self.events_released)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostMem {
    id: u64,
}

impl HostMem {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct HostProgram {
    id: u64,
    options: Arc<str>,
    entry_points: Arc<[String]>,
}

impl HostProgram {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Compiler options the program was built with.
    pub fn build_options(&self) -> &str {
        &self.options
    }

    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKernel {
    program: u64,
    name: Arc<str>,
}

impl HostKernel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program_id(&self) -> u64 {
        self.program
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct HostEvent {
    id: u64,
}

struct MemObject {
    flags: MemFlags,
    data: Vec<u8>,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    memory: FxHashMap<u64, MemObject>,
    events: FxHashSet<u64>,
    faults: FxHashMap<HostCall, u32>,
    stats: HostStats,
}

impl HostState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Count the call and consume a pending injected fault, if any.
    fn enter(&mut self, call: HostCall) -> Result<(), BackendError> {
        self.stats.native_calls += 1;
        trace!(call = call.native_name(), "host native call");
        if let Some(remaining) = self.faults.get_mut(&call) {
            *remaining -= 1;
            if *remaining == 0 {
                self.faults.remove(&call);
            }
            return Err(BackendError::call(call.native_name(), "injected fault"));
        }
        Ok(())
    }

    fn check_wait_list(&self, call: HostCall, wait_list: &[HostEvent]) -> Result<(), BackendError> {
        match wait_list.iter().find(|event| !self.events.contains(&event.id)) {
            Some(event) => Err(BackendError::call(
                call.native_name(),
                format!("invalid event {} in wait list", event.id),
            )),
            None => Ok(()),
        }
    }

    fn completion_event(&mut self) -> HostEvent {
        let id = self.next_id();
        self.events.insert(id);
        self.stats.events_created += 1;
        HostEvent { id }
    }
}

/// Emulated device backed by host memory.
pub struct HostDevice {
    name: String,
    max_alloc_bytes: u64,
    state: Mutex<HostState>,
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDevice {
    pub fn new() -> Self {
        Self::with_max_alloc(DEFAULT_MAX_ALLOC_BYTES)
    }

    /// Device whose allocations larger than `max_alloc_bytes` fail.
    pub fn with_max_alloc(max_alloc_bytes: u64) -> Self {
        Self {
            name: "clctx host emulator".to_string(),
            max_alloc_bytes,
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn stats(&self) -> HostStats {
        self.state.lock().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats = HostStats::default();
    }

    /// Make the next `times` calls of kind `call` fail.
    pub fn inject_fault(&self, call: HostCall, times: u32) {
        if times == 0 {
            return;
        }
        *self.state.lock().faults.entry(call).or_insert(0) += times;
    }

    #[inline]
    pub fn fail_next(&self, call: HostCall) {
        self.inject_fault(call, 1);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Snapshot of a memory object's bytes, if it is still live.
    pub fn contents(&self, mem: &HostMem) -> Option<Vec<u8>> {
        self.state.lock().memory.get(&mem.id).map(|object| object.data.clone())
    }

    pub fn is_live(&self, mem: &HostMem) -> bool {
        self.state.lock().memory.contains_key(&mem.id)
    }
}

/// Kernel entry points declared in `source`, in declaration order.
fn scan_entry_points(source: &str) -> Result<Vec<String>, BackendError> {
    let call = HostCall::BuildProgram.native_name();
    let Some(pattern) = KERNEL_ENTRY.as_ref() else {
        return Err(BackendError::call(call, "kernel scanner failed to initialise"));
    };

    let mut names = Vec::new();
    for captures in pattern.captures_iter(source) {
        let captures = captures.map_err(|err| BackendError::call(call, err.to_string()))?;
        if let Some(name) = captures.get(1)
            && !names.iter().any(|existing: &String| existing == name.as_str())
        {
            names.push(name.as_str().to_string());
        }
    }
    Ok(names)
}

/// Build log lines for every `#error` directive in `source`.
fn error_directives(source: &str) -> Vec<String> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let directive = line.trim_start().strip_prefix("#error")?;
            Some(format!("<source>:{}: error: {}", index + 1, directive.trim()))
        })
        .collect()
}

impl ComputeApi for HostDevice {
    type Mem = HostMem;
    type Program = HostProgram;
    type Kernel = HostKernel;
    type Event = HostEvent;

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            backend: "host",
            platform: "clctx".to_string(),
            name: self.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_alloc_bytes: Some(self.max_alloc_bytes),
        }
    }

    fn create_buffer(&self, flags: MemFlags, bytes: usize) -> Result<HostMem, BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::CreateBuffer)?;
        if bytes as u64 > self.max_alloc_bytes {
            return Err(BackendError::call(
                HostCall::CreateBuffer.native_name(),
                format!("{bytes} bytes exceeds the device limit of {}", self.max_alloc_bytes),
            ));
        }
        let id = state.next_id();
        state.memory.insert(
            id,
            MemObject {
                flags,
                data: vec![0; bytes],
            },
        );
        state.stats.buffers_created += 1;
        Ok(HostMem { id })
    }

    fn release_mem(&self, mem: &HostMem) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::ReleaseMem)?;
        if state.memory.remove(&mem.id).is_none() {
            return Err(BackendError::call(
                HostCall::ReleaseMem.native_name(),
                format!("invalid memory object {}", mem.id),
            ));
        }
        state.stats.buffers_released += 1;
        Ok(())
    }

    fn enqueue_read(&self, mem: &HostMem, dst: &mut [u8], wait_list: &[HostEvent]) -> Result<Option<HostEvent>, BackendError> {
        let call = HostCall::Read;
        let mut state = self.state.lock();
        state.enter(call)?;
        state.check_wait_list(call, wait_list)?;
        let object = state
            .memory
            .get(&mem.id)
            .ok_or_else(|| BackendError::call(call.native_name(), format!("invalid memory object {}", mem.id)))?;
        if !object.flags.contains(MemFlags::HOST_READ) {
            return Err(BackendError::call(call.native_name(), "memory object is not host readable"));
        }
        let source = object.data.get(..dst.len()).ok_or_else(|| {
            BackendError::call(
                call.native_name(),
                format!("read of {} bytes from a {} byte object", dst.len(), object.data.len()),
            )
        })?;
        dst.copy_from_slice(source);
        state.stats.reads += 1;
        Ok(Some(state.completion_event()))
    }

    fn enqueue_write(&self, mem: &HostMem, src: &[u8], wait_list: &[HostEvent]) -> Result<Option<HostEvent>, BackendError> {
        let call = HostCall::Write;
        let mut state = self.state.lock();
        state.enter(call)?;
        state.check_wait_list(call, wait_list)?;
        let object = state
            .memory
            .get_mut(&mem.id)
            .ok_or_else(|| BackendError::call(call.native_name(), format!("invalid memory object {}", mem.id)))?;
        if !object.flags.contains(MemFlags::HOST_WRITE) {
            return Err(BackendError::call(call.native_name(), "memory object is not host writable"));
        }
        let capacity = object.data.len();
        let target = object.data.get_mut(..src.len()).ok_or_else(|| {
            BackendError::call(
                call.native_name(),
                format!("write of {} bytes into a {capacity} byte object", src.len()),
            )
        })?;
        target.copy_from_slice(src);
        state.stats.writes += 1;
        Ok(Some(state.completion_event()))
    }

    fn wait_for_events(&self, events: &[HostEvent]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::WaitEvents)?;
        state
            .check_wait_list(HostCall::WaitEvents, events)
            .map_err(|err| BackendError::Event(err.to_string()))
    }

    fn release_event(&self, event: HostEvent) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::ReleaseEvent)?;
        if !state.events.remove(&event.id) {
            return Err(BackendError::call(
                HostCall::ReleaseEvent.native_name(),
                format!("invalid event {}", event.id),
            ));
        }
        state.stats.events_released += 1;
        Ok(())
    }

    fn build_program(&self, source: &str, options: &str) -> Result<HostProgram, BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::BuildProgram)?;

        let errors = error_directives(source);
        if !errors.is_empty() {
            return Err(BackendError::Build { log: errors.join("\n") });
        }
        let entry_points = scan_entry_points(source)?;
        if entry_points.is_empty() {
            return Err(BackendError::Build {
                log: "<source>: error: no kernel entry points found".to_string(),
            });
        }

        state.stats.programs_built += 1;
        let id = state.next_id();
        Ok(HostProgram {
            id,
            options: Arc::from(options),
            entry_points: entry_points.into(),
        })
    }

    fn create_kernel(&self, program: &HostProgram, name: &str) -> Result<HostKernel, BackendError> {
        let mut state = self.state.lock();
        state.enter(HostCall::CreateKernel)?;
        if !program.entry_points.iter().any(|entry| entry == name) {
            return Err(BackendError::MissingKernel { name: name.to_string() });
        }
        state.stats.kernels_created += 1;
        Ok(HostKernel {
            program: program.id,
            name: Arc::from(name),
        })
    }
}
