use std::time::Instant;

use clctx_instrumentation::{MetricEvent, record_metric};
use rustc_hash::FxHashMap;
use tracing::{debug, info_span};

use super::{CacheCounters, CacheStats, KernelKey, ProgramSource};
use crate::{backend::ComputeApi, environment::ContextOptions, error::ContextError};

const PROGRAM_CACHE: &str = "program";
const KERNEL_CACHE: &str = "kernel";

/// Compiled programs per source identity and kernels per (identity, name).
///
/// A program is built at most once per identity; every kernel extracted from it
/// reuses the cached handle.
pub struct KernelCache<A: ComputeApi> {
    programs: FxHashMap<ProgramSource, A::Program>,
    kernels: FxHashMap<KernelKey, A::Kernel>,
    program_counters: CacheCounters,
    kernel_counters: CacheCounters,
}

impl<A: ComputeApi> Default for KernelCache<A> {
    fn default() -> Self {
        Self {
            programs: FxHashMap::default(),
            kernels: FxHashMap::default(),
            program_counters: CacheCounters::default(),
            kernel_counters: CacheCounters::default(),
        }
    }
}

impl<A: ComputeApi> KernelCache<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_program(&mut self, api: &A, options: &ContextOptions, source: &ProgramSource) -> Result<A::Program, ContextError> {
        let identity = source.resolve(options.kernel_dir.as_deref());
        self.program_for(api, options, &identity)
    }

    pub fn get_kernel(&mut self, api: &A, options: &ContextOptions, source: &ProgramSource, name: &str) -> Result<A::Kernel, ContextError> {
        let identity = source.resolve(options.kernel_dir.as_deref()).into_owned();
        let key = KernelKey {
            program: identity,
            name: name.to_string(),
        };
        let label = key.to_string();
        let _span = info_span!("cache_get_or_create", cache = KERNEL_CACHE, key = %label).entered();

        if let Some(kernel) = self.kernels.get(&key) {
            self.kernel_counters.record_hit(KERNEL_CACHE, label.clone());
            record_metric!(MetricEvent::KernelCacheAccess { cache_key: label, hit: true });
            return Ok(kernel.clone());
        }

        let program = self.program_for(api, options, &key.program)?;
        let kernel = api
            .create_kernel(&program, name)
            .map_err(|err| err.in_program(&key.program.label()))?;

        self.kernel_counters.record_miss(KERNEL_CACHE, label.clone());
        record_metric!(MetricEvent::KernelCacheAccess { cache_key: label, hit: false });
        self.kernels.insert(key, kernel.clone());
        Ok(kernel)
    }

    fn program_for(&mut self, api: &A, options: &ContextOptions, identity: &ProgramSource) -> Result<A::Program, ContextError> {
        let label = identity.label();
        let _span = info_span!("cache_get_or_create", cache = PROGRAM_CACHE, key = %label).entered();

        if let Some(program) = self.programs.get(identity) {
            self.program_counters.record_hit(PROGRAM_CACHE, label.clone());
            record_metric!(MetricEvent::KernelCacheAccess { cache_key: label, hit: true });
            return Ok(program.clone());
        }

        let text = identity.load()?;
        let started = Instant::now();
        let program = api
            .build_program(&text, &options.build_options)
            .map_err(|err| err.in_program(&label))?;
        let duration_us = started.elapsed().as_micros() as u64;
        debug!(program = %label, duration_us, "compiled program");

        self.program_counters.record_miss(PROGRAM_CACHE, label.clone());
        record_metric!(MetricEvent::KernelCacheAccess {
            cache_key: label.clone(),
            hit: false,
        });
        record_metric!(MetricEvent::ProgramCompiled { program: label, duration_us });
        self.programs.insert(identity.clone(), program.clone());
        Ok(program)
    }

    pub fn contains_program(&self, source: &ProgramSource, options: &ContextOptions) -> bool {
        self.programs.contains_key(source.resolve(options.kernel_dir.as_deref()).as_ref())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            programs: self.programs.len(),
            kernels: self.kernels.len(),
            program_hits: self.program_counters.hits(),
            program_misses: self.program_counters.misses(),
            kernel_hits: self.kernel_counters.hits(),
            kernel_misses: self.kernel_counters.misses(),
        }
    }

    pub fn program_counters(&self) -> &CacheCounters {
        &self.program_counters
    }

    pub fn kernel_counters(&self) -> &CacheCounters {
        &self.kernel_counters
    }

    /// Drop every cached handle. Counters are kept.
    pub fn clear(&mut self) {
        let programs = self.programs.len();
        let kernels = self.kernels.len();
        self.programs.clear();
        self.kernels.clear();
        self.program_counters.record_clear(PROGRAM_CACHE, programs);
        self.kernel_counters.record_clear(KERNEL_CACHE, kernels);
    }
}
