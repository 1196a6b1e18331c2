//! Lazily populated program and kernel caches.

mod kernel_cache;
mod keys;
mod metrics;

pub use kernel_cache::KernelCache;
pub use keys::{KernelKey, ProgramSource};
pub use metrics::{CacheCounters, CacheEvent, CacheEventKind, CacheStats};
