//! Metric event definitions.

use serde::{Deserialize, Serialize};

/// Structured events emitted by the execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MetricEvent {
    /// A program was compiled because its identity was not cached yet.
    ProgramCompiled { program: String, duration_us: u64 },
    /// A program or kernel cache lookup.
    KernelCacheAccess { cache_key: String, hit: bool },
    /// A native memory object was created.
    BufferAllocated { bytes: u64, managed: bool },
    /// A native memory object was released.
    BufferReleased { bytes: u64 },
    /// A cleanup registry was swept.
    CleanupSwept { executed: u64, failed: u64 },
    /// A cleanup registry with pending actions was dropped without running them.
    CleanupDiscarded { pending: u64 },
}
