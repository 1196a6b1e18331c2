use std::fmt;

/// Summary of the most recent cache interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEvent {
    pub kind: CacheEventKind,
    pub cache: &'static str,
    pub detail: String,
}

impl CacheEvent {
    #[inline]
    pub fn new(kind: CacheEventKind, cache: &'static str, detail: String) -> Self {
        Self { kind, cache, detail }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} -> {}", self.cache, self.kind, self.detail)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEventKind {
    Hit,
    MissCreate,
    Cleared,
}

impl fmt::Display for CacheEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("hit"),
            Self::MissCreate => f.write_str("miss-create"),
            Self::Cleared => f.write_str("cleared"),
        }
    }
}

/// Hit and miss counters for one cache.
#[derive(Clone, Debug, Default)]
pub struct CacheCounters {
    hits: u64,
    misses: u64,
    last_event: Option<CacheEvent>,
}

impl CacheCounters {
    #[inline]
    pub fn record_hit(&mut self, cache: &'static str, detail: String) {
        self.hits = self.hits.saturating_add(1);
        self.last_event = Some(CacheEvent::new(CacheEventKind::Hit, cache, detail));
    }

    #[inline]
    pub fn record_miss(&mut self, cache: &'static str, detail: String) {
        self.misses = self.misses.saturating_add(1);
        self.last_event = Some(CacheEvent::new(CacheEventKind::MissCreate, cache, detail));
    }

    #[inline]
    pub fn record_clear(&mut self, cache: &'static str, cleared: usize) {
        self.last_event = Some(CacheEvent::new(CacheEventKind::Cleared, cache, format!("{cleared} entries")));
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    #[inline]
    pub fn last_event(&self) -> Option<&CacheEvent> {
        self.last_event.as_ref()
    }
}

/// Snapshot of the program and kernel caches of one context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub programs: usize,
    pub kernels: usize,
    pub program_hits: u64,
    pub program_misses: u64,
    pub kernel_hits: u64,
    pub kernel_misses: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.program_hits + self.kernel_hits
    }

    pub fn misses(&self) -> u64 {
        self.program_misses + self.kernel_misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "programs={} (hits={}, misses={}) kernels={} (hits={}, misses={})",
            self.programs, self.program_hits, self.program_misses, self.kernels, self.kernel_hits, self.kernel_misses
        )
    }
}
