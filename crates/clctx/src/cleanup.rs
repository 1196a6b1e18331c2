//! Registry of pending release actions for native resources.

use std::{
    collections::BTreeMap, fmt, sync::atomic::{AtomicU64, Ordering}
};

use clctx_instrumentation::{MetricEvent, record_metric};
use tracing::{debug, warn};

use crate::error::ContextError;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Zero-argument action that releases one native resource.
pub type ReleaseAction = Box<dyn FnOnce() -> Result<(), ContextError>>;

/// Identifies one pending action in the registry that minted it.
///
/// Keys are never reused. A key presented to any other registry is treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseKey {
    registry: u64,
    index: u64,
}

impl ReleaseKey {
    #[inline]
    pub fn registry_id(&self) -> u64 {
        self.registry
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.registry, self.index)
    }
}

/// Pending release actions plus a monotonically increasing key counter.
///
/// Dropping a registry that still holds actions does not run them; use
/// [`CleanupRegistry::run_all`] or [`CleanupRegistry::discard`] to dispose of it.
pub struct CleanupRegistry {
    id: u64,
    next_index: u64,
    actions: BTreeMap<u64, ReleaseAction>,
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("id", &self.id)
            .field("next_index", &self.next_index)
            .field("pending", &self.actions.len())
            .finish()
    }
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            next_index: 0,
            actions: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Index the next registered action will receive.
    #[inline]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn contains(&self, key: ReleaseKey) -> bool {
        key.registry == self.id && self.actions.contains_key(&key.index)
    }

    /// Pending keys, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = ReleaseKey> + '_ {
        self.actions.keys().map(|&index| ReleaseKey { registry: self.id, index })
    }

    pub fn register<F>(&mut self, action: F) -> ReleaseKey
    where
        F: FnOnce() -> Result<(), ContextError> + 'static,
    {
        self.insert(Box::new(action))
    }

    fn insert(&mut self, action: ReleaseAction) -> ReleaseKey {
        let index = self.next_index;
        self.next_index += 1;
        self.actions.insert(index, action);
        ReleaseKey { registry: self.id, index }
    }

    /// Remove the action under `key` without running it.
    pub fn unregister(&mut self, key: ReleaseKey) -> Option<ReleaseAction> {
        if key.registry != self.id {
            return None;
        }
        self.actions.remove(&key.index)
    }

    /// Run the action under `key` and remove it. Absent keys are a no-op.
    ///
    /// The action is removed before it runs, so it never runs twice even when it fails.
    pub fn run(&mut self, key: ReleaseKey) -> Result<(), ContextError> {
        match self.unregister(key) {
            Some(action) => action(),
            None => Ok(()),
        }
    }

    /// Run every pending action, newest first, and leave the registry empty.
    ///
    /// All actions run even when some fail; the first failure is returned.
    pub fn sweep(&mut self) -> Result<(), ContextError> {
        let actions = std::mem::take(&mut self.actions);
        let mut executed = 0u64;
        let mut failed = 0u64;
        let mut first_error = None;

        for (index, action) in actions.into_iter().rev() {
            executed += 1;
            if let Err(err) = action() {
                failed += 1;
                warn!(registry = self.id, index, error = %err, "release action failed");
                first_error.get_or_insert(err);
            }
        }

        if executed > 0 {
            debug!(registry = self.id, executed, failed, "swept cleanup registry");
            record_metric!(MetricEvent::CleanupSwept { executed, failed });
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Consume the registry, running every pending action.
    pub fn run_all(mut self) -> Result<(), ContextError> {
        self.sweep()
    }

    /// Drop every pending action without running it and return how many were dropped.
    pub fn discard(mut self) -> usize {
        let pending = std::mem::take(&mut self.actions).len();
        if pending > 0 {
            debug!(registry = self.id, pending, "discarding cleanup registry");
            record_metric!(MetricEvent::CleanupDiscarded { pending: pending as u64 });
        }
        pending
    }

    /// Move every action of `other` into this registry under fresh keys.
    ///
    /// Returns the `(old, new)` key pairs, oldest first.
    pub fn absorb(&mut self, mut other: CleanupRegistry) -> Vec<(ReleaseKey, ReleaseKey)> {
        let source = other.id;
        std::mem::take(&mut other.actions)
            .into_iter()
            .map(|(index, action)| {
                let old = ReleaseKey { registry: source, index };
                (old, self.insert(action))
            })
            .collect()
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        if !self.actions.is_empty() {
            warn!(
                registry = self.id,
                pending = self.actions.len(),
                "cleanup registry dropped with pending release actions; they will not run"
            );
        }
    }
}
