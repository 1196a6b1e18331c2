use tracing::{debug, warn};

use crate::{
    backend::ComputeApi, caching::{CacheStats, KernelCache, ProgramSource}, cleanup::{CleanupRegistry, ReleaseAction, ReleaseKey}, environment::{ContextOptions, Environment}, error::{BackendError, ContextError, ErrorKind}
};

/// Execution context for one computation: a read-only [`Environment`], the pending
/// cleanup actions, the program/kernel cache and the failure channel.
///
/// Once an operation fails, the failure is recorded and every later operation that
/// would issue native work is refused with [`ContextError::Aborted`]. Releasing
/// resources stays possible after a failure.
pub struct Context<A: ComputeApi> {
    env: Environment<A>,
    pub(crate) cleanup: CleanupRegistry,
    cache: KernelCache<A>,
    failure: Option<(ErrorKind, String)>,
}

impl<A: ComputeApi> Context<A> {
    pub fn new(env: Environment<A>) -> Self {
        Self {
            env,
            cleanup: CleanupRegistry::new(),
            cache: KernelCache::new(),
            failure: None,
        }
    }

    #[inline]
    pub fn environment(&self) -> &Environment<A> {
        &self.env
    }

    #[inline]
    pub fn api(&self) -> &A {
        self.env.api()
    }

    #[inline]
    pub fn options(&self) -> &ContextOptions {
        self.env.options()
    }

    /// The failure recorded for this computation, if any.
    #[inline]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_ref().map(|(_, cause)| cause.as_str())
    }

    #[inline]
    pub fn pending_cleanups(&self) -> usize {
        self.cleanup.len()
    }

    #[inline]
    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.cleanup
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Split the context into its registry and cache, dropping the environment handle.
    pub fn into_parts(self) -> (CleanupRegistry, KernelCache<A>) {
        (self.cleanup, self.cache)
    }

    pub fn register_cleanup<F>(&mut self, action: F) -> ReleaseKey
    where
        F: FnOnce() -> Result<(), ContextError> + 'static,
    {
        let key = self.cleanup.register(action);
        debug!(key = %key, "registered release action");
        key
    }

    /// Run the action under `key` once and forget it. Absent keys are a no-op.
    pub fn run_cleanup(&mut self, key: ReleaseKey) -> Result<(), ContextError> {
        let result = self.cleanup.run(key);
        self.check(result)
    }

    pub fn unregister_cleanup(&mut self, key: ReleaseKey) -> Option<ReleaseAction> {
        self.cleanup.unregister(key)
    }

    /// Run every pending action of the current registry.
    pub fn sweep_cleanup(&mut self) -> Result<(), ContextError> {
        let result = self.cleanup.sweep();
        self.check(result)
    }

    /// Move the remaining actions of a nested computation's registry into this one.
    ///
    /// Every action gets a fresh key; the returned pairs map old keys to new ones.
    pub fn adopt_cleanup(&mut self, child: CleanupRegistry) -> Vec<(ReleaseKey, ReleaseKey)> {
        let moved = self.cleanup.absorb(child);
        if !moved.is_empty() {
            debug!(adopted = moved.len(), "adopted nested cleanup actions");
        }
        moved
    }

    /// Compiled kernel `name` from `source`, building the program on first use.
    pub fn get_kernel(&mut self, source: &ProgramSource, name: &str) -> Result<A::Kernel, ContextError> {
        self.ensure_live()?;
        let result = self.cache.get_kernel(self.env.api(), self.env.options(), source, name);
        self.check(result)
    }

    /// Compiled program for `source`, building it on first use.
    pub fn get_program(&mut self, source: &ProgramSource) -> Result<A::Program, ContextError> {
        self.ensure_live()?;
        let result = self.cache.get_program(self.env.api(), self.env.options(), source);
        self.check(result)
    }

    /// Run `computation` against a fresh cleanup registry, sharing this context's
    /// environment and cache.
    ///
    /// The child registry is returned as is and never merged. When the computation
    /// fails, the child's pending actions run, the failure is recorded on this
    /// context and the error propagates.
    pub fn nest<T, F>(&mut self, computation: F) -> Result<(T, CleanupRegistry), ContextError>
    where
        F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
    {
        self.ensure_live()?;
        let parent = std::mem::take(&mut self.cleanup);
        let result = self.complete(computation);
        let child = std::mem::replace(&mut self.cleanup, parent);

        match result {
            Ok(value) => Ok((value, child)),
            Err(err) => {
                if let Err(cleanup_err) = child.run_all() {
                    warn!(error = %cleanup_err, "nested cleanup failed after an aborted computation");
                }
                Err(err)
            }
        }
    }

    /// Run `computation` and fold the failure channel into its result.
    pub(crate) fn complete<T, F>(&mut self, computation: F) -> Result<T, ContextError>
    where
        F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
    {
        match computation(self) {
            // A swallowed error still fails the computation.
            Ok(value) => self.ensure_live().map(|()| value),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Refuse the operation when a failure was already recorded.
    pub(crate) fn ensure_live(&self) -> Result<(), ContextError> {
        match &self.failure {
            Some((kind, cause)) => Err(ContextError::Aborted {
                kind: *kind,
                cause: cause.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Record `err` on the failure channel (first failure wins) and hand it back.
    pub(crate) fn fail(&mut self, err: ContextError) -> ContextError {
        if self.failure.is_none() {
            debug!(error = %err, "computation failed");
            self.failure = Some((err.kind(), err.to_string()));
        }
        err
    }

    #[inline]
    pub(crate) fn check<T>(&mut self, result: Result<T, ContextError>) -> Result<T, ContextError> {
        result.map_err(|err| self.fail(err))
    }

    /// Issue one native call, recording a failure on the channel.
    pub(crate) fn native<T>(&mut self, call: impl FnOnce(&A) -> Result<T, BackendError>) -> Result<T, ContextError> {
        let result = call(self.env.api()).map_err(ContextError::from);
        self.check(result)
    }
}
