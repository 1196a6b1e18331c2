//! Entry points that run a computation in a fresh context and dispose of its registry.

use tracing::{error, info_span, warn};

use super::Context;
use crate::{backend::ComputeApi, cleanup::CleanupRegistry, environment::Environment, error::ContextError};

/// Result of [`run_checked`]: the computation's result and its untouched registry.
pub struct Outcome<T> {
    pub result: Result<T, ContextError>,
    pub cleanup: CleanupRegistry,
}

impl<T> Outcome<T> {
    /// Sweep the registry and return the computation's result.
    ///
    /// A computation error takes precedence over a cleanup error.
    pub fn finish(self) -> Result<T, ContextError> {
        let swept = self.cleanup.run_all();
        let value = self.result?;
        swept.map(|()| value)
    }
}

fn execute<A, T, F>(env: &Environment<A>, mode: &'static str, computation: F) -> (Result<T, ContextError>, CleanupRegistry)
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    let _span = info_span!("run", mode).entered();
    let mut ctx = Context::new(env.clone());
    let result = ctx.complete(computation);
    let (cleanup, _cache) = ctx.into_parts();
    (result, cleanup)
}

fn sweep_after_failure(cleanup: CleanupRegistry, err: &ContextError) {
    if let Err(cleanup_err) = cleanup.run_all() {
        warn!(error = %err, cleanup_error = %cleanup_err, "cleanup after a failed computation also failed");
    }
}

/// Run `computation` in a fresh context.
///
/// On success the value is returned together with every still-pending release
/// action; the caller decides when they run. On failure the pending actions run
/// before the error is returned.
pub fn run<A, T, F>(env: &Environment<A>, computation: F) -> Result<(T, CleanupRegistry), ContextError>
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    match execute(env, "run", computation) {
        (Ok(value), cleanup) => Ok((value, cleanup)),
        (Err(err), cleanup) => {
            sweep_after_failure(cleanup, &err);
            Err(err)
        }
    }
}

/// Run `computation` and sweep every pending release action afterwards, on success and on failure.
pub fn run_clean<A, T, F>(env: &Environment<A>, computation: F) -> Result<T, ContextError>
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    match execute(env, "run_clean", computation) {
        (Ok(value), cleanup) => cleanup.run_all().map(|()| value),
        (Err(err), cleanup) => {
            sweep_after_failure(cleanup, &err);
            Err(err)
        }
    }
}

/// Run `computation` and drop the registry without running any release action.
///
/// Resources registered during the computation stay allocated.
pub fn run_leaky<A, T, F>(env: &Environment<A>, computation: F) -> Result<T, ContextError>
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    let (result, cleanup) = execute(env, "run_leaky", computation);
    cleanup.discard();
    result
}

/// Run `computation` and hand back its result and registry untouched, whether it failed or not.
pub fn run_checked<A, T, F>(env: &Environment<A>, computation: F) -> Outcome<T>
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    let (result, cleanup) = execute(env, "run_checked", computation);
    Outcome { result, cleanup }
}

/// Top-level convenience: [`run_clean`], treating any failure as fatal.
///
/// # Panics
///
/// Panics after running the pending cleanup and logging the error when the
/// computation or its cleanup fails.
pub fn run_or_abort<A, T, F>(env: &Environment<A>, computation: F) -> T
where
    A: ComputeApi,
    F: FnOnce(&mut Context<A>) -> Result<T, ContextError>,
{
    match run_clean(env, computation) {
        Ok(value) => value,
        Err(err) => {
            error!(error = %err, kind = ?err.kind(), "computation failed, aborting");
            panic!("clctx computation failed: {err}");
        }
    }
}
