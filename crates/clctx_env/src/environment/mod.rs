//! Process environment facade shared by every clctx crate.

pub mod context;
pub mod guard;
pub mod instrument;
pub mod value;

use std::sync::{Mutex, MutexGuard, OnceLock};

use context::ContextEnvVar;
use instrument::InstrumentEnvVar;

/// Namespaced environment variable identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// Variables read when an execution context is configured.
    Context(ContextEnvVar),
    /// Variables read by logging and metrics setup.
    Instrument(InstrumentEnvVar),
}

impl From<ContextEnvVar> for EnvVar {
    fn from(value: ContextEnvVar) -> Self {
        Self::Context(value)
    }
}

impl From<InstrumentEnvVar> for EnvVar {
    fn from(value: InstrumentEnvVar) -> Self {
        Self::Instrument(value)
    }
}

impl EnvVar {
    /// Canonical process environment key.
    pub const fn key(self) -> &'static str {
        match self {
            EnvVar::Context(inner) => inner.key(),
            EnvVar::Instrument(inner) => inner.key(),
        }
    }
}

/// Serialises every read-modify-write of the process environment.
pub struct Environment;

impl Environment {
    /// Acquire the global environment mutex.
    ///
    /// A poisoned mutex is recovered: the guarded data is `()`, so there is no
    /// state a panicking holder could have left inconsistent.
    pub fn lock() -> MutexGuard<'static, ()> {
        static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the variable as UTF-8, if present.
    pub fn get(var: impl Into<EnvVar>) -> Option<String> {
        std::env::var(var.into().key()).ok()
    }

    /// Whether the variable is present at all, regardless of its value.
    pub fn is_set(var: impl Into<EnvVar>) -> bool {
        std::env::var_os(var.into().key()).is_some()
    }

    /// Set the variable, taking the global lock for the duration of the write.
    pub fn set(var: impl Into<EnvVar>, value: &str) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::set_locked(var, value, &mut guard);
    }

    /// Remove the variable, taking the global lock for the duration of the write.
    pub fn remove(var: impl Into<EnvVar>) {
        let var = var.into();
        let mut guard = Self::lock();
        Self::remove_locked(var, &mut guard);
    }

    pub(crate) fn set_locked(var: EnvVar, value: &str, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: holding the environment mutex serialises all mutation done through this crate.
        unsafe { std::env::set_var(var.key(), value) };
    }

    pub(crate) fn remove_locked(var: EnvVar, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: see `set_locked`.
        unsafe { std::env::remove_var(var.key()) };
    }
}
