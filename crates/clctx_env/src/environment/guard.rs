//! Scoped mutation of raw environment variables.

use super::{EnvVar, Environment, context::ContextEnvVar};

/// Restores every variable it touched to its previous value (or absence) when dropped.
///
/// A guard may hold several variables. They are restored in reverse order, so a
/// variable touched twice ends up with the value it had before the first change.
#[must_use = "the previous value is restored as soon as the guard is dropped"]
pub struct EnvVarGuard {
    saved: Vec<(EnvVar, Option<String>)>,
}

impl EnvVarGuard {
    /// Set `var` to `value` until the guard is dropped.
    pub fn set(var: impl Into<EnvVar>, value: &str) -> Self {
        Self { saved: Vec::new() }.and_set(var, value)
    }

    /// Remove `var` until the guard is dropped.
    pub fn unset(var: impl Into<EnvVar>) -> Self {
        Self { saved: Vec::new() }.and_unset(var)
    }

    /// Remove every [`ContextEnvVar`], so backend selection and build options fall
    /// back to their defaults until the guard is dropped.
    pub fn isolate_context() -> Self {
        ContextEnvVar::ALL
            .into_iter()
            .fold(Self { saved: Vec::new() }, |guard, var| guard.and_unset(var))
    }

    /// Also set `var` to `value`, restored together with the rest of the guard.
    pub fn and_set(mut self, var: impl Into<EnvVar>, value: &str) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        self.saved.push((var, Environment::get(var)));
        Environment::set_locked(var, value, &mut lock);
        self
    }

    /// Also remove `var`, restored together with the rest of the guard.
    pub fn and_unset(mut self, var: impl Into<EnvVar>) -> Self {
        let var = var.into();
        let mut lock = Environment::lock();
        self.saved.push((var, Environment::get(var)));
        Environment::remove_locked(var, &mut lock);
        self
    }

    /// Variables this guard restores on drop, in the order they were first touched.
    pub fn vars(&self) -> impl Iterator<Item = EnvVar> + '_ {
        self.saved.iter().map(|(var, _)| *var)
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let mut lock = Environment::lock();
        for (var, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(previous) => Environment::set_locked(var, &previous, &mut lock),
                None => Environment::remove_locked(var, &mut lock),
            }
        }
    }
}
