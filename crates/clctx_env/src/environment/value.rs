//! Strongly-typed environment variable descriptors.
//!
//! A [`TypedEnvVar`] pairs an [`EnvVar`] key with a parse callback and a format
//! callback, so callers read `Option<T>` instead of raw strings and tests can set
//! typed values through scoped guards.
//!
//! ```
//! use clctx_env::LOG_LEVEL;
//! use tracing::Level;
//!
//! let guard = LOG_LEVEL.set_guard(Level::DEBUG);
//! assert_eq!(LOG_LEVEL.get().unwrap(), Some(Level::DEBUG));
//! drop(guard);
//! ```

use std::{ops::Deref, sync::OnceLock};

use super::{EnvVar, Environment, guard::EnvVarGuard};

/// Errors raised while reading a typed environment variable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvVarError {
    /// The raw value is present but does not parse into the descriptor's type.
    #[error("failed to parse environment variable {name} from '{value}': {reason}")]
    Parse {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse callback: raw string to typed value, or a human readable reason.
pub type ParseFn<T> = fn(&str) -> Result<T, String>;
/// Format callback used when a typed value is written back to the environment.
pub type FormatFn<T> = fn(&T) -> String;

/// Descriptor for a strongly-typed environment variable.
#[derive(Clone, Copy)]
pub struct TypedEnvVar<T: 'static> {
    var: EnvVar,
    parse: ParseFn<T>,
    format: FormatFn<T>,
}

impl<T> TypedEnvVar<T> {
    pub const fn new(var: EnvVar, parse: ParseFn<T>, format: FormatFn<T>) -> Self {
        Self { var, parse, format }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.var.key()
    }

    #[must_use]
    pub const fn var(&self) -> EnvVar {
        self.var
    }

    /// Read and parse the variable. Absent variables are `Ok(None)`.
    pub fn get(&self) -> Result<Option<T>, EnvVarError> {
        let Some(raw) = Environment::get(self.var) else {
            return Ok(None);
        };
        (self.parse)(&raw).map(Some).map_err(|reason| EnvVarError::Parse {
            name: self.key(),
            value: raw,
            reason,
        })
    }

    /// Read the variable, falling back to `default` when it is absent.
    pub fn get_or(&self, default: T) -> Result<T, EnvVarError> {
        Ok(self.get()?.unwrap_or(default))
    }

    /// Read once and latch the result in `cache`; later environment changes are not observed.
    ///
    /// Malformed values latch as `None` and are logged once.
    pub fn get_cached(&self, cache: &'static OnceLock<Option<T>>) -> Option<T>
    where
        T: Clone,
    {
        cache
            .get_or_init(|| match self.get() {
                Ok(value) => value,
                Err(error) => {
                    tracing::warn!(%error, "ignoring malformed environment variable");
                    None
                }
            })
            .clone()
    }

    pub fn set(&self, value: T) {
        Environment::set(self.var, &(self.format)(&value));
    }

    pub fn unset(&self) {
        Environment::remove(self.var);
    }

    /// Set the variable to `value` until the returned guard is dropped.
    pub fn set_guard(&self, value: T) -> TypedEnvVarGuard<T> {
        let inner = EnvVarGuard::set(self.var, &(self.format)(&value));
        TypedEnvVarGuard { _inner: inner, value }
    }

    /// Unset the variable until the returned guard is dropped.
    pub fn unset_guard(&self) -> EnvVarGuard {
        EnvVarGuard::unset(self.var)
    }
}

/// Guard returned by [`TypedEnvVar::set_guard`]; dereferences to the value that was set.
#[must_use = "the previous value is restored as soon as the guard is dropped"]
pub struct TypedEnvVarGuard<T> {
    _inner: EnvVarGuard,
    value: T,
}

impl<T> Deref for TypedEnvVarGuard<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("value is not a recognised boolean".to_string()),
    }
}

pub(crate) fn format_display<T: std::fmt::Display>(value: &T) -> String {
    value.to_string()
}

pub(crate) fn parse_string(value: &str) -> Result<String, String> {
    Ok(value.to_string())
}
