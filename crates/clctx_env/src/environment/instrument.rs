//! Logging and metrics variables.

use std::path::PathBuf;

use tracing::Level;

use super::EnvVar;
use super::value::{TypedEnvVar, format_display, parse_bool};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentEnvVar {
    /// Minimum tracing level.
    LogLevel,
    /// Path where metric events are appended as JSON lines.
    MetricsJsonlPath,
    /// Print metric events to stdout when truthy.
    MetricsConsole,
}

impl InstrumentEnvVar {
    pub const fn key(self) -> &'static str {
        match self {
            InstrumentEnvVar::LogLevel => "CLCTX_LOG_LEVEL",
            InstrumentEnvVar::MetricsJsonlPath => "CLCTX_METRICS_JSONL_PATH",
            InstrumentEnvVar::MetricsConsole => "CLCTX_METRICS_CONSOLE",
        }
    }

    pub const fn into_env(self) -> EnvVar {
        EnvVar::Instrument(self)
    }
}

/// `CLCTX_LOG_LEVEL`: one of `trace`, `debug`, `info`, `warn`, `error`.
pub const LOG_LEVEL: TypedEnvVar<Level> = TypedEnvVar::new(InstrumentEnvVar::LogLevel.into_env(), parse_level, format_display);

/// `CLCTX_METRICS_JSONL_PATH`
pub const METRICS_JSONL_PATH: TypedEnvVar<PathBuf> =
    TypedEnvVar::new(InstrumentEnvVar::MetricsJsonlPath.into_env(), parse_path, format_path);

/// `CLCTX_METRICS_CONSOLE`
pub const METRICS_CONSOLE: TypedEnvVar<bool> = TypedEnvVar::new(InstrumentEnvVar::MetricsConsole.into_env(), parse_bool, format_display);

fn parse_level(value: &str) -> Result<Level, String> {
    value.trim().parse::<Level>().map_err(|_| "invalid tracing level".to_string())
}

fn parse_path(value: &str) -> Result<PathBuf, String> {
    if value.trim().is_empty() {
        return Err("path is empty".to_string());
    }
    Ok(PathBuf::from(value))
}

fn format_path(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
