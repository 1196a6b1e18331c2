//! Process-wide instrumentation configuration.

use std::path::PathBuf;
use std::sync::OnceLock;

use clctx_env::{EnvVarError, LOG_LEVEL, METRICS_CONSOLE, METRICS_JSONL_PATH};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("app configuration already initialised")]
    AlreadyInitialised,
    #[error("invalid log level '{value}'")]
    InvalidLogLevel { value: String },
    #[error("invalid boolean flag '{value}' for {name}")]
    InvalidBoolean { name: &'static str, value: String },
    #[error("failed to read instrumentation environment: {source}")]
    EnvVar {
        #[from]
        source: EnvVarError,
    },
    #[error("failed to open metrics sink {path}: {source}")]
    MetricsSink { path: PathBuf, source: std::io::Error },
    #[error("a global tracing subscriber is already installed")]
    SubscriberInstalled,
}

/// Logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: Level,
    pub metrics_jsonl_path: Option<PathBuf>,
    pub enable_console_metrics: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            metrics_jsonl_path: None,
            enable_console_metrics: false,
        }
    }
}

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl AppConfig {
    /// Load configuration from `CLCTX_LOG_LEVEL`, `CLCTX_METRICS_JSONL_PATH` and `CLCTX_METRICS_CONSOLE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let log_level = match LOG_LEVEL.get() {
            Ok(value) => value.unwrap_or(Level::INFO),
            Err(EnvVarError::Parse { value, .. }) => return Err(ConfigError::InvalidLogLevel { value }),
        };

        let metrics_jsonl_path = METRICS_JSONL_PATH.get()?;

        let enable_console_metrics = match METRICS_CONSOLE.get() {
            Ok(value) => value.unwrap_or(false),
            Err(EnvVarError::Parse { value, .. }) => {
                return Err(ConfigError::InvalidBoolean {
                    name: METRICS_CONSOLE.key(),
                    value,
                });
            }
        };

        Ok(Self {
            log_level,
            metrics_jsonl_path,
            enable_console_metrics,
        })
    }

    /// Store `config` as the process-wide instance. Fails if one is already stored.
    pub fn initialise(config: AppConfig) -> Result<&'static Self, ConfigError> {
        APP_CONFIG.set(config).map_err(|_| ConfigError::AlreadyInitialised)?;
        APP_CONFIG.get().ok_or(ConfigError::AlreadyInitialised)
    }

    /// The stored instance, or a fresh read of the environment stored on first use.
    pub fn get_or_init_from_env() -> Result<&'static Self, ConfigError> {
        if let Some(config) = APP_CONFIG.get() {
            return Ok(config);
        }
        let config = Self::from_env()?;
        Ok(APP_CONFIG.get_or_init(|| config))
    }

    pub fn try_global() -> Option<&'static Self> {
        APP_CONFIG.get()
    }
}
