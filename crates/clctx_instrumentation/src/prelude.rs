//! Convenience re-exports for instrumentation consumers.

pub use crate::config::{AppConfig, ConfigError};
pub use crate::event::MetricEvent;
pub use crate::exporters::{ChannelExporter, ConsoleExporter, JsonlExporter};
pub use crate::logging::{exporters_for, init_tracing};
pub use crate::record_metric;
pub use crate::recorder::{EnrichedMetricEvent, MetricExporter, MetricsLayer};

pub use clctx_env::{EnvVarGuard, InstrumentEnvVar, LOG_LEVEL, METRICS_CONSOLE, METRICS_JSONL_PATH};

pub use tracing::{Level, info, info_span, subscriber};
pub use tracing_subscriber::{self, layer::SubscriberExt};
