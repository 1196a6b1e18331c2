//! Logging setup and structured metric events for the clctx execution context.

pub mod config;
pub mod event;
pub mod exporters;
pub mod logging;
pub mod macros;
pub mod prelude;
pub mod recorder;

pub use config::{AppConfig, ConfigError};
pub use event::MetricEvent;
pub use logging::init_tracing;
pub use recorder::{EnrichedMetricEvent, MetricExporter, MetricsLayer};

#[doc(hidden)]
pub use serde_json as __serde_json;
#[doc(hidden)]
pub use tracing as __tracing;

mod tests;
