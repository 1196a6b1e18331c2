//! Global tracing subscriber setup.

use tracing_subscriber::{
    Layer as _, filter::{LevelFilter, Targets}, layer::SubscriberExt as _, util::SubscriberInitExt as _
};

use crate::{
    config::{AppConfig, ConfigError}, exporters::{ConsoleExporter, JsonlExporter}, recorder::{MetricExporter, MetricsLayer}
};

/// Build the exporters requested by `config`.
pub fn exporters_for(config: &AppConfig) -> Result<Vec<Box<dyn MetricExporter>>, ConfigError> {
    let mut exporters: Vec<Box<dyn MetricExporter>> = Vec::new();
    if let Some(path) = &config.metrics_jsonl_path {
        let exporter = JsonlExporter::new(path).map_err(|source| ConfigError::MetricsSink {
            path: path.clone(),
            source,
        })?;
        exporters.push(Box::new(exporter));
    }
    if config.enable_console_metrics {
        exporters.push(Box::new(ConsoleExporter));
    }
    Ok(exporters)
}

/// Install the process-wide subscriber: human readable logs on stderr at
/// `config.log_level`, metric events routed to the configured exporters.
///
/// Metric events never reach the log output.
pub fn init_tracing(config: &AppConfig) -> Result<(), ConfigError> {
    let log_filter = Targets::new()
        .with_default(LevelFilter::from_level(config.log_level))
        .with_target("metrics", LevelFilter::OFF);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(log_filter);

    let exporters = exporters_for(config)?;
    let metrics_layer = (!exporters.is_empty())
        .then(|| MetricsLayer::new(exporters).with_filter(Targets::new().with_target("metrics", LevelFilter::INFO)));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(metrics_layer)
        .try_init()
        .map_err(|_| ConfigError::SubscriberInstalled)
}
