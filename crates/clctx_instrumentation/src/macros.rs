//! Macros for emitting metric events through `tracing`.

/// Serialise a [`MetricEvent`](crate::MetricEvent) and emit it on the `metrics` target.
///
/// Nothing is emitted when no subscriber is interested in the `metrics` target.
#[macro_export]
macro_rules! record_metric {
    ($event:expr) => {{
        if $crate::__tracing::enabled!(target: "metrics", $crate::__tracing::Level::INFO) {
            if let Ok(__metric_json) = $crate::__serde_json::to_string(&$event) {
                $crate::__tracing::event!(
                    target: "metrics",
                    $crate::__tracing::Level::INFO,
                    metric = %__metric_json
                );
            }
        }
    }};
}
