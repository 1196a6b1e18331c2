use std::sync::mpsc;
use std::time::Duration;

use crate::prelude::*;

#[test]
fn metrics_layer_enriches_span_context() {
    let (sender, receiver) = mpsc::channel();
    let exporters: Vec<Box<dyn MetricExporter>> = vec![Box::new(ChannelExporter::new(sender))];
    let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(exporters));

    let metric_event = MetricEvent::KernelCacheAccess {
        cache_key: "kernel:vec_add.cl#add".to_string(),
        hit: false,
    };

    let (parent_id, child_id) = subscriber::with_default(subscriber, || {
        let parent_span = info_span!("run");
        let parent_id = parent_span.id().map(|id| id.into_u64());
        let _parent_guard = parent_span.enter();

        let child_span = info_span!("get_kernel");
        let child_id = child_span.id().map(|id| id.into_u64());
        let _child_guard = child_span.enter();

        record_metric!(metric_event.clone());
        (parent_id, child_id)
    });

    let enriched = receiver.recv_timeout(Duration::from_secs(1)).expect("metric should be dispatched");
    assert_eq!(enriched.span_id, child_id);
    assert_eq!(enriched.parent_span_id, parent_id);
    assert_eq!(enriched.span_name.as_deref(), Some("get_kernel"));
    assert_eq!(enriched.event, metric_event);
}

#[test]
fn metrics_layer_ignores_non_metric_events() {
    let (sender, receiver) = mpsc::channel();
    let exporters: Vec<Box<dyn MetricExporter>> = vec![Box::new(ChannelExporter::new(sender))];
    let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(exporters));

    subscriber::with_default(subscriber, || {
        let _guard = info_span!("plain").entered();
        info!("not a metric");
    });

    assert!(receiver.try_recv().is_err(), "channel should remain empty");
}

#[test]
fn jsonl_exporter_appends_lines() {
    let path = std::env::temp_dir().join(format!("clctx-metrics-{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);

    let exporters: Vec<Box<dyn MetricExporter>> = vec![Box::new(JsonlExporter::new(&path).expect("open jsonl"))];
    let subscriber = tracing_subscriber::registry().with(MetricsLayer::new(exporters));
    subscriber::with_default(subscriber, || {
        record_metric!(MetricEvent::BufferAllocated { bytes: 16, managed: true });
        record_metric!(MetricEvent::BufferReleased { bytes: 16 });
    });

    let contents = std::fs::read_to_string(&path).expect("read jsonl");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("BufferAllocated"));
    assert!(lines[1].contains("BufferReleased"));
    let _ = std::fs::remove_file(&path);
}
