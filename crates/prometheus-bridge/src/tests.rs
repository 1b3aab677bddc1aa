use crate::{encode_text, PrometheusSink};
use deception_core::{round_to, EventKind, EventSink, LoopConfig, MemorySink, RngSource, RoundStage};
use deception_loop::{DeceptionLoop, RecordingPacer, ScriptedFaults};
use prometheus::Registry;
use serde_json::json;

fn instant_config(max_depth: u32) -> LoopConfig {
    LoopConfig {
        max_depth,
        base_ms: 0.0,
        jitter_ms: 0.0,
        ..LoopConfig::default_reference()
    }
}

#[test]
fn gauges_follow_a_run() {
    let registry = Registry::new();
    let cfg = instant_config(5);
    let endpoint = cfg.endpoint_id.clone();
    let sink = PrometheusSink::new(MemorySink::new(), &registry, endpoint.clone()).unwrap();
    let mut lp = DeceptionLoop::new(cfg, sink, RngSource::seeded(21), RecordingPacer::new())
        .unwrap()
        .with_faults(ScriptedFaults::new(RoundStage::Rotate, [2]));
    let summary = lp.run();

    let sink = lp.into_sink();
    let m = sink.metrics();
    let labels = [endpoint.as_str()];
    assert_eq!(
        m.consequence.with_label_values(&labels).get(),
        round_to(summary.final_consequence, 3)
    );
    assert_eq!(
        m.archive_heard_ratio.with_label_values(&labels).get(),
        round_to(summary.final_archive_heard_ratio, 3)
    );
    assert_eq!(m.depth.with_label_values(&labels).get(), summary.depth as f64);
    assert_eq!(
        m.port_epoch.with_label_values(&labels).get(),
        summary.port_epoch as f64
    );
    assert_eq!(m.failures_total.with_label_values(&labels).get(), 1);
    assert_eq!(
        m.events_total
            .with_label_values(&[endpoint.as_str(), "boot"])
            .get(),
        1
    );
    assert_eq!(
        m.events_total
            .with_label_values(&[endpoint.as_str(), "sleep"])
            .get(),
        summary.sessions
    );
    assert_eq!(sink.inner().count(EventKind::Shutdown), 1);
}

#[test]
fn events_reach_the_inner_sink_unchanged() {
    let registry = Registry::new();
    let mut sink = PrometheusSink::new(MemorySink::new(), &registry, "edge-1").unwrap();
    let payload = json!({ "port": 443, "epoch": 7, "pool": [443, 2222] });
    sink.record(EventKind::PortSwitch, payload.clone());

    let inner = sink.inner();
    assert_eq!(inner.events().len(), 1);
    assert_eq!(inner.events()[0].payload, payload);
    assert_eq!(
        sink.metrics().port_epoch.with_label_values(&["edge-1"]).get(),
        7.0
    );
}

#[test]
fn registering_twice_fails() {
    let registry = Registry::new();
    let _first = PrometheusSink::new(MemorySink::new(), &registry, "a").unwrap();
    assert!(PrometheusSink::new(MemorySink::new(), &registry, "b").is_err());
}

#[test]
fn text_exposition_lists_loop_metrics() {
    let registry = Registry::new();
    let mut sink = PrometheusSink::new(MemorySink::new(), &registry, "edge-1").unwrap();
    sink.record(
        EventKind::ConsequenceUpdate,
        json!({
            "consequence_before": 0.1,
            "consequence_after": 0.2,
            "archive_heard_ratio": 0.44,
            "entropy": 0.171,
            "delay_scale": 1.16,
        }),
    );
    let text = encode_text(&registry).unwrap();
    assert!(text.contains("deception_consequence{endpoint=\"edge-1\"} 0.2"));
    assert!(text.contains("deception_events_total"));
}
