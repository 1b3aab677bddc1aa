use crate::{
    clamp_unit, round_to, ConfigError, DelayParameters, EntropySource, EventKind, EventSink,
    JsonLinesSink, LoopConfig, MemorySink, MetricState, ProbeVector, RngSource, ScriptedSource,
    FAILURE_SCALE_CAP, REFERENCE_PORTS,
};
use proptest::prelude::*;
use serde_json::json;
use std::io::{self, Write};

#[test]
fn reference_config_is_valid() {
    let cfg = LoopConfig::default_reference();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.ports, REFERENCE_PORTS.to_vec());
    assert_eq!(cfg.max_depth, 64);
    assert_eq!(cfg, LoopConfig::default());
}

#[test]
fn partial_json_falls_back_to_reference_values() {
    let cfg = LoopConfig::from_json_str(r#"{ "max_depth": 8, "ports": [22, 23] }"#).unwrap();
    assert_eq!(cfg.max_depth, 8);
    assert_eq!(cfg.ports, vec![22, 23]);
    assert_eq!(cfg.base_ms, 120.0);
    assert_eq!(cfg.silence_threshold, 0.85);
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = LoopConfig::from_json_str("{ max_depth: }").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let path = std::path::Path::new("/nonexistent/loop.json");
    let err = LoopConfig::from_json_file(path).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn validation_rejects_bad_pools_and_scalars() {
    let mut cfg = LoopConfig::default_reference();
    cfg.ports.clear();
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "ports", .. })
    ));

    let mut cfg = LoopConfig::default_reference();
    cfg.ports.push(443);
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "ports", .. })
    ));

    let mut cfg = LoopConfig::default_reference();
    cfg.jitter_ms = -1.0;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "jitter_ms", .. })
    ));

    let mut cfg = LoopConfig::default_reference();
    cfg.base_ms = f64::NAN;
    assert!(cfg.validate().is_err());

    let mut cfg = LoopConfig::default_reference();
    cfg.initial_archive_heard_ratio = 1.2;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid {
            field: "initial_archive_heard_ratio",
            ..
        })
    ));
}

#[test]
fn zero_delay_config_is_valid() {
    let mut cfg = LoopConfig::default_reference();
    cfg.base_ms = 0.0;
    cfg.jitter_ms = 0.0;
    assert!(cfg.validate().is_ok());
}

#[test]
fn metric_state_starts_from_config() {
    let cfg = LoopConfig::default_reference();
    let m = MetricState::from_config(&cfg);
    assert_eq!(m.depth, 0);
    assert_eq!(m.consequence, 0.10);
    assert_eq!(m.archive_heard_ratio, 0.50);
    assert_eq!(m.entropy, 0.15);
    assert!((m.unheard_ratio() - 0.5).abs() < 1e-12);
    assert!((m.mismatch() - 0.4).abs() < 1e-12);
    assert!(m.within_bounds());
}

#[test]
fn failure_bumps_saturate() {
    let cfg = LoopConfig::default_reference();
    let mut m = MetricState::from_config(&cfg);
    let mut d = DelayParameters::from_config(&cfg);
    for _ in 0..50 {
        m.record_failure();
        d.record_failure();
    }
    assert_eq!(m.failures, 50);
    assert_eq!(m.entropy, 1.0);
    assert!((d.scale - FAILURE_SCALE_CAP).abs() < 1e-12);
    assert_eq!(m.depth, 0);
}

#[test]
fn scale_tracks_consequence() {
    let mut d = DelayParameters::from_config(&LoopConfig::default_reference());
    d.recompute_scale(0.2);
    assert!((d.scale - 1.16).abs() < 1e-12);
    d.recompute_scale(1.0);
    assert!((d.scale - 1.8).abs() < 1e-12);
}

#[test]
fn rounding_matches_payload_precision() {
    assert_eq!(round_to(0.123456, 3), 0.123);
    assert_eq!(round_to(0.1235, 2), 0.12);
    assert_eq!(round_to(183.456, 2), 183.46);
    assert_eq!(round_to(0.0, 3), 0.0);
}

#[test]
fn only_ego_and_memory_carry_a_sign() {
    assert_eq!(ProbeVector::Ego.consequence_sign(), 1.0);
    assert_eq!(ProbeVector::Memory.consequence_sign(), -1.0);
    for v in [ProbeVector::Mirror, ProbeVector::Archive, ProbeVector::Static] {
        assert_eq!(v.consequence_sign(), 0.0);
    }
}

#[test]
fn event_kinds_use_snake_case_wire_names() {
    for kind in EventKind::ALL {
        let encoded = serde_json::to_value(kind).unwrap();
        assert_eq!(encoded, json!(kind.as_str()));
    }
    assert_eq!(EventKind::HoneypotCapture.as_str(), "honeypot_capture");
}

#[test]
fn memory_sink_stamps_unique_ids() {
    let mut sink = MemorySink::new();
    sink.record(EventKind::Boot, json!({ "message": "up" }));
    sink.record(EventKind::Halt, json!({ "reason": "max_depth", "depth": 3 }));
    assert_eq!(sink.kinds(), vec![EventKind::Boot, EventKind::Halt]);
    assert_ne!(sink.events()[0].id, sink.events()[1].id);
    assert_eq!(sink.count(EventKind::Halt), 1);
    assert_eq!(sink.last().unwrap().payload["depth"], 3);
}

#[test]
fn json_lines_sink_writes_one_object_per_line() {
    let mut sink = JsonLinesSink::new(Vec::new());
    sink.record(EventKind::Sleep, json!({ "slept_ms": 12.5, "depth": 0, "scale": 1.08 }));
    sink.record(EventKind::Shutdown, json!({ "sessions": 1 }));
    assert_eq!(sink.written(), 2);
    let raw = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<_> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["event"], "sleep");
    assert_eq!(first["payload"]["slept_ms"], 12.5);
    assert!(first["id"].is_string());
    assert!(first["timestamp"].is_string());
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn json_lines_sink_swallows_write_errors() {
    let mut sink = JsonLinesSink::new(BrokenPipe);
    sink.record(EventKind::Boot, json!({}));
    sink.record(EventKind::Halt, json!({}));
    assert_eq!(sink.written(), 0);
    assert_eq!(sink.write_errors(), 2);
}

#[test]
fn seeded_sources_are_reproducible() {
    let mut a = RngSource::seeded(7);
    let mut b = RngSource::seeded(7);
    for _ in 0..32 {
        assert_eq!(a.unit(), b.unit());
        assert_eq!(a.pick(5), b.pick(5));
    }
}

#[test]
fn scripted_source_replays_then_defaults() {
    let mut src = ScriptedSource::new([0.25, 0.5], [2, 7]);
    assert_eq!(src.unit(), 0.25);
    assert_eq!(src.unit(), 0.5);
    assert_eq!(src.unit(), 0.0);
    assert_eq!(src.pick(5), 2);
    assert_eq!(src.pick(5), 2);
    assert_eq!(src.pick(5), 0);
}

proptest! {
    #[test]
    fn rng_source_draws_stay_in_range(seed in any::<u64>(), len in 1usize..16) {
        let mut src = RngSource::seeded(seed);
        for _ in 0..64 {
            let u = src.unit();
            prop_assert!((0.0..1.0).contains(&u));
            prop_assert!(src.pick(len) < len);
        }
    }

    #[test]
    fn clamp_unit_stays_in_bounds(x in -10.0f64..10.0) {
        let c = clamp_unit(x);
        prop_assert!((0.0..=1.0).contains(&c));
    }
}
