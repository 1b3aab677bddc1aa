use deception_core::{
    clamp_unit, round_to, DelayParameters, EventKind, EventSink, MetricState,
};
use serde::Serialize;
use serde_json::json;

pub const ENTROPY_RETENTION: f64 = 0.9;
pub const MISMATCH_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModulationOutcome {
    pub consequence_before: f64,
    pub consequence_after: f64,
    pub archive_heard_ratio: f64,
    pub entropy: f64,
    pub delay_scale: f64,
}

/// Applies a round's deltas in place. Consequence, ratio and entropy stay in
/// [0,1]; the delay scale is recomputed from consequence with no upper clamp.
pub fn modulate(
    metrics: &mut MetricState,
    delay: &mut DelayParameters,
    delta_consequence: f64,
    heard_delta: f64,
    sink: &mut impl EventSink,
) -> ModulationOutcome {
    let consequence_before = metrics.consequence;

    metrics.consequence = clamp_unit(metrics.consequence + delta_consequence);
    metrics.archive_heard_ratio = clamp_unit(metrics.archive_heard_ratio + heard_delta);

    let mismatch = metrics.mismatch();
    metrics.entropy =
        clamp_unit(metrics.entropy * ENTROPY_RETENTION + mismatch * MISMATCH_WEIGHT);

    delay.recompute_scale(metrics.consequence);

    let outcome = ModulationOutcome {
        consequence_before,
        consequence_after: metrics.consequence,
        archive_heard_ratio: metrics.archive_heard_ratio,
        entropy: metrics.entropy,
        delay_scale: delay.scale,
    };

    sink.record(
        EventKind::ConsequenceUpdate,
        json!({
            "consequence_before": round_to(outcome.consequence_before, 3),
            "consequence_after": round_to(outcome.consequence_after, 3),
            "archive_heard_ratio": round_to(outcome.archive_heard_ratio, 3),
            "entropy": round_to(outcome.entropy, 3),
            "delay_scale": round_to(outcome.delay_scale, 3),
        }),
    );

    outcome
}
