use crate::metrics::LoopMetrics;
use deception_core::{EventKind, EventSink};
use prometheus::Registry;
use serde_json::Value;

/// Forwards every event to `inner` and mirrors the loop scalars into gauges.
pub struct PrometheusSink<S> {
    inner: S,
    metrics: LoopMetrics,
    endpoint: String,
}

impl<S: EventSink> PrometheusSink<S> {
    pub fn new(
        inner: S,
        registry: &Registry,
        endpoint: impl Into<String>,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            inner,
            metrics: LoopMetrics::new(registry)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn observe(&self, kind: EventKind, payload: &Value) {
        let m = &self.metrics;
        let labels = [self.endpoint.as_str()];
        m.events_total
            .with_label_values(&[self.endpoint.as_str(), kind.as_str()])
            .inc();

        match kind {
            EventKind::PortSwitch => {
                set(&m.port_epoch, &labels, payload, "epoch");
            }
            EventKind::ConsequenceUpdate => {
                set(&m.consequence, &labels, payload, "consequence_after");
                set(&m.archive_heard_ratio, &labels, payload, "archive_heard_ratio");
                set(&m.entropy, &labels, payload, "entropy");
                set(&m.delay_scale, &labels, payload, "delay_scale");
            }
            EventKind::Sleep => {
                // sleep reports the depth of the round that just finished
                if let Some(depth) = field(payload, "depth") {
                    m.depth.with_label_values(&labels).set(depth + 1.0);
                }
            }
            EventKind::Failure => {
                m.failures_total.with_label_values(&labels).inc();
                set(&m.entropy, &labels, payload, "entropy");
                set(&m.delay_scale, &labels, payload, "delay_scale");
            }
            EventKind::Halt => {
                set(&m.depth, &labels, payload, "depth");
            }
            _ => {}
        }
    }
}

impl<S: EventSink> EventSink for PrometheusSink<S> {
    fn record(&mut self, kind: EventKind, payload: Value) {
        self.observe(kind, &payload);
        self.inner.record(kind, payload);
    }
}

fn field(payload: &Value, key: &str) -> Option<f64> {
    payload.get(key).and_then(Value::as_f64)
}

fn set(gauge: &prometheus::GaugeVec, labels: &[&str], payload: &Value, key: &str) {
    if let Some(v) = field(payload, key) {
        gauge.with_label_values(labels).set(v);
    }
}
