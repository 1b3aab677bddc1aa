use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

pub struct LoopMetrics {
    pub consequence: GaugeVec,
    pub archive_heard_ratio: GaugeVec,
    pub entropy: GaugeVec,
    pub delay_scale: GaugeVec,
    pub depth: GaugeVec,
    pub port_epoch: GaugeVec,
    pub events_total: IntCounterVec,
    pub failures_total: IntCounterVec,
}

impl LoopMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let consequence = gauge(
            registry,
            "deception_consequence",
            "Accumulated consequence scalar",
        )?;
        let archive_heard_ratio = gauge(
            registry,
            "deception_archive_heard_ratio",
            "Archive heard ratio",
        )?;
        let entropy = gauge(registry, "deception_entropy", "Smoothed loop entropy")?;
        let delay_scale = gauge(
            registry,
            "deception_delay_scale",
            "Current pacing delay scale",
        )?;
        let depth = gauge(registry, "deception_depth", "Completed rounds")?;
        let port_epoch = gauge(registry, "deception_port_epoch", "Port rotations so far")?;

        let events_total = IntCounterVec::new(
            Opts::new("deception_events_total", "Events recorded per kind"),
            &["endpoint", "event"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let failures_total = IntCounterVec::new(
            Opts::new("deception_failures_total", "Transient round failures"),
            &["endpoint"],
        )?;
        registry.register(Box::new(failures_total.clone()))?;

        Ok(Self {
            consequence,
            archive_heard_ratio,
            entropy,
            delay_scale,
            depth,
            port_epoch,
            events_total,
            failures_total,
        })
    }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec, prometheus::Error> {
    let vec = GaugeVec::new(Opts::new(name, help), &["endpoint"])?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

/// Text exposition of everything in `registry`.
pub fn encode_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
