use deception_core::{ConfigError, EventKind, EventSink, MetricState};
use serde_json::json;
use std::collections::VecDeque;

/// Fixed-size cyclic pool of listening ports. Entries are only reordered.
#[derive(Debug, Clone)]
pub struct PortRotator {
    pool: VecDeque<u16>,
}

impl PortRotator {
    pub fn new(ports: &[u16]) -> Result<Self, ConfigError> {
        if ports.is_empty() {
            return Err(ConfigError::invalid("ports", "port pool is empty"));
        }
        Ok(Self {
            pool: ports.iter().copied().collect(),
        })
    }

    pub fn pool(&self) -> Vec<u16> {
        self.pool.iter().copied().collect()
    }

    pub fn current(&self) -> u16 {
        self.pool[0]
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Moves the head to the tail, bumps the port epoch and reports the new head.
    pub fn rotate(&mut self, metrics: &mut MetricState, sink: &mut impl EventSink) -> u16 {
        self.pool.rotate_left(1);
        let port = self.current();
        metrics.port_epoch = metrics.port_epoch.saturating_add(1);
        sink.record(
            EventKind::PortSwitch,
            json!({
                "port": port,
                "epoch": metrics.port_epoch,
                "pool": self.pool(),
            }),
        );
        port
    }
}
