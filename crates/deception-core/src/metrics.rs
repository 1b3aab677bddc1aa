use crate::config::LoopConfig;
use serde::{Deserialize, Serialize};

pub const SCALE_CONSEQUENCE_GAIN: f64 = 0.8;
pub const FAILURE_ENTROPY_BUMP: f64 = 0.05;
pub const FAILURE_SCALE_BUMP: f64 = 0.1;
pub const FAILURE_SCALE_CAP: f64 = 2.5;

pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Half-away-from-zero rounding to `decimals` places, as used in event payloads.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Mutable scalars that drive the loop. Written by the modulator on
/// successful rounds and by the controller's failure path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricState {
    pub depth: u32,
    pub consequence: f64,
    pub archive_heard_ratio: f64,
    pub entropy: f64,
    pub port_epoch: u64,
    pub sessions: u64,
    pub failures: u64,
}

impl MetricState {
    pub fn from_config(cfg: &LoopConfig) -> Self {
        Self {
            depth: 0,
            consequence: clamp_unit(cfg.initial_consequence),
            archive_heard_ratio: clamp_unit(cfg.initial_archive_heard_ratio),
            entropy: clamp_unit(cfg.initial_entropy),
            port_epoch: 0,
            sessions: 0,
            failures: 0,
        }
    }

    pub fn unheard_ratio(&self) -> f64 {
        1.0 - self.archive_heard_ratio
    }

    /// Distance between consequence and the unheard complement.
    pub fn mismatch(&self) -> f64 {
        (self.consequence - self.unheard_ratio()).abs()
    }

    pub fn within_bounds(&self) -> bool {
        [self.consequence, self.archive_heard_ratio, self.entropy]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
        self.entropy = (self.entropy + FAILURE_ENTROPY_BUMP).min(1.0);
    }

    pub fn complete_round(&mut self) {
        self.depth = self.depth.saturating_add(1);
        self.sessions = self.sessions.saturating_add(1);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DelayParameters {
    pub base_ms: f64,
    pub jitter_ms: f64,
    /// >= 1.0; capped at FAILURE_SCALE_CAP only on the failure path.
    pub scale: f64,
    pub silence_threshold: f64,
}

impl DelayParameters {
    pub fn from_config(cfg: &LoopConfig) -> Self {
        Self {
            base_ms: cfg.base_ms,
            jitter_ms: cfg.jitter_ms,
            scale: 1.0,
            silence_threshold: cfg.silence_threshold,
        }
    }

    pub fn recompute_scale(&mut self, consequence: f64) {
        self.scale = 1.0 + consequence * SCALE_CONSEQUENCE_GAIN;
    }

    pub fn record_failure(&mut self) {
        self.scale = (self.scale + FAILURE_SCALE_BUMP).min(FAILURE_SCALE_CAP);
    }
}
