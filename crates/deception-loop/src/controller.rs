use crate::delay::{compute_and_wait, Pacer};
use crate::fault::{FaultInjector, NoFaults};
use crate::modulator::{modulate, ModulationOutcome};
use crate::rotator::PortRotator;
use crate::synthesizer::ProbeSynthesizer;
use deception_core::{
    round_to, ConfigError, DelayParameters, EntropySource, EventKind, EventSink, LoopConfig,
    MetricState, ProbeRecord, RoundStage, TransientRoundFailure,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, info, warn};

pub const BOOT_MESSAGE: &str = "deception endpoint online";
pub const SILENCE_REASON: &str = "archive_unheard";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Running,
    HaltedMaxDepth,
    HaltedSilence,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    MaxDepth,
    ProtectiveSilence,
}

impl HaltReason {
    pub fn as_str(self) -> &'static str {
        match self {
            HaltReason::MaxDepth => "max_depth",
            HaltReason::ProtectiveSilence => "protective_silence",
        }
    }

    fn terminal_state(self) -> LoopState {
        match self {
            HaltReason::MaxDepth => LoopState::HaltedMaxDepth,
            HaltReason::ProtectiveSilence => LoopState::HaltedSilence,
        }
    }
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub port: u16,
    pub probe: ProbeRecord,
    pub modulation: ModulationOutcome,
    pub slept_ms: f64,
}

/// Result of one invocation of the cycle state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Advanced(RoundReport),
    Retried(TransientRoundFailure),
    Halted(HaltReason),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub halt: HaltReason,
    pub depth: u32,
    pub sessions: u64,
    pub failures: u64,
    pub port_epoch: u64,
    pub final_consequence: f64,
    pub final_archive_heard_ratio: f64,
    pub final_entropy: f64,
    pub final_delay_scale: f64,
}

/// The recursive driver, expressed as an explicit loop. Owns all mutable
/// state; nothing here is shared across flows of control.
pub struct DeceptionLoop<K, E, P> {
    config: LoopConfig,
    metrics: MetricState,
    delay: DelayParameters,
    rotator: PortRotator,
    synthesizer: ProbeSynthesizer,
    state: LoopState,
    sink: K,
    entropy: E,
    pacer: P,
    faults: Box<dyn FaultInjector>,
}

impl<K: EventSink, E: EntropySource, P: Pacer> DeceptionLoop<K, E, P> {
    pub fn new(config: LoopConfig, sink: K, entropy: E, pacer: P) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            metrics: MetricState::from_config(&config),
            delay: DelayParameters::from_config(&config),
            rotator: PortRotator::new(&config.ports)?,
            synthesizer: ProbeSynthesizer::new(config.banner.clone()),
            state: LoopState::Running,
            config,
            sink,
            entropy,
            pacer,
            faults: Box::new(NoFaults),
        })
    }

    pub fn with_faults(mut self, faults: impl FaultInjector + 'static) -> Self {
        self.faults = Box::new(faults);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricState {
        &self.metrics
    }

    #[cfg(test)]
    pub(crate) fn metrics_mut(&mut self) -> &mut MetricState {
        &mut self.metrics
    }

    pub fn delay(&self) -> &DelayParameters {
        &self.delay
    }

    pub fn pool(&self) -> Vec<u16> {
        self.rotator.pool()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Emits `boot`, drives the cycle to a halt, emits `shutdown`.
    pub fn run(&mut self) -> RunSummary {
        self.sink.record(
            EventKind::Boot,
            json!({
                "message": BOOT_MESSAGE,
                "max_depth": self.config.max_depth,
                "ports": self.rotator.pool(),
            }),
        );
        info!(
            endpoint = %self.config.endpoint_id,
            max_depth = self.config.max_depth,
            "deception loop starting"
        );

        let halt = self.run_cycle();
        let summary = self.summary(halt);

        self.sink.record(
            EventKind::Shutdown,
            json!({
                "sessions": summary.sessions,
                "failures": summary.failures,
                "final_consequence": round_to(summary.final_consequence, 3),
                "final_archive_heard_ratio": round_to(summary.final_archive_heard_ratio, 3),
            }),
        );
        summary
    }

    pub fn run_cycle(&mut self) -> HaltReason {
        loop {
            if let Transition::Halted(reason) = self.step() {
                return reason;
            }
        }
    }

    pub fn step(&mut self) -> Transition {
        match self.state {
            LoopState::HaltedMaxDepth => return Transition::Halted(HaltReason::MaxDepth),
            LoopState::HaltedSilence => return Transition::Halted(HaltReason::ProtectiveSilence),
            LoopState::Running => {}
        }

        if let Some(reason) = self.check_halt() {
            self.state = reason.terminal_state();
            info!(reason = %reason, depth = self.metrics.depth, "deception loop halted");
            return Transition::Halted(reason);
        }

        match self.execute_round() {
            Ok(report) => {
                self.metrics.complete_round();
                debug!(
                    depth = self.metrics.depth,
                    port = report.port,
                    vector = %report.probe.vector,
                    consequence = report.modulation.consequence_after,
                    slept_ms = report.slept_ms,
                    "round complete"
                );
                Transition::Advanced(report)
            }
            Err(failure) => {
                self.recover(&failure);
                Transition::Retried(failure)
            }
        }
    }

    pub fn summary(&self, halt: HaltReason) -> RunSummary {
        RunSummary {
            halt,
            depth: self.metrics.depth,
            sessions: self.metrics.sessions,
            failures: self.metrics.failures,
            port_epoch: self.metrics.port_epoch,
            final_consequence: self.metrics.consequence,
            final_archive_heard_ratio: self.metrics.archive_heard_ratio,
            final_entropy: self.metrics.entropy,
            final_delay_scale: self.delay.scale,
        }
    }

    // Max depth is checked before silence.
    fn check_halt(&mut self) -> Option<HaltReason> {
        let depth = self.metrics.depth;
        if depth >= self.config.max_depth {
            self.sink.record(
                EventKind::Halt,
                json!({ "reason": HaltReason::MaxDepth.as_str(), "depth": depth }),
            );
            return Some(HaltReason::MaxDepth);
        }

        let unheard = self.metrics.unheard_ratio();
        if unheard >= self.delay.silence_threshold {
            self.sink.record(
                EventKind::ProtectiveSilence,
                json!({
                    "reason": SILENCE_REASON,
                    "unheard_ratio": round_to(unheard, 3),
                    "depth": depth,
                }),
            );
            self.sink.record(
                EventKind::Halt,
                json!({ "reason": HaltReason::ProtectiveSilence.as_str(), "depth": depth }),
            );
            return Some(HaltReason::ProtectiveSilence);
        }
        None
    }

    fn execute_round(&mut self) -> Result<RoundReport, TransientRoundFailure> {
        let depth = self.metrics.depth;

        self.faults.check(RoundStage::Rotate, depth)?;
        let port = self.rotator.rotate(&mut self.metrics, &mut self.sink);

        self.faults.check(RoundStage::Synthesize, depth)?;
        let synthesis =
            self.synthesizer
                .synthesize(port, depth, self.metrics.consequence, &mut self.entropy);
        let probe = synthesis.probe;
        self.sink.record(
            EventKind::HoneypotCapture,
            json!({
                "port": probe.port,
                "depth": probe.depth,
                "vector": probe.vector,
                "amplitude": probe.amplitude,
                "cadence": probe.cadence,
                "banner": probe.banner,
            }),
        );

        self.faults.check(RoundStage::Modulate, depth)?;
        let delta = synthesis.proposed_consequence - self.metrics.consequence;
        let modulation = modulate(
            &mut self.metrics,
            &mut self.delay,
            delta,
            synthesis.heard_delta,
            &mut self.sink,
        );

        let slept_ms = compute_and_wait(
            &self.metrics,
            &self.delay,
            &mut self.entropy,
            &mut self.pacer,
        );
        self.sink.record(
            EventKind::Sleep,
            json!({
                "slept_ms": slept_ms,
                "depth": depth,
                "scale": round_to(self.delay.scale, 3),
            }),
        );

        Ok(RoundReport {
            port,
            probe,
            modulation,
            slept_ms,
        })
    }

    fn recover(&mut self, failure: &TransientRoundFailure) {
        self.metrics.record_failure();
        self.delay.record_failure();
        warn!(
            stage = %failure.stage,
            failures = self.metrics.failures,
            depth = self.metrics.depth,
            error = %failure,
            "round failed, backing off"
        );
        self.sink.record(
            EventKind::Failure,
            json!({
                "error": failure.to_string(),
                "failures": self.metrics.failures,
                "entropy": round_to(self.metrics.entropy, 3),
                "delay_scale": round_to(self.delay.scale, 3),
            }),
        );

        let slept_ms = compute_and_wait(
            &self.metrics,
            &self.delay,
            &mut self.entropy,
            &mut self.pacer,
        );
        self.sink.record(
            EventKind::RetryBackoff,
            json!({ "slept_ms": slept_ms, "depth": self.metrics.depth }),
        );
    }
}
