use deception_core::{ConfigError, RoundStage, TransientRoundFailure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Hook consulted before each stage of a round. An `Err` aborts the round
/// at that stage; effects of earlier stages stay applied.
pub trait FaultInjector {
    fn check(&mut self, stage: RoundStage, depth: u32) -> Result<(), TransientRoundFailure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultInjector for NoFaults {
    fn check(&mut self, _stage: RoundStage, _depth: u32) -> Result<(), TransientRoundFailure> {
        Ok(())
    }
}

/// Fails the listed round attempts (1-based, counting retries) at one stage.
#[derive(Debug, Clone)]
pub struct ScriptedFaults {
    failing_attempts: BTreeSet<u64>,
    stage: RoundStage,
    attempt: u64,
}

impl ScriptedFaults {
    pub fn new(stage: RoundStage, failing_attempts: impl IntoIterator<Item = u64>) -> Self {
        Self {
            failing_attempts: failing_attempts.into_iter().collect(),
            stage,
            attempt: 0,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.attempt
    }
}

impl FaultInjector for ScriptedFaults {
    fn check(&mut self, stage: RoundStage, depth: u32) -> Result<(), TransientRoundFailure> {
        if stage == RoundStage::Rotate {
            self.attempt += 1;
        }
        if stage == self.stage && self.failing_attempts.contains(&self.attempt) {
            return Err(TransientRoundFailure::new(
                stage,
                format!("scripted fault on attempt {} at depth {depth}", self.attempt),
            ));
        }
        Ok(())
    }
}

/// Simulates flaky inbound connections: each round attempt fails with
/// `probability`, at a stage chosen uniformly.
#[derive(Debug, Clone)]
pub struct RandomFaults {
    probability: f64,
    rng: StdRng,
    armed: Option<RoundStage>,
}

impl RandomFaults {
    pub fn new(probability: f64, seed: u64) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&probability) {
            return Err(ConfigError::invalid(
                "fault_probability",
                format!("expected a value in [0, 1), got {probability}"),
            ));
        }
        Ok(Self {
            probability,
            rng: StdRng::seed_from_u64(seed),
            armed: None,
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl FaultInjector for RandomFaults {
    fn check(&mut self, stage: RoundStage, depth: u32) -> Result<(), TransientRoundFailure> {
        if stage == RoundStage::Rotate {
            self.armed = if self.rng.gen::<f64>() < self.probability {
                Some(RoundStage::ALL[self.rng.gen_range(0..RoundStage::ALL.len())])
            } else {
                None
            };
        }
        if self.armed == Some(stage) {
            self.armed = None;
            return Err(TransientRoundFailure::new(
                stage,
                format!("simulated connection reset by peer at depth {depth}"),
            ));
        }
        Ok(())
    }
}
