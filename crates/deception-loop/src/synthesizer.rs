use deception_core::{
    clamp_unit, round_to, Cadence, EntropySource, ProbeRecord, ProbeVector,
};

pub const BASE_PROBE_WEIGHT: f64 = 0.05;
pub const AMPLITUDE_WEIGHT: f64 = 0.1;
pub const HEARD_COUPLING: f64 = 0.6;

/// Consequence shift implied by a probe. Zero unless the vector is ego or memory.
pub fn consequence_delta(vector: ProbeVector, amplitude: f64) -> f64 {
    vector.consequence_sign() * (BASE_PROBE_WEIGHT + amplitude * AMPLITUDE_WEIGHT)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSynthesis {
    pub probe: ProbeRecord,
    /// Consequence after applying the probe's delta, clamped to [0,1].
    pub proposed_consequence: f64,
    /// Unclamped; the modulator clamps the ratio.
    pub heard_delta: f64,
}

#[derive(Debug, Clone)]
pub struct ProbeSynthesizer {
    banner: String,
}

impl ProbeSynthesizer {
    pub fn new(banner: impl Into<String>) -> Self {
        Self {
            banner: banner.into(),
        }
    }

    pub fn banner(&self) -> &str {
        &self.banner
    }

    /// Draws vector, amplitude and cadence, in that order.
    pub fn synthesize(
        &self,
        port: u16,
        depth: u32,
        consequence: f64,
        entropy: &mut impl EntropySource,
    ) -> ProbeSynthesis {
        let vector = ProbeVector::ALL[entropy.pick(ProbeVector::ALL.len())];
        let amplitude = round_to(entropy.unit(), 3);
        let cadence = Cadence::ALL[entropy.pick(Cadence::ALL.len())];
        self.assess(port, depth, consequence, vector, amplitude, cadence)
    }

    /// The deterministic half of synthesis, for already-drawn parameters.
    pub fn assess(
        &self,
        port: u16,
        depth: u32,
        consequence: f64,
        vector: ProbeVector,
        amplitude: f64,
        cadence: Cadence,
    ) -> ProbeSynthesis {
        let delta = consequence_delta(vector, amplitude);
        ProbeSynthesis {
            probe: ProbeRecord {
                banner: self.banner.clone(),
                port,
                depth,
                vector,
                amplitude,
                cadence,
            },
            proposed_consequence: clamp_unit(consequence + delta),
            heard_delta: -delta * HEARD_COUPLING,
        }
    }
}
