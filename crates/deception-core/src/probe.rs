use serde::{Deserialize, Serialize};
use std::fmt;

/// Attack vector a synthetic probe claims to exercise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProbeVector {
    Mirror,
    Memory,
    Ego,
    Archive,
    Static,
}

impl ProbeVector {
    pub const ALL: [ProbeVector; 5] = [
        ProbeVector::Mirror,
        ProbeVector::Memory,
        ProbeVector::Ego,
        ProbeVector::Archive,
        ProbeVector::Static,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProbeVector::Mirror => "mirror",
            ProbeVector::Memory => "memory",
            ProbeVector::Ego => "ego",
            ProbeVector::Archive => "archive",
            ProbeVector::Static => "static",
        }
    }

    /// +1 for ego, -1 for memory, 0 for everything else.
    pub fn consequence_sign(self) -> f64 {
        let is_ego = if self == ProbeVector::Ego { 1.0 } else { 0.0 };
        let is_memory = if self == ProbeVector::Memory { 1.0 } else { 0.0 };
        is_ego - is_memory
    }
}

impl fmt::Display for ProbeVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Rapid,
    Staggered,
    Flat,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Rapid, Cadence::Staggered, Cadence::Flat];

    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Rapid => "rapid",
            Cadence::Staggered => "staggered",
            Cadence::Flat => "flat",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesized inbound probe. Lives for a single round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeRecord {
    pub banner: String,
    pub port: u16,
    pub depth: u32,
    pub vector: ProbeVector,
    /// Uniform in [0,1], three decimals.
    pub amplitude: f64,
    pub cadence: Cadence,
}
