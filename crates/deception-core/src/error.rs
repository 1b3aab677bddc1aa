use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while loading or validating a [`crate::LoopConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// The step of a round that was executing when a fault surfaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundStage {
    Rotate,
    Synthesize,
    Modulate,
}

impl RoundStage {
    pub const ALL: [RoundStage; 3] = [
        RoundStage::Rotate,
        RoundStage::Synthesize,
        RoundStage::Modulate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoundStage::Rotate => "rotate",
            RoundStage::Synthesize => "synthesize",
            RoundStage::Modulate => "modulate",
        }
    }
}

impl fmt::Display for RoundStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only recoverable error a round can produce. Caught by the cycle
/// controller, which retries the round at the same depth.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("transient round failure during {stage}: {description}")]
pub struct TransientRoundFailure {
    pub stage: RoundStage,
    pub description: String,
}

impl TransientRoundFailure {
    pub fn new(stage: RoundStage, description: impl Into<String>) -> Self {
        Self {
            stage,
            description: description.into(),
        }
    }
}
