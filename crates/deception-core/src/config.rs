use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const REFERENCE_PORTS: [u16; 6] = [2222, 8080, 443, 31337, 5000, 7001];
pub const REFERENCE_BANNER: &str = "SSH-2.0-OpenSSH_8.4p1 Debian-5+deb11u1";

/// Constants fixed at process start. Every field has a reference default so
/// a partial JSON file is enough to override a single value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoopConfig {
    pub endpoint_id: String,
    pub ports: Vec<u16>,
    pub banner: String,
    pub max_depth: u32,
    pub base_ms: f64,
    pub jitter_ms: f64,
    pub silence_threshold: f64,
    pub initial_consequence: f64,
    pub initial_archive_heard_ratio: f64,
    pub initial_entropy: f64,
}

impl LoopConfig {
    pub fn default_reference() -> Self {
        Self {
            endpoint_id: "deception-endpoint".into(),
            ports: REFERENCE_PORTS.to_vec(),
            banner: REFERENCE_BANNER.into(),
            max_depth: 64,
            base_ms: 120.0,
            jitter_ms: 250.0,
            silence_threshold: 0.85,
            initial_consequence: 0.10,
            initial_archive_heard_ratio: 0.50,
            initial_entropy: 0.15,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let cfg = serde_json::from_reader(BufReader::new(file))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ports.is_empty() {
            return Err(ConfigError::invalid("ports", "port pool is empty"));
        }
        let unique: BTreeSet<_> = self.ports.iter().collect();
        if unique.len() != self.ports.len() {
            return Err(ConfigError::invalid("ports", "port pool contains duplicates"));
        }

        non_negative("base_ms", self.base_ms)?;
        non_negative("jitter_ms", self.jitter_ms)?;

        unit_interval("silence_threshold", self.silence_threshold)?;
        unit_interval("initial_consequence", self.initial_consequence)?;
        unit_interval(
            "initial_archive_heard_ratio",
            self.initial_archive_heard_ratio,
        )?;
        unit_interval("initial_entropy", self.initial_entropy)?;
        Ok(())
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::default_reference()
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("expected a finite non-negative value, got {value}"),
        ));
    }
    Ok(())
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("expected a value in [0, 1], got {value}"),
        ));
    }
    Ok(())
}
