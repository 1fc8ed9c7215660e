use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};

/// Engine tuning shared by every component of a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Rounds a wire delays by when it has no per-wire override.
    pub default_wire_delay: u64,
    /// Fixed-point passes allowed per round before the round is flagged unstable.
    pub max_iterations: usize,
    /// Seed of the circuit's random generator.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            default_wire_delay: 0,
            max_iterations: 100,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &str) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_wire_delay(mut self, delay: u64) -> Self {
        self.default_wire_delay = delay;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{"default_wire_delay": 3}"#).unwrap();
        assert_eq!(config.default_wire_delay, 3);
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn test_builders() {
        let config = SimConfig::default().with_seed(9).with_max_iterations(0);
        assert_eq!(config.seed, 9);
        assert_eq!(config.max_iterations, 1);
    }
}
