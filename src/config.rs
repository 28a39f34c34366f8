//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. Trader-specific
//! parameters stay an opaque JSON value here; each trader parses its own
//! section.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::UserId;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_trader_name")]
    pub trader_name: String,
    /// Trader-specific parameters, parsed by the selected trader
    #[serde(default)]
    pub trader: serde_json::Value,
}

fn default_trader_name() -> String {
    "noop".to_string()
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            simulation: SimulationConfig::default(),
            trader_name: default_trader_name(),
            trader: serde_json::json!({}),
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Directory with recorded market files
    pub data_dir: String,
    /// Exchange commission charged on winnings
    pub commission: f64,
    /// User id that owns the synthesized order flow
    pub synth_user_id: UserId,
    /// User id assigned to the trader under test
    pub trader_user_id: UserId,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            data_dir: "marketdata".to_string(),
            commission: 0.05,
            synth_user_id: 1,
            trader_user_id: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.trader_name, "noop");
        assert_eq!(config.simulation.data_dir, "marketdata");
        assert_eq!(config.simulation.synth_user_id, 1);
        assert_eq!(config.simulation.trader_user_id, 100);
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{
            "simulation": { "commission": 0.02 },
            "trader_name": "value_backer",
            "trader": { "stake": 5.0 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.trader_name, "value_backer");
        assert_eq!(config.simulation.commission, 0.02);
        // untouched sections keep their defaults
        assert_eq!(config.simulation.data_dir, "marketdata");
        assert_eq!(config.trader["stake"], 5.0);
    }
}
