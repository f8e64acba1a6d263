// crates/keel-cli/src/config.rs
//
// Runtime configuration for the Keel CLI.
// Loaded from a TOML file or populated with sensible defaults.

use serde::{Deserialize, Serialize};
use std::fs;

/// Scenario and engine parameters. Amounts are in whole tokens; the CLI
/// scales them to wad before touching the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Exit epoch length in blocks.
    #[serde(default = "default_epoch_size")]
    pub epoch_size: u64,

    /// Global redemption cap per epoch, in whole tokens.
    #[serde(default = "default_max_per_epoch")]
    pub max_per_epoch: u64,

    /// Per-address redemption cap per epoch, in whole tokens.
    #[serde(default = "default_max_per_address")]
    pub max_per_address: u64,

    /// Reserve side of the treasury seed, in whole tokens.
    #[serde(default = "default_seed_reserve")]
    pub seed_reserve: u64,

    /// Supply side of the treasury seed, in whole tokens.
    #[serde(default = "default_seed_supply")]
    pub seed_supply: u64,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_epoch_size() -> u64 {
    10
}

fn default_max_per_epoch() -> u64 {
    100
}

fn default_max_per_address() -> u64 {
    100
}

fn default_seed_reserve() -> u64 {
    100
}

fn default_seed_supply() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            epoch_size: default_epoch_size(),
            max_per_epoch: default_max_per_epoch(),
            max_per_address: default_max_per_address(),
            seed_reserve: default_seed_reserve(),
            seed_supply: default_seed_supply(),
            log_level: default_log_level(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.epoch_size, 10);
        assert_eq!(config.seed_supply, 1000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CliConfig = toml::from_str("epoch_size = 20").unwrap();
        assert_eq!(config.epoch_size, 20);
        assert_eq!(config.max_per_epoch, 100);
    }
}
