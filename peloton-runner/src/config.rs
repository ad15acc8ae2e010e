//! Pool configuration: team rules, solver limits and price-list format.
//!
//! ```toml
//! [team]
//! size = 15
//! budget = 100
//!
//! [solver]
//! time_limit_ms = 10000   # 0 disables the limit
//! node_limit = 50000000   # 0 disables the limit
//!
//! [prices]
//! delimiter = ";"
//! ```
//!
//! Every table and key is optional; missing values take the defaults above.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::candidate::DEFAULT_DELIMITER;
use crate::optimizer::SolverLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Number of riders in a team.
    pub size: usize,
    /// Maximum summed price of a team.
    pub budget: f64,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            size: 15,
            budget: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub time_limit_ms: u64,
    pub node_limit: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 10_000,
            node_limit: 50_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub delimiter: char,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER as char,
        }
    }
}

/// Everything a pool run needs besides its inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub team: TeamConfig,
    pub solver: SolverConfig,
    pub prices: PriceConfig,
}

impl PoolConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.delimiter()?;
        Ok(config)
    }

    pub fn limits(&self) -> SolverLimits {
        let nonzero = |v: u64| (v > 0).then_some(v);
        SolverLimits {
            time_limit: nonzero(self.solver.time_limit_ms).map(Duration::from_millis),
            node_limit: nonzero(self.solver.node_limit),
        }
    }

    /// Price-list delimiter as a byte.
    pub fn delimiter(&self) -> Result<u8, ConfigError> {
        let c = self.prices.delimiter;
        u8::try_from(c)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConfigError::InvalidDelimiter(c))
    }
}
