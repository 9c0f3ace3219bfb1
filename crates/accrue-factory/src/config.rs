//! Factory configuration types

use accrue_core::{AccrualError, FixedPointScale, Timestamp};
use accrue_pool::{ConfigError, DEFAULT_REWARDS_DURATION};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Earliest time batched funding may run
    pub genesis: Timestamp,

    /// Amortization period of every deployed pool, in seconds
    #[serde(default = "default_rewards_duration")]
    pub rewards_duration: u64,

    /// Accumulator scale exponent of every deployed pool
    #[serde(default = "default_scale_bits")]
    pub scale_bits: u32,
}

fn default_rewards_duration() -> u64 {
    DEFAULT_REWARDS_DURATION
}

fn default_scale_bits() -> u32 {
    FixedPointScale::Q128.bits()
}

impl FactoryConfig {
    pub fn new(genesis: Timestamp) -> Self {
        Self {
            genesis,
            rewards_duration: default_rewards_duration(),
            scale_bits: default_scale_bits(),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), AccrualError> {
        if self.rewards_duration == 0 {
            return Err(AccrualError::InvalidDuration);
        }
        self.scale()?;
        Ok(())
    }

    pub fn scale(&self) -> Result<FixedPointScale, AccrualError> {
        FixedPointScale::new(self.scale_bits)
    }
}
