//! Pool configuration types

use crate::pool::{PoolAccounts, RewardPool, StakingPool};
use crate::schedule::{DurationSchedule, FixedWindow, DEFAULT_REWARDS_DURATION};
use accrue_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] AccrualError),
}

/// Complete pool configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Exponent of the accumulator scale; defaults per schedule variant
    #[serde(default)]
    pub scale_bits: Option<u32>,

    /// Emission schedule
    pub schedule: ScheduleConfig,
}

/// Emission schedule selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScheduleConfig {
    /// Distributor-funded, amortized over `rewards_duration` seconds
    Duration {
        #[serde(default = "default_rewards_duration")]
        rewards_duration: u64,
    },

    /// Constant `rate_per_second` between `start` and `finish`
    FixedWindow {
        #[serde(with = "accrue_core::serde_amount")]
        rate_per_second: Amount,
        start: Timestamp,
        finish: Timestamp,
    },
}

fn default_rewards_duration() -> u64 {
    DEFAULT_REWARDS_DURATION
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::Duration {
            rewards_duration: default_rewards_duration(),
        }
    }
}

impl PoolConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.scale()?;
        match self.schedule {
            ScheduleConfig::Duration { rewards_duration } if rewards_duration == 0 => {
                Err(AccrualError::InvalidDuration.into())
            }
            ScheduleConfig::FixedWindow { start, finish, .. } if finish < start => {
                Err(AccrualError::InvalidWindow { start, finish }.into())
            }
            _ => Ok(()),
        }
    }

    /// Configured scale, or the variant default (Q128 duration, Q96 fixed window)
    pub fn scale(&self) -> Result<FixedPointScale> {
        match (self.scale_bits, &self.schedule) {
            (Some(bits), _) => FixedPointScale::new(bits),
            (None, ScheduleConfig::Duration { .. }) => Ok(FixedPointScale::Q128),
            (None, ScheduleConfig::FixedWindow { .. }) => Ok(FixedPointScale::Q96),
        }
    }

    /// Instantiate the configured pool. `distributor` gates funding of the
    /// duration variant and is ignored by the fixed window.
    pub fn build(
        &self,
        accounts: PoolAccounts,
        distributor: Arc<dyn AccessControl>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<ConfiguredPool> {
        let scale = self.scale()?;
        let pool = match self.schedule {
            ScheduleConfig::Duration { rewards_duration } => {
                let schedule = DurationSchedule::new(rewards_duration, distributor)?;
                ConfiguredPool::Duration(RewardPool::new(accounts, schedule, scale, ledger, clock))
            }
            ScheduleConfig::FixedWindow {
                rate_per_second,
                start,
                finish,
            } => {
                let schedule = FixedWindow::new(rate_per_second, start, finish)?;
                ConfiguredPool::FixedWindow(RewardPool::new(accounts, schedule, scale, ledger, clock))
            }
        };
        Ok(pool)
    }
}

/// A pool of whichever variant the configuration selected
pub enum ConfiguredPool {
    Duration(RewardPool<DurationSchedule>),
    FixedWindow(RewardPool<FixedWindow>),
}

impl ConfiguredPool {
    pub fn staking(&self) -> &dyn StakingPool {
        match self {
            Self::Duration(pool) => pool,
            Self::FixedWindow(pool) => pool,
        }
    }

    pub fn staking_mut(&mut self) -> &mut dyn StakingPool {
        match self {
            Self::Duration(pool) => pool,
            Self::FixedWindow(pool) => pool,
        }
    }

    /// Fund the duration variant. A fixed window accepts no funding calls.
    pub fn notify_reward_amount(&mut self, caller: Address, amount: Amount) -> Result<Amount> {
        match self {
            Self::Duration(pool) => pool.notify_reward_amount(caller, amount),
            Self::FixedWindow(_) => Err(AccrualError::Unauthorized(caller)),
        }
    }
}
