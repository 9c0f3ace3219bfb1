//! Observable pool events, recorded in order of occurrence.

use accrue_core::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    Deposited {
        staker: Address,
        amount: Amount,
        /// Staker's amount after the deposit
        staked: Amount,
        at: Timestamp,
    },
    Withdrawn {
        staker: Address,
        amount: Amount,
        /// Staker's amount after the withdrawal
        staked: Amount,
        at: Timestamp,
    },
    /// Emitted on every successful collect, including zero payouts
    RewardCollected {
        staker: Address,
        amount: Amount,
        at: Timestamp,
    },
    RewardAdded {
        amount: Amount,
        rate: Amount,
        period_finish: Timestamp,
        at: Timestamp,
    },
}

impl PoolEvent {
    pub fn at(&self) -> Timestamp {
        match self {
            Self::Deposited { at, .. }
            | Self::Withdrawn { at, .. }
            | Self::RewardCollected { at, .. }
            | Self::RewardAdded { at, .. } => *at,
        }
    }
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposited {
                staker,
                amount,
                staked,
                at,
            } => write!(f, "[{at}] Deposited {amount} by {staker} (staked {staked})"),
            Self::Withdrawn {
                staker,
                amount,
                staked,
                at,
            } => write!(f, "[{at}] Withdrawn {amount} by {staker} (staked {staked})"),
            Self::RewardCollected { staker, amount, at } => {
                write!(f, "[{at}] RewardCollected {amount} by {staker}")
            }
            Self::RewardAdded {
                amount,
                rate,
                period_finish,
                at,
            } => write!(
                f,
                "[{at}] RewardAdded {amount} (rate {rate}/s until {period_finish})"
            ),
        }
    }
}
