//! Per-staker accounting.
//!
//! A position remembers the accumulator value it was last settled against.
//! Bringing it current credits `(acc_now − acc_then) × amount / SCALE` to
//! `accrued_rewards`, which is all the history a staker ever needs.

use crate::accumulator::Accumulator;
use accrue_core::prelude::*;
use serde::{Deserialize, Serialize};

/// One staker's record in a pool
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerPosition {
    /// Staking units deposited and not withdrawn
    pub amount: Amount,
    /// Settled rewards not yet collected
    pub accrued_rewards: Amount,
    /// Accumulator value at the last settlement
    pub last_cumulative_reward_per_share: U256,
    /// Time of the last settlement
    pub last_update: Timestamp,
}

impl StakerPosition {
    /// The position settled against `acc`
    pub fn settled(&self, acc: &Accumulator, scale: FixedPointScale) -> Result<Self> {
        let delta = acc
            .cumulative_reward_per_share
            .checked_sub(self.last_cumulative_reward_per_share)
            .ok_or(AccrualError::MathOverflow)?;
        let owed = scale.settle_owed(delta, self.amount)?;

        Ok(Self {
            amount: self.amount,
            accrued_rewards: self
                .accrued_rewards
                .checked_add(owed)
                .ok_or(AccrualError::MathOverflow)?,
            last_cumulative_reward_per_share: acc.cumulative_reward_per_share,
            last_update: acc.last_update,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.accrued_rewards == 0
    }
}
