//! # Global Settlement
//!
//! The pool-wide accumulator: a non-decreasing, fixed-point "reward per
//! unit staked since genesis". Settlement folds the time elapsed since the
//! last update into it, without touching any individual staker.
//!
//! ```text
//! from      = max(last_update, window.start)
//! to        = min(now, window.finish)
//! Δacc      = rate × (to − from) × SCALE / total_staked      (if to > from)
//! last_update ← to
//! ```
//!
//! Settlement is a pure function of (accumulator, window, now): it returns
//! a new value and leaves `self` untouched, so callers commit only once the
//! whole operation has succeeded.

use accrue_core::prelude::*;
use serde::{Deserialize, Serialize};

/// Emission parameters in force for one settlement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionWindow {
    /// Reward units per second
    pub rate: Amount,
    /// Emission begins
    pub start: Timestamp,
    /// Emission ends
    pub finish: Timestamp,
}

impl EmissionWindow {
    /// No emission at all
    pub const CLOSED: Self = Self {
        rate: 0,
        start: 0,
        finish: 0,
    };

    /// `min(now, finish)`
    pub fn effective_now(&self, now: Timestamp) -> Timestamp {
        now.min(self.finish)
    }

    /// Total reward the window emits if stake is present throughout
    pub fn total_emission(&self) -> Result<Amount> {
        self.rate
            .checked_mul(Amount::from(self.finish.saturating_sub(self.start)))
            .ok_or(AccrualError::MathOverflow)
    }
}

/// Pool-wide accrual state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    /// Sum of every staker's amount
    pub total_staked: Amount,
    /// Reward per unit staked since genesis, scaled
    pub cumulative_reward_per_share: U256,
    /// Time through which the accumulator is settled
    pub last_update: Timestamp,
    /// Reward units folded into the accumulator while stake was present
    pub total_emitted: Amount,
}

impl Accumulator {
    /// Fresh accumulator settled through `genesis`
    pub fn new(genesis: Timestamp) -> Self {
        Self {
            total_staked: 0,
            cumulative_reward_per_share: U256::zero(),
            last_update: genesis,
            total_emitted: 0,
        }
    }

    /// The accumulator settled through `now` under `window`
    pub fn settled(
        &self,
        window: &EmissionWindow,
        now: Timestamp,
        scale: FixedPointScale,
    ) -> Result<Self> {
        if now < self.last_update {
            return Err(AccrualError::ClockRegression {
                last: self.last_update,
                now,
            });
        }

        let mut next = self.clone();
        let effective_now = window.effective_now(now);
        if effective_now <= self.last_update {
            return Ok(next);
        }

        let from = self.last_update.max(window.start);
        if effective_now > from && self.total_staked > 0 {
            let elapsed = effective_now - from;
            let delta = scale.accrue_delta(window.rate, elapsed, self.total_staked)?;
            next.cumulative_reward_per_share = next
                .cumulative_reward_per_share
                .checked_add(delta)
                .ok_or(AccrualError::MathOverflow)?;
            let emitted = window
                .rate
                .checked_mul(Amount::from(elapsed))
                .ok_or(AccrualError::MathOverflow)?;
            next.total_emitted = next
                .total_emitted
                .checked_add(emitted)
                .ok_or(AccrualError::MathOverflow)?;

            tracing::debug!(
                from,
                to = effective_now,
                rate = %window.rate,
                total_staked = %self.total_staked,
                delta = %delta,
                "accumulator advanced"
            );
        }

        next.last_update = effective_now;
        Ok(next)
    }

    /// Reward units promised to stakers and not yet paid
    pub fn outstanding(&self, total_paid: Amount) -> Amount {
        self.total_emitted.saturating_sub(total_paid)
    }
}
