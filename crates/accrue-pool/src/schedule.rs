//! # Emission Schedules
//!
//! A schedule decides the rate and bounds of emission. The accumulator never
//! looks past the [`EmissionWindow`] a schedule reports.
//!
//! Two variants:
//!
//! - [`DurationSchedule`] - the distributor notifies an amount which is
//!   amortized over a fixed duration starting now. Notifying before the
//!   current period ends rolls the unemitted remainder into the new period.
//! - [`FixedWindow`] - a constant rate between two timestamps set at
//!   construction. Nothing can change it afterwards.

use crate::accumulator::EmissionWindow;
use accrue_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Source of the emission window used by settlement
pub trait EmissionSchedule: Send + Sync {
    /// Current rate and bounds
    fn window(&self) -> EmissionWindow;

    /// Short variant name used in logs and snapshots
    fn kind(&self) -> ScheduleKind;

    /// Reward emitted over one full period at the current rate
    fn reward_for_duration(&self) -> Result<Amount> {
        self.window().total_emission()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleKind {
    Duration,
    FixedWindow,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duration => write!(f, "duration"),
            Self::FixedWindow => write!(f, "fixed-window"),
        }
    }
}

/// 60 days
pub const DEFAULT_REWARDS_DURATION: u64 = 60 * 24 * 60 * 60;

/// Duration-amortized emission funded by an authorized distributor
#[derive(Clone)]
pub struct DurationSchedule {
    rewards_duration: u64,
    rate: Amount,
    period_start: Timestamp,
    period_finish: Timestamp,
    distributor: Arc<dyn AccessControl>,
}

impl DurationSchedule {
    /// Unfunded schedule amortizing each notification over `rewards_duration` seconds
    pub fn new(rewards_duration: u64, distributor: Arc<dyn AccessControl>) -> Result<Self> {
        if rewards_duration == 0 {
            return Err(AccrualError::InvalidDuration);
        }
        Ok(Self {
            rewards_duration,
            rate: 0,
            period_start: 0,
            period_finish: 0,
            distributor,
        })
    }

    pub fn rewards_duration(&self) -> u64 {
        self.rewards_duration
    }

    /// Whether `caller` may notify rewards
    pub fn is_distributor(&self, caller: &Address) -> bool {
        self.distributor.is_authorized(caller)
    }

    /// Reward that would still be emitted after `now` at the current rate
    pub fn remaining(&self, now: Timestamp) -> Result<Amount> {
        if now >= self.period_finish {
            return Ok(0);
        }
        self.rate
            .checked_mul(Amount::from(self.period_finish - now))
            .ok_or(AccrualError::MathOverflow)
    }

    /// The schedule after notifying `amount` at `now`.
    ///
    /// `available` is the reward balance the pool holds beyond what it already
    /// owes stakers. The new period must be fully covered by it.
    pub fn notified(&self, amount: Amount, now: Timestamp, available: Amount) -> Result<Self> {
        let total = amount
            .checked_add(self.remaining(now)?)
            .ok_or(AccrualError::MathOverflow)?;
        let duration = Amount::from(self.rewards_duration);
        let rate = total / duration;
        let required = rate
            .checked_mul(duration)
            .ok_or(AccrualError::MathOverflow)?;
        if required > available {
            return Err(AccrualError::InsufficientRewardBalance {
                required,
                available,
            });
        }
        let period_finish = now
            .checked_add(self.rewards_duration)
            .ok_or(AccrualError::MathOverflow)?;

        Ok(Self {
            rate,
            period_start: now,
            period_finish,
            ..self.clone()
        })
    }
}

impl EmissionSchedule for DurationSchedule {
    fn window(&self) -> EmissionWindow {
        EmissionWindow {
            rate: self.rate,
            start: self.period_start,
            finish: self.period_finish,
        }
    }

    fn kind(&self) -> ScheduleKind {
        ScheduleKind::Duration
    }
}

impl fmt::Debug for DurationSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurationSchedule")
            .field("rewards_duration", &self.rewards_duration)
            .field("rate", &self.rate)
            .field("period_start", &self.period_start)
            .field("period_finish", &self.period_finish)
            .finish_non_exhaustive()
    }
}

/// Constant rate over a window fixed at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWindow {
    window: EmissionWindow,
}

impl FixedWindow {
    pub fn new(rate: Amount, start: Timestamp, finish: Timestamp) -> Result<Self> {
        if finish < start {
            return Err(AccrualError::InvalidWindow { start, finish });
        }
        let window = EmissionWindow {
            rate,
            start,
            finish,
        };
        window.total_emission()?;
        Ok(Self { window })
    }
}

impl EmissionSchedule for FixedWindow {
    fn window(&self) -> EmissionWindow {
        self.window
    }

    fn kind(&self) -> ScheduleKind {
        ScheduleKind::FixedWindow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn schedule(duration: u64) -> DurationSchedule {
        DurationSchedule::new(duration, Arc::new(SingleOwner(Address::from_label("owner")))).unwrap()
    }

    #[test]
    fn test_zero_duration_rejected() {
        let result = DurationSchedule::new(0, Arc::new(SingleOwner(Address::ZERO)));
        assert!(matches!(result, Err(AccrualError::InvalidDuration)));
    }

    #[test]
    fn test_first_notify_amortizes() {
        let s = schedule(DAY).notified(86_400_000, 1_000, 86_400_000).unwrap();

        assert_eq!(
            s.window(),
            EmissionWindow {
                rate: 1_000,
                start: 1_000,
                finish: 1_000 + DAY
            }
        );
        assert_eq!(s.reward_for_duration().unwrap(), 86_400_000);
    }

    #[test]
    fn test_rate_truncates() {
        let s = schedule(DEFAULT_REWARDS_DURATION)
            .notified(10, 0, 10)
            .unwrap();

        assert_eq!(s.window().rate, 0);
        assert_eq!(s.window().finish, DEFAULT_REWARDS_DURATION);
    }

    #[test]
    fn test_top_up_rolls_remainder() {
        let first = schedule(100).notified(10_000, 0, 10_000).unwrap();

        // halfway: 5_000 still to be emitted
        let second = first.notified(10_000, 50, 15_000).unwrap();

        assert_eq!(second.window().rate, 150);
        assert_eq!(second.window().start, 50);
        assert_eq!(second.window().finish, 150);
    }

    #[test]
    fn test_after_expiry_remainder_is_zero() {
        let first = schedule(100).notified(10_000, 0, 10_000).unwrap();

        assert_eq!(first.remaining(100).unwrap(), 0);
        assert_eq!(first.remaining(250).unwrap(), 0);

        let second = first.notified(2_000, 250, 2_000).unwrap();
        assert_eq!(second.window().rate, 20);
    }

    #[test]
    fn test_underfunded_notify_rejected() {
        let err = schedule(100).notified(10_000, 0, 9_999).unwrap_err();

        assert_eq!(
            err,
            AccrualError::InsufficientRewardBalance {
                required: 10_000,
                available: 9_999
            }
        );
    }

    #[test]
    fn test_distributor_check() {
        let s = schedule(100);
        assert!(s.is_distributor(&Address::from_label("owner")));
        assert!(!s.is_distributor(&Address::from_label("staker")));
    }

    #[test]
    fn test_fixed_window_validation() {
        assert!(FixedWindow::new(100, 3_600, 7_200).is_ok());
        assert!(FixedWindow::new(100, 7_200, 7_200).is_ok());
        assert_eq!(
            FixedWindow::new(100, 7_200, 3_600).unwrap_err(),
            AccrualError::InvalidWindow {
                start: 7_200,
                finish: 3_600
            }
        );
    }

    #[test]
    fn test_fixed_window_reward_for_duration() {
        let s = FixedWindow::new(100, 3_600, 7_200).unwrap();
        assert_eq!(s.reward_for_duration().unwrap(), 360_000);
        assert_eq!(s.kind(), ScheduleKind::FixedWindow);
    }
}
