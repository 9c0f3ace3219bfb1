//! # Accrue Pool
//!
//! Lazy reward accrual for a single staking pool. No per-staker work happens
//! as time passes; instead a global accumulator records reward per staked
//! unit and each staker is settled against it when they next interact.
//!
//! ## Components
//!
//! - **Accumulator**: global settlement over the emission window
//! - **StakerPosition**: per-staker settlement
//! - **EmissionSchedule**: `DurationSchedule` (notify + top-ups) or `FixedWindow`
//! - **RewardPool**: deposit / withdraw / collect / exit and the funding entry point
//!
//! ## Settlement
//!
//! ```text
//! now ──► Accumulator::settled ──► StakerPosition::settled ──► apply ──► commit
//!              (global)                 (caller)             (ledger)
//! ```

pub mod accumulator;
pub mod config;
pub mod events;
pub mod pool;
pub mod position;
pub mod schedule;

pub use accumulator::{Accumulator, EmissionWindow};
pub use config::{ConfigError, ConfiguredPool, PoolConfig, ScheduleConfig};
pub use events::PoolEvent;
pub use pool::{ExitReceipt, NotifyPlan, PoolAccounts, PoolSnapshot, RewardPool, StakingPool};
pub use position::StakerPosition;
pub use schedule::{
    DurationSchedule, EmissionSchedule, FixedWindow, ScheduleKind, DEFAULT_REWARDS_DURATION,
};
