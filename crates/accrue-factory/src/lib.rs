//! # Accrue Factory
//!
//! Deploys one reward pool per staking token and arms all of them together:
//! nothing emits until `notify_reward_amounts` succeeds after genesis, and
//! that call either funds every pool or none.

pub mod config;
pub mod error;
pub mod factory;

pub use config::FactoryConfig;
pub use error::{FactoryError, Result};
pub use factory::{DeployedPool, FactoryEvent, PoolFactory, PoolHandle};
