//! # Pool Factory
//!
//! Deploys one duration-scheduled [`RewardPool`] per staking token and funds
//! all of them in a single batch once genesis has passed.
//!
//! ```text
//! deploy(lp-a, 10) ─┐
//! deploy(lp-b, 10) ─┼─► registry (deployment order)
//! deploy(lp-c, 10) ─┘          │
//!                              ▼  now ≥ genesis, once
//!                   notify_reward_amounts()
//!                   ├─ lock every pool
//!                   ├─ validate: balance ≥ Σ amounts, each pool accepts its notify
//!                   ├─ transfer factory → pool (rolled back on failure)
//!                   └─ notify each pool with the factory as distributor
//! ```

use crate::config::FactoryConfig;
use crate::error::{FactoryError, Result};
use accrue_core::prelude::*;
use accrue_pool::{DurationSchedule, NotifyPlan, PoolAccounts, RewardPool};
use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared handle to a deployed pool
pub type PoolHandle = Arc<Mutex<RewardPool<DurationSchedule>>>;

/// Registry entry for one staking token
#[derive(Clone)]
pub struct DeployedPool {
    pub pool: PoolHandle,
    pub address: Address,
    pub reward_amount: Amount,
}

/// Factory lifecycle events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FactoryEvent {
    PoolDeployed {
        staking_token: TokenId,
        pool: Address,
        reward_amount: Amount,
    },
    RewardsNotified {
        pools: usize,
        total: Amount,
        at: Timestamp,
    },
}

impl fmt::Display for FactoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolDeployed {
                staking_token,
                pool,
                reward_amount,
            } => write!(f, "PoolDeployed {pool} for {staking_token} (reward {reward_amount})"),
            Self::RewardsNotified { pools, total, at } => {
                write!(f, "[{at}] RewardsNotified {total} across {pools} pools")
            }
        }
    }
}

pub struct PoolFactory {
    address: Address,
    reward_token: TokenId,
    config: FactoryConfig,
    scale: FixedPointScale,
    pools: IndexMap<TokenId, DeployedPool>,
    notified: bool,
    events: Vec<FactoryEvent>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    owner: Arc<dyn AccessControl>,
}

impl PoolFactory {
    /// Create a factory paying `reward_token` from its own `address`.
    /// `owner` gates deployment.
    pub fn new(
        address: Address,
        reward_token: TokenId,
        config: FactoryConfig,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        owner: Arc<dyn AccessControl>,
    ) -> Result<Self> {
        config.validate()?;
        let scale = config.scale()?;
        Ok(Self {
            address,
            reward_token,
            config,
            scale,
            pools: IndexMap::new(),
            notified: false,
            events: Vec::new(),
            ledger,
            clock,
            owner,
        })
    }

    /// Deploy a pool for `staking_token` that will receive `reward_amount`
    /// when rewards are notified.
    pub fn deploy(
        &mut self,
        caller: Address,
        staking_token: TokenId,
        reward_amount: Amount,
    ) -> Result<PoolHandle> {
        if !self.owner.is_authorized(&caller) {
            warn!(factory = %self.address, %caller, "unauthorized deploy");
            return Err(FactoryError::Unauthorized(caller));
        }
        if self.notified {
            warn!(factory = %self.address, %staking_token, "deploy after rewards were notified");
            return Err(FactoryError::AlreadyNotified);
        }
        if self.pools.contains_key(&staking_token) {
            return Err(FactoryError::AlreadyDeployed(staking_token));
        }
        if reward_amount == 0 {
            return Err(FactoryError::InvalidAmount);
        }

        let address = Address::derive_pool(&self.address, &staking_token);
        let schedule = DurationSchedule::new(
            self.config.rewards_duration,
            Arc::new(SingleOwner(self.address)),
        )?;
        let pool = RewardPool::new(
            PoolAccounts {
                address,
                staking_token,
                reward_token: self.reward_token,
            },
            schedule,
            self.scale,
            self.ledger.clone(),
            self.clock.clone(),
        );
        let handle: PoolHandle = Arc::new(Mutex::new(pool));

        self.pools.insert(
            staking_token,
            DeployedPool {
                pool: handle.clone(),
                address,
                reward_amount,
            },
        );
        self.events.push(FactoryEvent::PoolDeployed {
            staking_token,
            pool: address,
            reward_amount,
        });
        info!(
            factory = %self.address,
            %staking_token,
            pool = %address,
            reward_amount = %reward_amount,
            "pool deployed"
        );
        Ok(handle)
    }

    /// Fund every deployed pool with its registered amount and start its
    /// emission period. Runs once, after genesis, for the whole batch or not at all.
    pub fn notify_reward_amounts(&mut self) -> Result<Amount> {
        if self.notified {
            return Err(FactoryError::AlreadyNotified);
        }
        let now = self.clock.now();
        if now < self.config.genesis {
            return Err(FactoryError::NotReady {
                genesis: self.config.genesis,
                now,
            });
        }
        if self.pools.is_empty() {
            return Err(FactoryError::NoPoolsDeployed);
        }

        let total = self
            .pools
            .values()
            .try_fold(0 as Amount, |sum, entry| sum.checked_add(entry.reward_amount))
            .ok_or(AccrualError::MathOverflow)?;
        let available = self.ledger.balance_of(&self.reward_token, &self.address);
        if available < total {
            warn!(
                factory = %self.address,
                required = %total,
                available = %available,
                "factory cannot fund the batch"
            );
            return Err(AccrualError::InsufficientRewardBalance {
                required: total,
                available,
            }
            .into());
        }

        let mut guards: Vec<(&DeployedPool, MutexGuard<'_, RewardPool<DurationSchedule>>)> = self
            .pools
            .values()
            .map(|entry| (entry, entry.pool.lock()))
            .collect();

        // every pool is planned at the same `now` and stays locked until applied
        let plans = guards
            .iter()
            .map(|(entry, pool)| {
                pool.plan_notify(&self.address, entry.reward_amount, entry.reward_amount, now)
            })
            .collect::<std::result::Result<Vec<NotifyPlan>, AccrualError>>()?;

        let mut funded: Vec<&DeployedPool> = Vec::with_capacity(guards.len());
        for (entry, _) in &guards {
            let transfer =
                self.ledger
                    .transfer(&self.reward_token, &self.address, &entry.address, entry.reward_amount);
            if let Err(err) = transfer {
                self.refund(&funded);
                return Err(err.into());
            }
            funded.push(*entry);
        }

        for ((_, pool), plan) in guards.iter_mut().zip(plans) {
            pool.apply_notify(plan);
        }
        let pools = guards.len();
        drop(guards);

        self.notified = true;
        self.events.push(FactoryEvent::RewardsNotified {
            pools,
            total,
            at: now,
        });
        info!(factory = %self.address, pools, total = %total, "rewards notified");
        Ok(total)
    }

    fn refund(&self, funded: &[&DeployedPool]) {
        for entry in funded.iter().rev() {
            if let Err(err) = self.ledger.transfer(
                &self.reward_token,
                &entry.address,
                &self.address,
                entry.reward_amount,
            ) {
                error!(pool = %entry.address, %err, "refund to factory failed");
            }
        }
    }

    // ===== Views =====

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn reward_token(&self) -> TokenId {
        self.reward_token
    }

    pub fn genesis(&self) -> Timestamp {
        self.config.genesis
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    pub fn pool(&self, staking_token: &TokenId) -> Option<PoolHandle> {
        self.pools.get(staking_token).map(|entry| entry.pool.clone())
    }

    pub fn reward_amount(&self, staking_token: &TokenId) -> Option<Amount> {
        self.pools.get(staking_token).map(|entry| entry.reward_amount)
    }

    /// Staking tokens in deployment order
    pub fn staking_tokens(&self) -> Vec<TokenId> {
        self.pools.keys().copied().collect()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn events(&self) -> &[FactoryEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<FactoryEvent> {
        std::mem::take(&mut self.events)
    }
}
