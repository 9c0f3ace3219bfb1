//! Scenario file format
//!
//! A scenario describes one pool (`[pool]`) or one factory (`[factory]`),
//! the starting ledger balances and a timed list of actions:
//!
//! ```toml
//! start = 1800
//! staking_token = "uni-v2-lp"
//!
//! [pool.schedule]
//! kind = "fixed-window"
//! rate_per_second = 100
//! start = 3600
//! finish = 7200
//!
//! [[balance]]
//! account = "wallet-0"
//! token = "uni-v2-lp"
//! amount = 1000
//!
//! [[step]]
//! at = 1800
//! actor = "wallet-0"
//! action = "deposit"
//! amount = 100
//! ```
//!
//! Accounts and tokens are plain labels, hashed into identifiers.

use accrue_core::{Address, Amount, Timestamp, TokenId};
use accrue_factory::FactoryConfig;
use accrue_pool::PoolConfig;
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Ledger account of the pool in `[pool]` scenarios
pub const POOL_ACCOUNT: &str = "pool";
/// Ledger account of the factory in `[factory]` scenarios
pub const FACTORY_ACCOUNT: &str = "factory";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    /// Clock reading before the first step
    #[serde(default)]
    pub start: Timestamp,

    #[serde(default = "default_reward_token")]
    pub reward_token: String,

    /// Staking token of the single pool in `[pool]` scenarios
    #[serde(default = "default_staking_token")]
    pub staking_token: String,

    /// Account allowed to notify a duration pool
    #[serde(default = "default_distributor")]
    pub distributor: String,

    /// Account allowed to deploy factory pools
    #[serde(default = "default_owner")]
    pub owner: String,

    #[serde(default)]
    pub pool: Option<PoolConfig>,

    #[serde(default)]
    pub factory: Option<FactoryConfig>,

    #[serde(default, rename = "balance")]
    pub balances: Vec<Balance>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

fn default_reward_token() -> String {
    "reward".to_string()
}

fn default_staking_token() -> String {
    "stake".to_string()
}

fn default_distributor() -> String {
    "distributor".to_string()
}

fn default_owner() -> String {
    "owner".to_string()
}

/// Initial ledger balance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Balance {
    pub account: String,
    pub token: String,
    #[serde(with = "accrue_core::serde_amount")]
    pub amount: Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Deposit,
    Withdraw,
    Collect,
    Exit,
    Notify,
    Fund,
    Deploy,
    Arm,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Collect => "collect",
            Self::Exit => "exit",
            Self::Notify => "notify",
            Self::Fund => "fund",
            Self::Deploy => "deploy",
            Self::Arm => "arm",
        };
        f.write_str(name)
    }
}

/// One timed action as written in the file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub at: Timestamp,
    #[serde(default)]
    pub actor: Option<String>,
    pub action: ActionKind,
    #[serde(default, with = "accrue_core::serde_amount::option")]
    pub amount: Option<Amount>,
    /// Staking token selecting the pool in `[factory]` scenarios
    #[serde(default)]
    pub token: Option<String>,
}

/// A step with its required fields resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Deposit { staker: Address, amount: Amount },
    Withdraw { staker: Address, amount: Amount },
    Collect { staker: Address },
    Exit { staker: Address },
    Notify { caller: Address, amount: Amount },
    Fund { amount: Amount },
    Deploy { caller: Address, token: TokenId, amount: Amount },
    Arm,
}

impl Step {
    fn actor(&self) -> anyhow::Result<Address> {
        self.actor
            .as_deref()
            .map(Address::from_label)
            .ok_or_else(|| anyhow!("`{}` at {} needs an actor", self.action, self.at))
    }

    fn amount(&self) -> anyhow::Result<Amount> {
        self.amount
            .ok_or_else(|| anyhow!("`{}` at {} needs an amount", self.action, self.at))
    }

    /// Pool the step targets in factory scenarios
    pub fn pool_token(&self) -> Option<TokenId> {
        self.token.as_deref().map(TokenId::from_label)
    }

    pub fn action(&self) -> anyhow::Result<Action> {
        let action = match self.action {
            ActionKind::Deposit => Action::Deposit {
                staker: self.actor()?,
                amount: self.amount()?,
            },
            ActionKind::Withdraw => Action::Withdraw {
                staker: self.actor()?,
                amount: self.amount()?,
            },
            ActionKind::Collect => Action::Collect {
                staker: self.actor()?,
            },
            ActionKind::Exit => Action::Exit {
                staker: self.actor()?,
            },
            ActionKind::Notify => Action::Notify {
                caller: self.actor()?,
                amount: self.amount()?,
            },
            ActionKind::Fund => Action::Fund {
                amount: self.amount()?,
            },
            ActionKind::Deploy => Action::Deploy {
                caller: self.actor()?,
                token: self
                    .pool_token()
                    .ok_or_else(|| anyhow!("`deploy` at {} needs a token", self.at))?,
                amount: self.amount()?,
            },
            ActionKind::Arm => Action::Arm,
        };
        Ok(action)
    }
}

impl Scenario {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(input).context("invalid scenario file")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match (&self.pool, &self.factory) {
            (Some(pool), None) => pool.validate()?,
            (None, Some(factory)) => factory.validate()?,
            (Some(_), Some(_)) => bail!("a scenario runs either [pool] or [factory], not both"),
            (None, None) => bail!("a scenario needs a [pool] or a [factory] section"),
        }

        let mut previous = self.start;
        for step in &self.steps {
            if step.at < previous {
                bail!("step `{}` at {} runs before {}", step.action, step.at, previous);
            }
            previous = step.at;

            step.action()?;
            let factory_only = matches!(step.action, ActionKind::Deploy | ActionKind::Arm);
            if factory_only && self.factory.is_none() {
                bail!("`{}` at {} requires a [factory] scenario", step.action, step.at);
            }
            if step.action == ActionKind::Notify && self.factory.is_some() {
                bail!("factory pools are funded with `arm`, not `notify`");
            }
            let pool_step = matches!(
                step.action,
                ActionKind::Deposit | ActionKind::Withdraw | ActionKind::Collect | ActionKind::Exit
            );
            if pool_step && self.factory.is_some() && step.token.is_none() {
                bail!("`{}` at {} needs a token to select the pool", step.action, step.at);
            }
        }
        Ok(())
    }

    pub fn reward_token(&self) -> TokenId {
        TokenId::from_label(&self.reward_token)
    }

    pub fn staking_token(&self) -> TokenId {
        TokenId::from_label(&self.staking_token)
    }
}
