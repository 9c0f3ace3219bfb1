//! Replays a [`Scenario`] against an in-memory ledger and a manual clock.

use crate::scenario::{Action, Scenario, Step, FACTORY_ACCOUNT, POOL_ACCOUNT};
use accrue_core::prelude::*;
use accrue_factory::{FactoryEvent, PoolFactory};
use accrue_pool::{ConfiguredPool, PoolAccounts, PoolEvent, PoolSnapshot, StakingPool};
use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

enum Target {
    Pool(ConfiguredPool),
    Factory(PoolFactory),
}

/// Anything the pool or the factory reported
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum LoggedEvent {
    Pool {
        pool: String,
        #[serde(flatten)]
        event: PoolEvent,
    },
    Factory(FactoryEvent),
}

impl fmt::Display for LoggedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool { pool, event } => write!(f, "{pool}: {event}"),
            Self::Factory(event) => write!(f, "factory: {event}"),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StepOutcome {
    pub at: Timestamp,
    pub actor: Option<String>,
    pub action: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub finished_at: Timestamp,
    pub steps: usize,
    pub failed: usize,
    pub funded: Amount,
    pub paid: Amount,
    pub paid_by_staker: IndexMap<String, Amount>,
    /// `funded − paid`, once every emission window has closed
    pub dust: Option<Amount>,
    pub pools: Vec<PoolSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub name: Option<String>,
    pub events: Vec<LoggedEvent>,
    pub steps: Vec<StepOutcome>,
    pub summary: Summary,
}

pub struct Runner {
    scenario: Scenario,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    target: Target,
    labels: HashMap<Address, String>,
    events: Vec<LoggedEvent>,
    outcomes: Vec<StepOutcome>,
    funded: Amount,
    paid: IndexMap<String, Amount>,
}

impl Runner {
    pub fn new(scenario: Scenario) -> anyhow::Result<Self> {
        let ledger = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(ManualClock::new(scenario.start));
        let reward_token = scenario.reward_token();

        let target = match (&scenario.pool, &scenario.factory) {
            (Some(config), _) => {
                let accounts = PoolAccounts {
                    address: Address::from_label(POOL_ACCOUNT),
                    staking_token: scenario.staking_token(),
                    reward_token,
                };
                let distributor = Arc::new(SingleOwner(Address::from_label(&scenario.distributor)));
                Target::Pool(config.build(accounts, distributor, ledger.clone(), clock.clone())?)
            }
            (None, Some(config)) => Target::Factory(PoolFactory::new(
                Address::from_label(FACTORY_ACCOUNT),
                reward_token,
                config.clone(),
                ledger.clone(),
                clock.clone(),
                Arc::new(SingleOwner(Address::from_label(&scenario.owner))),
            )?),
            (None, None) => return Err(anyhow!("scenario has no [pool] or [factory]")),
        };

        let mut runner = Self {
            scenario,
            ledger,
            clock,
            target,
            labels: HashMap::new(),
            events: Vec::new(),
            outcomes: Vec::new(),
            funded: 0,
            paid: IndexMap::new(),
        };
        runner.seed_balances()?;
        Ok(runner)
    }

    fn label(&mut self, name: &str) -> Address {
        let address = Address::from_label(name);
        self.labels.entry(address).or_insert_with(|| name.to_string());
        address
    }

    fn name_of(&self, address: &Address) -> String {
        self.labels
            .get(address)
            .cloned()
            .unwrap_or_else(|| address.to_string())
    }

    /// Ledger account receiving `fund` steps
    fn treasury(&self) -> Address {
        match self.target {
            Target::Pool(_) => Address::from_label(POOL_ACCOUNT),
            Target::Factory(_) => Address::from_label(FACTORY_ACCOUNT),
        }
    }

    fn seed_balances(&mut self) -> anyhow::Result<()> {
        let reward_token = self.scenario.reward_token();
        let treasury = self.treasury();
        for balance in self.scenario.balances.clone() {
            let account = self.label(&balance.account);
            let token = TokenId::from_label(&balance.token);
            self.ledger
                .mint(&token, &account, balance.amount)
                .with_context(|| format!("minting {} {} to {}", balance.amount, balance.token, balance.account))?;
            if token == reward_token && account == treasury {
                self.funded += balance.amount;
            }
        }
        Ok(())
    }

    /// Run every step, then summarize
    pub fn run(mut self) -> anyhow::Result<Report> {
        for step in self.scenario.steps.clone() {
            self.clock.set(step.at)?;
            if let Some(actor) = &step.actor {
                self.label(actor);
            }
            let outcome = match self.execute(&step) {
                Ok(detail) => StepOutcome {
                    at: step.at,
                    actor: step.actor.clone(),
                    action: step.action.to_string(),
                    ok: true,
                    detail,
                },
                Err(err) => {
                    tracing::warn!(at = step.at, action = %step.action, %err, "step failed");
                    StepOutcome {
                        at: step.at,
                        actor: step.actor.clone(),
                        action: step.action.to_string(),
                        ok: false,
                        detail: err.to_string(),
                    }
                }
            };
            self.outcomes.push(outcome);
            self.collect_events();
        }
        Ok(self.report())
    }

    fn execute(&mut self, step: &Step) -> anyhow::Result<String> {
        let action = step.action()?;
        match action {
            Action::Fund { amount } => {
                let treasury = self.treasury();
                self.ledger
                    .mint(&self.scenario.reward_token(), &treasury, amount)?;
                self.funded += amount;
                Ok(format!("funded {amount}"))
            }
            Action::Notify { caller, amount } => match &mut self.target {
                Target::Pool(pool) => {
                    let rate = pool.notify_reward_amount(caller, amount)?;
                    Ok(format!("rate {rate}/s"))
                }
                Target::Factory(_) => Err(anyhow!("factory pools are funded with `arm`")),
            },
            Action::Deploy {
                caller,
                token,
                amount,
            } => {
                let factory = self.factory_mut()?;
                let pool = factory.deploy(caller, token, amount)?;
                let address = pool.lock().address();
                if let Some(name) = step.token.clone() {
                    self.labels.insert(address, format!("{POOL_ACCOUNT}:{name}"));
                }
                Ok(format!("deployed {address}"))
            }
            Action::Arm => {
                let total = self.factory_mut()?.notify_reward_amounts()?;
                Ok(format!("notified {total}"))
            }
            Action::Deposit { staker, amount } => {
                let staked = self.with_pool(step, |pool, address, ledger, staking_token| {
                    ledger.approve(&staking_token, &staker, &address, amount);
                    pool.deposit(staker, amount)
                })?;
                Ok(format!("staked {staked}"))
            }
            Action::Withdraw { staker, amount } => {
                let staked = self.with_pool(step, |pool, _, _, _| pool.withdraw(staker, amount))?;
                Ok(format!("staked {staked}"))
            }
            Action::Collect { staker } => {
                let reward = self.with_pool(step, |pool, _, _, _| pool.collect(staker))?;
                self.record_payout(&staker, reward);
                Ok(format!("collected {reward}"))
            }
            Action::Exit { staker } => {
                let receipt = self.with_pool(step, |pool, _, _, _| pool.exit(staker))?;
                self.record_payout(&staker, receipt.reward);
                Ok(format!(
                    "withdrew {} and collected {}",
                    receipt.withdrawn, receipt.reward
                ))
            }
        }
    }

    fn factory_mut(&mut self) -> anyhow::Result<&mut PoolFactory> {
        match &mut self.target {
            Target::Factory(factory) => Ok(factory),
            Target::Pool(_) => Err(anyhow!("not a factory scenario")),
        }
    }

    /// Run `op` against the pool `step` targets
    fn with_pool<T>(
        &mut self,
        step: &Step,
        op: impl FnOnce(&mut dyn StakingPool, Address, &InMemoryLedger, TokenId) -> Result<T>,
    ) -> anyhow::Result<T> {
        match &mut self.target {
            Target::Pool(pool) => {
                let pool = pool.staking_mut();
                let snapshot = pool.snapshot();
                Ok(op(pool, snapshot.address, self.ledger.as_ref(), snapshot.staking_token)?)
            }
            Target::Factory(factory) => {
                let token = step
                    .pool_token()
                    .ok_or_else(|| anyhow!("`{}` needs a token", step.action))?;
                let handle = factory
                    .pool(&token)
                    .ok_or_else(|| anyhow!("no pool deployed for {token}"))?;
                let mut guard = handle.lock();
                let address = guard.address();
                let pool: &mut dyn StakingPool = &mut *guard;
                Ok(op(pool, address, self.ledger.as_ref(), token)?)
            }
        }
    }

    fn record_payout(&mut self, staker: &Address, amount: Amount) {
        let name = self.name_of(staker);
        *self.paid.entry(name).or_insert(0) += amount;
    }

    fn collect_events(&mut self) {
        let mut drained = Vec::new();
        match &mut self.target {
            Target::Pool(pool) => {
                for event in pool.staking_mut().drain_events() {
                    drained.push((POOL_ACCOUNT.to_string(), event));
                }
            }
            Target::Factory(factory) => {
                for event in factory.drain_events() {
                    self.events.push(LoggedEvent::Factory(event));
                }
                for token in factory.staking_tokens() {
                    if let Some(handle) = factory.pool(&token) {
                        let mut pool = handle.lock();
                        let name = self
                            .labels
                            .get(&pool.address())
                            .cloned()
                            .unwrap_or_else(|| pool.address().to_string());
                        for event in pool.drain_events() {
                            drained.push((name.clone(), event));
                        }
                    }
                }
            }
        }
        self.events.extend(
            drained
                .into_iter()
                .map(|(pool, event)| LoggedEvent::Pool { pool, event }),
        );
    }

    fn snapshots(&self) -> Vec<PoolSnapshot> {
        match &self.target {
            Target::Pool(pool) => vec![pool.staking().snapshot()],
            Target::Factory(factory) => factory
                .staking_tokens()
                .iter()
                .filter_map(|token| factory.pool(token))
                .map(|handle| handle.lock().snapshot())
                .collect(),
        }
    }

    fn report(self) -> Report {
        let now = self.clock.now();
        let funded = self.funded;
        let pools = self.snapshots();
        let paid: Amount = self.paid.values().sum();
        let closed = !pools.is_empty() && pools.iter().all(|p| p.window.finish > 0 && p.window.finish <= now);
        let failed = self.outcomes.iter().filter(|o| !o.ok).count();

        Report {
            name: self.scenario.name.clone(),
            summary: Summary {
                finished_at: now,
                steps: self.outcomes.len(),
                failed,
                funded,
                paid,
                paid_by_staker: self.paid,
                dust: closed.then(|| funded.saturating_sub(paid)),
                pools,
            },
            events: self.events,
            steps: self.outcomes,
        }
    }
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.summary.failed == 0
    }

    /// Human-readable rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            out.push_str(&format!("Scenario: {name}\n\n"));
        }

        out.push_str("Events:\n");
        for event in &self.events {
            out.push_str(&format!("  {event}\n"));
        }

        let failures: Vec<&StepOutcome> = self.steps.iter().filter(|s| !s.ok).collect();
        if !failures.is_empty() {
            out.push_str("\nFailed steps:\n");
            for step in failures {
                out.push_str(&format!(
                    "  [{}] {} by {}: {}\n",
                    step.at,
                    step.action,
                    step.actor.as_deref().unwrap_or("-"),
                    step.detail
                ));
            }
        }

        let summary = &self.summary;
        out.push_str("\nSummary:\n");
        out.push_str(&format!("  finished at: {}\n", summary.finished_at));
        out.push_str(&format!("  steps:       {} ({} failed)\n", summary.steps, summary.failed));
        out.push_str(&format!("  funded:      {}\n", summary.funded));
        out.push_str(&format!("  paid:        {}\n", summary.paid));
        for (staker, amount) in &summary.paid_by_staker {
            out.push_str(&format!("    {staker}: {amount}\n"));
        }
        match summary.dust {
            Some(dust) => out.push_str(&format!("  dust:        {dust}\n")),
            None => out.push_str("  dust:        (emission still open)\n"),
        }
        out
    }
}
