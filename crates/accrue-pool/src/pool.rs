//! # Reward Pool
//!
//! Holds stakers' deposits of one staking token and pays out one reward
//! token. Every mutating call follows the same sequence:
//!
//! 1. read the clock once
//! 2. settle the accumulator through `now` (clamped to the emission window)
//! 3. settle the caller's position against it
//! 4. apply the operation to the settled copies and move tokens
//! 5. commit the copies, record the event
//!
//! A failure in any step returns before step 5, so state is untouched.

use crate::accumulator::{Accumulator, EmissionWindow};
use crate::events::PoolEvent;
use crate::position::StakerPosition;
use crate::schedule::{DurationSchedule, EmissionSchedule, ScheduleKind};
use accrue_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Token identities and the pool's own account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAccounts {
    /// The pool's account on the ledger
    pub address: Address,
    pub staking_token: TokenId,
    pub reward_token: TokenId,
}

/// Outcome of [`RewardPool::exit`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReceipt {
    pub withdrawn: Amount,
    pub reward: Amount,
}

/// Point-in-time view of a pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub staking_token: TokenId,
    pub reward_token: TokenId,
    pub schedule: ScheduleKind,
    pub scale_bits: u32,
    pub window: EmissionWindow,
    pub total_staked: Amount,
    pub cumulative_reward_per_share: U256,
    pub last_update: Timestamp,
    pub total_emitted: Amount,
    pub total_paid: Amount,
    pub reward_balance: Amount,
    pub reward_reserve: Amount,
    pub stakers: usize,
}

/// Staking pool accruing rewards under schedule `S`
pub struct RewardPool<S: EmissionSchedule> {
    accounts: PoolAccounts,
    scale: FixedPointScale,
    schedule: S,
    accumulator: Accumulator,
    positions: HashMap<Address, StakerPosition>,
    total_paid: Amount,
    events: Vec<PoolEvent>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
}

impl<S: EmissionSchedule + fmt::Debug> fmt::Debug for RewardPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RewardPool")
            .field("accounts", &self.accounts)
            .field("scale", &self.scale)
            .field("schedule", &self.schedule)
            .field("accumulator", &self.accumulator)
            .field("stakers", &self.positions.len())
            .field("total_paid", &self.total_paid)
            .finish_non_exhaustive()
    }
}

impl<S: EmissionSchedule> RewardPool<S> {
    /// Create an empty pool, settled through the clock's current time
    pub fn new(
        accounts: PoolAccounts,
        schedule: S,
        scale: FixedPointScale,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let genesis = clock.now();
        debug!(
            pool = %accounts.address,
            schedule = %schedule.kind(),
            scale = ?scale,
            genesis,
            "reward pool created"
        );
        Self {
            accounts,
            scale,
            schedule,
            accumulator: Accumulator::new(genesis),
            positions: HashMap::new(),
            total_paid: 0,
            events: Vec::new(),
            ledger,
            clock,
        }
    }

    // ===== Settlement =====

    fn settled_accumulator(&self, now: Timestamp) -> Result<Accumulator> {
        self.accumulator
            .settled(&self.schedule.window(), now, self.scale)
    }

    fn settled_position(&self, staker: &Address, acc: &Accumulator) -> Result<StakerPosition> {
        let current = self
            .positions
            .get(staker)
            .cloned()
            .unwrap_or_else(|| StakerPosition {
                last_cumulative_reward_per_share: self.accumulator.cumulative_reward_per_share,
                ..Default::default()
            });
        current.settled(acc, self.scale)
    }

    fn commit(&mut self, acc: Accumulator, staker: Address, position: StakerPosition) {
        self.accumulator = acc;
        if position.is_empty() && !self.positions.contains_key(&staker) {
            return;
        }
        self.positions.insert(staker, position);
    }

    /// Bring the accumulator current without touching any position
    pub fn settle(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.accumulator = self.settled_accumulator(now)?;
        Ok(())
    }

    // ===== Staker operations =====

    /// Stake `amount` of the staking token from `staker`.
    ///
    /// The staker must have approved the pool's address to move the tokens.
    /// Returns the staker's new staked amount.
    pub fn deposit(&mut self, staker: Address, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            warn!(pool = %self.accounts.address, %staker, "deposit of zero rejected");
            return Err(AccrualError::InvalidAmount);
        }
        let now = self.clock.now();
        let mut acc = self.settled_accumulator(now)?;
        let mut position = self.settled_position(&staker, &acc)?;

        position.amount = position
            .amount
            .checked_add(amount)
            .ok_or(AccrualError::MathOverflow)?;
        acc.total_staked = acc
            .total_staked
            .checked_add(amount)
            .ok_or(AccrualError::MathOverflow)?;

        self.ledger.transfer_from(
            &self.accounts.staking_token,
            &self.accounts.address,
            &staker,
            &self.accounts.address,
            amount,
        )?;

        let staked = position.amount;
        self.commit(acc, staker, position);
        self.record(PoolEvent::Deposited {
            staker,
            amount,
            staked,
            at: now,
        });
        info!(pool = %self.accounts.address, %staker, amount = %amount, staked = %staked, "deposited");
        Ok(staked)
    }

    /// Return `amount` of the staking token to `staker`. Returns the remaining staked amount.
    pub fn withdraw(&mut self, staker: Address, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            warn!(pool = %self.accounts.address, %staker, "withdrawal of zero rejected");
            return Err(AccrualError::InvalidAmount);
        }
        let now = self.clock.now();
        let mut acc = self.settled_accumulator(now)?;
        let mut position = self.settled_position(&staker, &acc)?;

        if amount > position.amount {
            warn!(
                pool = %self.accounts.address,
                %staker,
                requested = %amount,
                staked = %position.amount,
                "withdrawal exceeds stake"
            );
            return Err(AccrualError::InsufficientStake {
                requested: amount,
                staked: position.amount,
            });
        }
        position.amount -= amount;
        acc.total_staked = acc
            .total_staked
            .checked_sub(amount)
            .ok_or(AccrualError::MathOverflow)?;

        self.ledger.transfer(
            &self.accounts.staking_token,
            &self.accounts.address,
            &staker,
            amount,
        )?;

        let staked = position.amount;
        self.commit(acc, staker, position);
        self.record(PoolEvent::Withdrawn {
            staker,
            amount,
            staked,
            at: now,
        });
        info!(pool = %self.accounts.address, %staker, amount = %amount, staked = %staked, "withdrawn");
        Ok(staked)
    }

    /// Pay out everything `staker` has accrued. Returns the amount paid, which may be zero.
    pub fn collect(&mut self, staker: Address) -> Result<Amount> {
        let now = self.clock.now();
        let acc = self.settled_accumulator(now)?;
        let mut position = self.settled_position(&staker, &acc)?;
        let owed = position.accrued_rewards;

        self.ensure_reserve(owed)?;
        if owed > 0 {
            self.ledger.transfer(
                &self.accounts.reward_token,
                &self.accounts.address,
                &staker,
                owed,
            )?;
        }
        let total_paid = self
            .total_paid
            .checked_add(owed)
            .ok_or(AccrualError::MathOverflow)?;

        position.accrued_rewards = 0;
        self.total_paid = total_paid;
        self.commit(acc, staker, position);
        self.record(PoolEvent::RewardCollected {
            staker,
            amount: owed,
            at: now,
        });
        info!(pool = %self.accounts.address, %staker, amount = %owed, "reward collected");
        Ok(owed)
    }

    /// Withdraw the full stake and collect, settled at a single clock reading.
    /// Either both transfers happen or neither does.
    pub fn exit(&mut self, staker: Address) -> Result<ExitReceipt> {
        let now = self.clock.now();
        let mut acc = self.settled_accumulator(now)?;
        let mut position = self.settled_position(&staker, &acc)?;
        let withdrawn = position.amount;
        let reward = position.accrued_rewards;
        if withdrawn == 0 {
            warn!(pool = %self.accounts.address, %staker, "exit without stake rejected");
            return Err(AccrualError::InvalidAmount);
        }

        self.ensure_reserve(reward)?;
        acc.total_staked = acc
            .total_staked
            .checked_sub(withdrawn)
            .ok_or(AccrualError::MathOverflow)?;
        let total_paid = self
            .total_paid
            .checked_add(reward)
            .ok_or(AccrualError::MathOverflow)?;

        self.ledger.transfer(
            &self.accounts.staking_token,
            &self.accounts.address,
            &staker,
            withdrawn,
        )?;
        if reward > 0 {
            let payout = self.ledger.transfer(
                &self.accounts.reward_token,
                &self.accounts.address,
                &staker,
                reward,
            );
            if let Err(err) = payout {
                self.return_stake(&staker, withdrawn);
                return Err(err.into());
            }
        }

        position.amount = 0;
        position.accrued_rewards = 0;
        self.total_paid = total_paid;
        self.commit(acc, staker, position);
        self.record(PoolEvent::Withdrawn {
            staker,
            amount: withdrawn,
            staked: 0,
            at: now,
        });
        self.record(PoolEvent::RewardCollected {
            staker,
            amount: reward,
            at: now,
        });
        info!(
            pool = %self.accounts.address,
            %staker,
            withdrawn = %withdrawn,
            reward = %reward,
            "exited"
        );
        Ok(ExitReceipt { withdrawn, reward })
    }

    /// Undo the stake transfer of an exit whose payout failed
    fn return_stake(&self, staker: &Address, amount: Amount) {
        if let Err(err) = self.ledger.transfer(
            &self.accounts.staking_token,
            staker,
            &self.accounts.address,
            amount,
        ) {
            error!(pool = %self.accounts.address, %staker, %err, "stake return failed");
        }
    }

    fn ensure_reserve(&self, owed: Amount) -> Result<()> {
        let held = self.reward_balance();
        if held < owed {
            warn!(
                pool = %self.accounts.address,
                owed = %owed,
                held = %held,
                "reward balance cannot cover payout"
            );
            return Err(AccrualError::InsufficientRewardReserve {
                owed,
                available: held,
            });
        }
        Ok(())
    }

    fn record(&mut self, event: PoolEvent) {
        self.events.push(event);
    }

    // ===== Views =====

    pub fn address(&self) -> Address {
        self.accounts.address
    }

    pub fn accounts(&self) -> &PoolAccounts {
        &self.accounts
    }

    pub fn staking_token(&self) -> TokenId {
        self.accounts.staking_token
    }

    pub fn reward_token(&self) -> TokenId {
        self.accounts.reward_token
    }

    pub fn scale(&self) -> FixedPointScale {
        self.scale
    }

    pub fn schedule(&self) -> &S {
        &self.schedule
    }

    pub fn total_staked(&self) -> Amount {
        self.accumulator.total_staked
    }

    /// Accumulator value as of the last settlement
    pub fn cumulative_reward_per_share(&self) -> U256 {
        self.accumulator.cumulative_reward_per_share
    }

    pub fn last_update_timestamp(&self) -> Timestamp {
        self.accumulator.last_update
    }

    pub fn reward_rate(&self) -> Amount {
        self.schedule.window().rate
    }

    pub fn period_start(&self) -> Timestamp {
        self.schedule.window().start
    }

    pub fn period_finish(&self) -> Timestamp {
        self.schedule.window().finish
    }

    /// `min(now, period_finish)`
    pub fn last_time_reward_applicable(&self) -> Timestamp {
        self.schedule.window().effective_now(self.clock.now())
    }

    pub fn reward_for_duration(&self) -> Result<Amount> {
        self.schedule.reward_for_duration()
    }

    pub fn total_emitted(&self) -> Amount {
        self.accumulator.total_emitted
    }

    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    /// Reward tokens held by the pool on the ledger
    pub fn reward_balance(&self) -> Amount {
        self.ledger
            .balance_of(&self.accounts.reward_token, &self.accounts.address)
    }

    /// Reward balance not yet promised to stakers, as of the last settlement
    pub fn reward_reserve(&self) -> Amount {
        self.reward_balance()
            .saturating_sub(self.accumulator.outstanding(self.total_paid))
    }

    /// Stored position, as of its last settlement
    pub fn position(&self, staker: &Address) -> StakerPosition {
        self.positions.get(staker).cloned().unwrap_or_default()
    }

    /// Rewards `staker` could collect right now
    pub fn earned(&self, staker: &Address) -> Result<Amount> {
        let acc = self.settled_accumulator(self.clock.now())?;
        Ok(self.settled_position(staker, &acc)?.accrued_rewards)
    }

    pub fn stakers(&self) -> impl Iterator<Item = (&Address, &StakerPosition)> {
        self.positions.iter()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            address: self.accounts.address,
            staking_token: self.accounts.staking_token,
            reward_token: self.accounts.reward_token,
            schedule: self.schedule.kind(),
            scale_bits: self.scale.bits(),
            window: self.schedule.window(),
            total_staked: self.accumulator.total_staked,
            cumulative_reward_per_share: self.accumulator.cumulative_reward_per_share,
            last_update: self.accumulator.last_update,
            total_emitted: self.accumulator.total_emitted,
            total_paid: self.total_paid,
            reward_balance: self.reward_balance(),
            reward_reserve: self.reward_reserve(),
            stakers: self.positions.len(),
        }
    }

    pub fn events(&self) -> &[PoolEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }
}

/// A validated reward notification, ready to apply.
///
/// Produced by [`RewardPool::plan_notify`] against a fixed `at` timestamp;
/// applying it cannot fail.
#[derive(Clone, Debug)]
pub struct NotifyPlan {
    amount: Amount,
    at: Timestamp,
    accumulator: Accumulator,
    schedule: DurationSchedule,
}

impl NotifyPlan {
    /// Reward rate the notification sets
    pub fn rate(&self) -> Amount {
        self.schedule.window().rate
    }

    pub fn period_finish(&self) -> Timestamp {
        self.schedule.window().finish
    }
}

impl RewardPool<DurationSchedule> {
    /// Start (or extend) an emission period funded with `amount`.
    ///
    /// The reward tokens must already sit in the pool's account. Returns the
    /// new reward rate.
    pub fn notify_reward_amount(&mut self, caller: Address, amount: Amount) -> Result<Amount> {
        let plan = self.plan_notify(&caller, amount, 0, self.clock.now())?;
        Ok(self.apply_notify(plan))
    }

    /// Validate `notify_reward_amount(caller, amount)` as of `now`, counting
    /// `incoming` reward tokens that will reach the pool before the plan is applied.
    pub fn plan_notify(
        &self,
        caller: &Address,
        amount: Amount,
        incoming: Amount,
        now: Timestamp,
    ) -> Result<NotifyPlan> {
        if !self.schedule.is_distributor(caller) {
            warn!(pool = %self.accounts.address, %caller, "unauthorized reward notification");
            return Err(AccrualError::Unauthorized(*caller));
        }
        let mut accumulator = self.settled_accumulator(now)?;
        let available = self
            .reward_balance()
            .checked_add(incoming)
            .ok_or(AccrualError::MathOverflow)?
            .saturating_sub(accumulator.outstanding(self.total_paid));
        let schedule = self.schedule.notified(amount, now, available)?;
        accumulator.last_update = now;
        Ok(NotifyPlan {
            amount,
            at: now,
            accumulator,
            schedule,
        })
    }

    /// Commit a plan from [`plan_notify`](Self::plan_notify). The pool must not
    /// have changed since the plan was made. Returns the new reward rate.
    pub fn apply_notify(&mut self, plan: NotifyPlan) -> Amount {
        let NotifyPlan {
            amount,
            at,
            accumulator,
            schedule,
        } = plan;
        let window = schedule.window();
        self.accumulator = accumulator;
        self.schedule = schedule;
        self.record(PoolEvent::RewardAdded {
            amount,
            rate: window.rate,
            period_finish: window.finish,
            at,
        });
        info!(
            pool = %self.accounts.address,
            amount = %amount,
            rate = %window.rate,
            period_finish = window.finish,
            "reward notified"
        );
        window.rate
    }
}

/// Staker-facing operations shared by every schedule variant
pub trait StakingPool: Send {
    fn deposit(&mut self, staker: Address, amount: Amount) -> Result<Amount>;
    fn withdraw(&mut self, staker: Address, amount: Amount) -> Result<Amount>;
    fn collect(&mut self, staker: Address) -> Result<Amount>;
    fn exit(&mut self, staker: Address) -> Result<ExitReceipt>;
    fn earned(&self, staker: &Address) -> Result<Amount>;
    fn position(&self, staker: &Address) -> StakerPosition;
    fn snapshot(&self) -> PoolSnapshot;
    fn drain_events(&mut self) -> Vec<PoolEvent>;
}

impl<S: EmissionSchedule> StakingPool for RewardPool<S> {
    fn deposit(&mut self, staker: Address, amount: Amount) -> Result<Amount> {
        RewardPool::deposit(self, staker, amount)
    }

    fn withdraw(&mut self, staker: Address, amount: Amount) -> Result<Amount> {
        RewardPool::withdraw(self, staker, amount)
    }

    fn collect(&mut self, staker: Address) -> Result<Amount> {
        RewardPool::collect(self, staker)
    }

    fn exit(&mut self, staker: Address) -> Result<ExitReceipt> {
        RewardPool::exit(self, staker)
    }

    fn earned(&self, staker: &Address) -> Result<Amount> {
        RewardPool::earned(self, staker)
    }

    fn position(&self, staker: &Address) -> StakerPosition {
        RewardPool::position(self, staker)
    }

    fn snapshot(&self) -> PoolSnapshot {
        RewardPool::snapshot(self)
    }

    fn drain_events(&mut self) -> Vec<PoolEvent> {
        RewardPool::drain_events(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::FixedWindow;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Harness {
        ledger: Arc<InMemoryLedger>,
        clock: Arc<ManualClock>,
        accounts: PoolAccounts,
        owner: Address,
    }

    impl Harness {
        fn new(start: Timestamp) -> Self {
            Self {
                ledger: Arc::new(InMemoryLedger::new()),
                clock: Arc::new(ManualClock::new(start)),
                accounts: PoolAccounts {
                    address: Address::from_label("pool"),
                    staking_token: TokenId::from_label("lp"),
                    reward_token: TokenId::from_label("reward"),
                },
                owner: Address::from_label("owner"),
            }
        }

        fn fixed(&self) -> RewardPool<FixedWindow> {
            RewardPool::new(
                self.accounts,
                FixedWindow::new(100, 3_600, 7_200).unwrap(),
                FixedPointScale::Q96,
                self.ledger.clone(),
                self.clock.clone(),
            )
        }

        fn duration(&self, seconds: u64) -> RewardPool<DurationSchedule> {
            let schedule = DurationSchedule::new(seconds, Arc::new(SingleOwner(self.owner))).unwrap();
            RewardPool::new(
                self.accounts,
                schedule,
                FixedPointScale::Q128,
                self.ledger.clone(),
                self.clock.clone(),
            )
        }

        fn staker(&self, label: &str, balance: Amount) -> Address {
            let staker = Address::from_label(label);
            self.ledger
                .mint(&self.accounts.staking_token, &staker, balance)
                .unwrap();
            self.ledger.approve(
                &self.accounts.staking_token,
                &staker,
                &self.accounts.address,
                Amount::MAX,
            );
            staker
        }

        fn fund(&self, amount: Amount) {
            self.ledger
                .mint(&self.accounts.reward_token, &self.accounts.address, amount)
                .unwrap();
        }

        fn rewards_of(&self, who: &Address) -> Amount {
            self.ledger.balance_of(&self.accounts.reward_token, who)
        }
    }

    #[test]
    fn test_deposit_moves_tokens_and_records() {
        let h = Harness::new(1_800);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);

        assert_eq!(pool.deposit(alice, 100).unwrap(), 100);

        assert_eq!(pool.total_staked(), 100);
        assert_eq!(
            h.ledger.balance_of(&h.accounts.staking_token, &h.accounts.address),
            100
        );
        assert_eq!(pool.position(&alice).last_update, 1_800);
        assert_eq!(
            pool.events(),
            &[PoolEvent::Deposited {
                staker: alice,
                amount: 100,
                staked: 100,
                at: 1_800
            }]
        );
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let h = Harness::new(1_800);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);

        assert_eq!(pool.deposit(alice, 0), Err(AccrualError::InvalidAmount));
        assert_eq!(pool.withdraw(alice, 0), Err(AccrualError::InvalidAmount));
        assert_eq!(pool.exit(alice), Err(AccrualError::InvalidAmount));
        assert!(pool.events().is_empty());
    }

    #[test]
    fn test_deposit_without_allowance_changes_nothing() {
        let h = Harness::new(1_800);
        let mut pool = h.fixed();
        let bob = Address::from_label("bob");
        h.ledger
            .mint(&h.accounts.staking_token, &bob, 500)
            .unwrap();

        let err = pool.deposit(bob, 100).unwrap_err();

        assert!(matches!(
            err,
            AccrualError::Ledger(LedgerError::InsufficientAllowance { .. })
        ));
        assert_eq!(pool.total_staked(), 0);
        assert_eq!(pool.position(&bob), StakerPosition::default());
        assert!(pool.events().is_empty());
    }

    #[test]
    fn test_withdraw_more_than_staked() {
        let h = Harness::new(1_800);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();

        let err = pool.withdraw(alice, 101).unwrap_err();

        assert_eq!(
            err,
            AccrualError::InsufficientStake {
                requested: 101,
                staked: 100
            }
        );
        assert_eq!(pool.total_staked(), 100);
    }

    #[test]
    fn test_collect_zero_still_records() {
        let h = Harness::new(1_800);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();
        pool.drain_events();

        assert_eq!(pool.collect(alice).unwrap(), 0);
        assert_eq!(
            pool.events(),
            &[PoolEvent::RewardCollected {
                staker: alice,
                amount: 0,
                at: 1_800
            }]
        );
    }

    #[test]
    fn test_collect_without_reserve_fails_cleanly() {
        let h = Harness::new(3_600);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();
        h.clock.set(3_610).unwrap();

        let err = pool.collect(alice).unwrap_err();

        assert_eq!(
            err,
            AccrualError::InsufficientRewardReserve {
                owed: 1_000,
                available: 0
            }
        );
        assert_eq!(pool.last_update_timestamp(), 3_600);
        assert_eq!(pool.position(&alice).accrued_rewards, 0);

        h.fund(1_000);
        assert_eq!(pool.collect(alice).unwrap(), 1_000);
        assert_eq!(h.rewards_of(&alice), 1_000);
        assert_eq!(pool.total_paid(), 1_000);
    }

    #[test]
    fn test_exit_is_all_or_nothing() {
        let h = Harness::new(3_600);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();
        h.clock.set(3_610).unwrap();

        assert!(matches!(
            pool.exit(alice),
            Err(AccrualError::InsufficientRewardReserve { .. })
        ));
        assert_eq!(pool.position(&alice).amount, 100);
        assert_eq!(pool.total_staked(), 100);

        h.fund(5_000);
        let receipt = pool.exit(alice).unwrap();

        assert_eq!(
            receipt,
            ExitReceipt {
                withdrawn: 100,
                reward: 1_000
            }
        );
        assert_eq!(pool.total_staked(), 0);
        assert_eq!(
            h.ledger.balance_of(&h.accounts.staking_token, &alice),
            1_000
        );
    }

    /// Advances one second every time it is read
    struct TickingClock(AtomicU64);

    impl Clock for TickingClock {
        fn now(&self) -> Timestamp {
            self.0.fetch_add(1, Ordering::SeqCst)
        }
    }

    #[test]
    fn test_exit_settles_once() {
        let h = Harness::new(3_600);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();
        pool.clock = Arc::new(TickingClock(AtomicU64::new(3_602)));
        h.fund(150);

        // read at 3_602: 200 owed, 150 held
        assert_eq!(
            pool.exit(alice),
            Err(AccrualError::InsufficientRewardReserve {
                owed: 200,
                available: 150
            })
        );
        assert_eq!(pool.position(&alice).amount, 100);
        assert_eq!(pool.position(&alice).accrued_rewards, 0);
        assert_eq!(pool.total_staked(), 100);
        assert_eq!(pool.last_update_timestamp(), 3_600);
        assert_eq!(h.ledger.balance_of(&h.accounts.staking_token, &alice), 900);
        assert!(pool
            .events()
            .iter()
            .all(|e| matches!(e, PoolEvent::Deposited { .. })));

        // read at 3_603: 300 owed, all of it covered
        h.fund(150);
        let receipt = pool.exit(alice).unwrap();

        assert_eq!(
            receipt,
            ExitReceipt {
                withdrawn: 100,
                reward: 300
            }
        );
        assert_eq!(
            pool.position(&alice),
            StakerPosition {
                last_cumulative_reward_per_share: pool.cumulative_reward_per_share(),
                last_update: 3_603,
                ..Default::default()
            }
        );
        assert_eq!(pool.total_staked(), 0);
        assert_eq!(pool.total_paid(), 300);
        assert_eq!(h.rewards_of(&alice), 300);
        assert_eq!(h.ledger.balance_of(&h.accounts.staking_token, &alice), 1_000);
    }

    #[test]
    fn test_earned_matches_collect() {
        let h = Harness::new(3_600);
        let mut pool = h.fixed();
        h.fund(360_000);
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 100).unwrap();
        h.clock.set(4_000).unwrap();

        let earned = pool.earned(&alice).unwrap();

        assert_eq!(earned, 40_000);
        assert_eq!(pool.collect(alice).unwrap(), earned);
        assert_eq!(pool.earned(&alice).unwrap(), 0);
    }

    #[test]
    fn test_views() {
        let h = Harness::new(1_800);
        let pool = h.fixed();

        assert_eq!(pool.reward_rate(), 100);
        assert_eq!(pool.period_start(), 3_600);
        assert_eq!(pool.period_finish(), 7_200);
        assert_eq!(pool.last_time_reward_applicable(), 1_800);
        assert_eq!(pool.reward_for_duration().unwrap(), 360_000);

        h.clock.set(9_000).unwrap();
        assert_eq!(pool.last_time_reward_applicable(), 7_200);

        let snapshot = pool.snapshot();
        assert_eq!(snapshot.schedule, ScheduleKind::FixedWindow);
        assert_eq!(snapshot.scale_bits, 96);
        assert_eq!(snapshot.stakers, 0);
    }

    #[test]
    fn test_notify_requires_distributor() {
        let h = Harness::new(1_000);
        let mut pool = h.duration(100);
        h.fund(10_000);

        let mallory = Address::from_label("mallory");
        assert_eq!(
            pool.notify_reward_amount(mallory, 10_000),
            Err(AccrualError::Unauthorized(mallory))
        );
        assert_eq!(pool.reward_rate(), 0);

        assert_eq!(pool.notify_reward_amount(h.owner, 10_000).unwrap(), 100);
        assert_eq!(pool.period_start(), 1_000);
        assert_eq!(pool.period_finish(), 1_100);
        assert_eq!(pool.last_update_timestamp(), 1_000);
    }

    #[test]
    fn test_notify_counts_outstanding_rewards() {
        let h = Harness::new(0);
        let mut pool = h.duration(100);
        let alice = h.staker("alice", 1_000);
        pool.deposit(alice, 10).unwrap();
        h.fund(10_000);
        pool.notify_reward_amount(h.owner, 10_000).unwrap();

        // period over, 10_000 owed to alice and still in the pool
        h.clock.set(200).unwrap();
        let err = pool.notify_reward_amount(h.owner, 100).unwrap_err();
        assert!(matches!(
            err,
            AccrualError::InsufficientRewardBalance { available: 0, .. }
        ));

        h.fund(5_000);
        assert_eq!(pool.notify_reward_amount(h.owner, 5_000).unwrap(), 50);
        assert_eq!(pool.reward_reserve(), 5_000);
    }

    #[test]
    fn test_clock_regression_surfaces() {
        let h = Harness::new(5_000);
        let mut pool = h.fixed();
        let alice = h.staker("alice", 1_000);

        // a clock that has fallen behind the pool's genesis
        let stale: Arc<dyn Clock> = Arc::new(ManualClock::new(4_000));
        pool.clock = stale;

        assert_eq!(
            pool.deposit(alice, 1),
            Err(AccrualError::ClockRegression {
                last: 5_000,
                now: 4_000
            })
        );
    }

    #[test]
    fn test_staking_pool_trait_object() {
        let h = Harness::new(3_600);
        let mut pool: Box<dyn StakingPool> = Box::new(h.fixed());
        let alice = h.staker("alice", 1_000);
        h.fund(1_000);

        pool.deposit(alice, 50).unwrap();
        h.clock.set(3_605).unwrap();

        assert_eq!(pool.earned(&alice).unwrap(), 500);
        assert_eq!(pool.collect(alice).unwrap(), 500);
        assert_eq!(pool.drain_events().len(), 2);
        assert_eq!(pool.snapshot().total_paid, 500);
    }
}
