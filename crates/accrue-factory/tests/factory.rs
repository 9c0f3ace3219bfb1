//! Integration tests for the pool factory
//!
//! Deploy several pools, arm them in one batch, and check that a failed batch
//! leaves every pool and the ledger untouched.

use accrue_core::prelude::*;
use accrue_factory::{FactoryConfig, FactoryError, FactoryEvent, PoolFactory};
use proptest::prelude::*;
use std::sync::Arc;

struct Deployment {
    factory: PoolFactory,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<ManualClock>,
    owner: Address,
    tokens: Vec<TokenId>,
}

fn deployment(genesis: Timestamp, config: FactoryConfig, amounts: &[Amount]) -> Deployment {
    let ledger = Arc::new(InMemoryLedger::new());
    let clock = Arc::new(ManualClock::new(0));
    let owner = Address::from_label("owner");
    let mut factory = PoolFactory::new(
        Address::from_label("factory"),
        TokenId::from_label("reward"),
        FactoryConfig { genesis, ..config },
        ledger.clone(),
        clock.clone(),
        Arc::new(SingleOwner(owner)),
    )
    .unwrap();

    let tokens: Vec<TokenId> = (0..amounts.len())
        .map(|i| TokenId::from_label(&format!("lp-{i}")))
        .collect();
    for (token, amount) in tokens.iter().zip(amounts) {
        factory.deploy(owner, *token, *amount).unwrap();
    }

    Deployment {
        factory,
        ledger,
        clock,
        owner,
        tokens,
    }
}

impl Deployment {
    fn fund_factory(&self, amount: Amount) {
        self.ledger
            .mint(&self.factory.reward_token(), &self.factory.address(), amount)
            .unwrap();
    }
}

mod lifecycle_tests {
    use super::*;

    #[test]
    fn test_four_pools_funded_in_order() {
        let d = deployment(1_000, FactoryConfig::new(0), &[10, 10, 10, 10]);
        let mut factory = d.factory;
        d.ledger
            .mint(&factory.reward_token(), &factory.address(), 40)
            .unwrap();

        d.clock.set(1_000).unwrap();
        assert_eq!(factory.notify_reward_amounts().unwrap(), 40);

        let history = d.ledger.history();
        assert_eq!(history.len(), 4);
        for (record, token) in history.iter().zip(&d.tokens) {
            let pool = factory.pool(token).unwrap();
            let pool = pool.lock();
            assert_eq!(record.from, factory.address());
            assert_eq!(record.to, pool.address());
            assert_eq!(record.amount, 10);
            assert_eq!(pool.period_start(), 1_000);
            assert_eq!(pool.period_finish(), 1_000 + 5_184_000);
        }
        assert_eq!(
            d.ledger
                .balance_of(&factory.reward_token(), &factory.address()),
            0
        );
        assert!(matches!(
            factory.events().last(),
            Some(FactoryEvent::RewardsNotified {
                pools: 4,
                total: 40,
                at: 1_000
            })
        ));
    }

    #[test]
    fn test_second_notify_rejected() {
        let d = deployment(0, FactoryConfig::new(0), &[10, 10]);
        d.fund_factory(100);
        let mut factory = d.factory;

        factory.notify_reward_amounts().unwrap();

        assert_eq!(
            factory.notify_reward_amounts().unwrap_err(),
            FactoryError::AlreadyNotified
        );
        assert_eq!(d.ledger.history().len(), 2);
        assert_eq!(
            d.ledger
                .balance_of(&factory.reward_token(), &factory.address()),
            80
        );
    }

    #[test]
    fn test_genesis_gates_notify() {
        let d = deployment(1_000, FactoryConfig::new(0), &[10]);
        d.fund_factory(10);
        let mut factory = d.factory;

        d.clock.set(999).unwrap();
        assert_eq!(
            factory.notify_reward_amounts().unwrap_err(),
            FactoryError::NotReady {
                genesis: 1_000,
                now: 999
            }
        );
        assert!(!factory.is_notified());

        d.clock.set(1_000).unwrap();
        assert!(factory.notify_reward_amounts().is_ok());
    }

    #[test]
    fn test_underfunded_batch_funds_nobody() {
        let d = deployment(0, FactoryConfig::new(0), &[10, 10, 10, 10]);
        d.fund_factory(39);
        let mut factory = d.factory;

        let err = factory.notify_reward_amounts().unwrap_err();

        assert_eq!(
            err,
            FactoryError::Pool(AccrualError::InsufficientRewardBalance {
                required: 40,
                available: 39
            })
        );
        assert!(d.ledger.history().is_empty());
        assert!(!factory.is_notified());
        for token in &d.tokens {
            let pool = factory.pool(token).unwrap();
            assert_eq!(pool.lock().period_finish(), 0);
        }
    }

    #[test]
    fn test_deploy_closed_after_notify() {
        let d = deployment(0, FactoryConfig::new(0), &[10]);
        d.fund_factory(20);
        let owner = d.owner;
        let mut factory = d.factory;
        factory.notify_reward_amounts().unwrap();

        let late = TokenId::from_label("late");
        assert!(matches!(
            factory.deploy(owner, late, 10),
            Err(FactoryError::AlreadyNotified)
        ));
        assert!(factory.pool(&late).is_none());
        assert_eq!(factory.staking_tokens(), d.tokens);
        assert_eq!(
            d.ledger
                .balance_of(&factory.reward_token(), &factory.address()),
            10
        );
    }
}

mod accrual_tests {
    use super::*;

    #[test]
    fn test_stakers_earn_only_after_arming() {
        let config = FactoryConfig {
            rewards_duration: 10,
            ..FactoryConfig::new(0)
        };
        let d = deployment(100, config, &[100, 200]);
        d.fund_factory(300);
        let mut factory = d.factory;

        let stakers: Vec<Address> = d
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let staker = Address::from_label(&format!("staker-{i}"));
                let pool = factory.pool(token).unwrap();
                let pool_address = pool.lock().address();
                d.ledger.mint(token, &staker, 50).unwrap();
                d.ledger.approve(token, &staker, &pool_address, 50);
                pool.lock().deposit(staker, 50).unwrap();
                staker
            })
            .collect();

        d.clock.set(50).unwrap();
        for (token, staker) in d.tokens.iter().zip(&stakers) {
            assert_eq!(factory.pool(token).unwrap().lock().earned(staker).unwrap(), 0);
        }

        d.clock.set(100).unwrap();
        factory.notify_reward_amounts().unwrap();

        d.clock.set(200).unwrap();
        let paid: Vec<Amount> = d
            .tokens
            .iter()
            .zip(&stakers)
            .map(|(token, staker)| factory.pool(token).unwrap().lock().collect(*staker).unwrap())
            .collect();

        assert_eq!(paid, vec![100, 200]);
        for token in &d.tokens {
            let address = factory.pool(token).unwrap().lock().address();
            assert_eq!(d.ledger.balance_of(&factory.reward_token(), &address), 0);
        }
    }
}

proptest! {
    #[test]
    fn batch_is_all_or_nothing(
        amounts in prop::collection::vec(1..1_000u128, 1..8),
        shortfall in 0..50u128,
        surplus in 0..50u128,
    ) {
        let total: Amount = amounts.iter().sum();
        let balance = (total + surplus).saturating_sub(shortfall);
        let d = deployment(0, FactoryConfig::new(0), &amounts);
        d.fund_factory(balance);
        let mut factory = d.factory;

        let result = factory.notify_reward_amounts();

        if balance >= total {
            prop_assert_eq!(result, Ok(total));
            prop_assert_eq!(d.ledger.history().len(), amounts.len());
            for (token, amount) in d.tokens.iter().zip(&amounts) {
                let address = factory.pool(token).unwrap().lock().address();
                prop_assert_eq!(
                    d.ledger.balance_of(&factory.reward_token(), &address),
                    *amount
                );
            }
        } else {
            prop_assert!(result.is_err());
            prop_assert!(d.ledger.history().is_empty());
            prop_assert!(!factory.is_notified());
        }
    }
}
