//! # Token Ledger
//!
//! The fungible-token collaborator consumed by reward pools: the staking
//! asset and the reward token both live here. Pools only ever call the
//! [`TokenLedger`] trait, so any conventional balance ledger can back them.
//!
//! [`InMemoryLedger`] is the reference implementation used by the scenario
//! runner and the test suites.

use crate::types::{Address, Amount, TokenId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ledger failures. Always loud: a ledger never reports success for a
/// transfer it did not perform.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    #[error("Insufficient allowance: needed {needed}, approved {approved}")]
    InsufficientAllowance { needed: Amount, approved: Amount },

    #[error("Balance overflow")]
    Overflow,
}

/// Conventional transferable-balance ledger
pub trait TokenLedger: Send + Sync {
    /// Balance of `account` in `token`
    fn balance_of(&self, token: &TokenId, account: &Address) -> Amount;

    /// Move `amount` from `from` to `to`, authorized by `from` itself
    fn transfer(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance
    fn transfer_from(
        &self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Let `spender` move up to `amount` of `owner`'s tokens
    fn approve(&self, token: &TokenId, owner: &Address, spender: &Address, amount: Amount);

    /// Remaining allowance of `spender` over `owner`'s tokens
    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount;
}

/// One completed transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(TokenId, Address), Amount>,
    allowances: HashMap<(TokenId, Address, Address), Amount>,
    history: Vec<TransferRecord>,
}

impl LedgerState {
    fn balance(&self, token: &TokenId, account: &Address) -> Amount {
        self.balances.get(&(*token, *account)).copied().unwrap_or(0)
    }

    /// Validates both sides before touching either balance
    fn move_balance(
        &mut self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from != to {
            let credited = self
                .balance(token, to)
                .checked_add(amount)
                .ok_or(LedgerError::Overflow)?;
            self.balances.insert((*token, *from), available - amount);
            self.balances.insert((*token, *to), credited);
        }
        tracing::trace!("Transfer {} of {} from {} to {}", amount, token, from, to);
        self.history.push(TransferRecord {
            token: *token,
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }
}

/// Thread-safe in-memory [`TokenLedger`]. `Amount::MAX` allowances are unlimited.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens in `account`
    pub fn mint(&self, token: &TokenId, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let balance = state
            .balance(token, account)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        state.balances.insert((*token, *account), balance);
        Ok(())
    }

    /// Every transfer performed so far, in order
    pub fn history(&self) -> Vec<TransferRecord> {
        self.state.read().history.clone()
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: &TokenId, account: &Address) -> Amount {
        self.state.read().balance(token, account)
    }

    fn transfer(
        &self,
        token: &TokenId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.state.write().move_balance(token, from, to, amount)
    }

    fn transfer_from(
        &self,
        token: &TokenId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let key = (*token, *from, *spender);
        let approved = state.allowances.get(&key).copied().unwrap_or(0);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                needed: amount,
                approved,
            });
        }
        state.move_balance(token, from, to, amount)?;
        if approved != Amount::MAX {
            state.allowances.insert(key, approved - amount);
        }
        Ok(())
    }

    fn approve(&self, token: &TokenId, owner: &Address, spender: &Address, amount: Amount) {
        self.state
            .write()
            .allowances
            .insert((*token, *owner, *spender), amount);
    }

    fn allowance(&self, token: &TokenId, owner: &Address, spender: &Address) -> Amount {
        self.state
            .read()
            .allowances
            .get(&(*token, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }
}
