//! Factory lifecycle errors

use accrue_core::{AccrualError, Address, LedgerError, Timestamp, TokenId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FactoryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    #[error("Pool already deployed for staking token {0}")]
    AlreadyDeployed(TokenId),

    #[error("Rewards already notified")]
    AlreadyNotified,

    #[error("Not ready: genesis at {genesis}, now {now}")]
    NotReady { genesis: Timestamp, now: Timestamp },

    #[error("No pools deployed")]
    NoPoolsDeployed,

    #[error("Invalid amount: reward amount must be greater than zero")]
    InvalidAmount,

    #[error("Pool error: {0}")]
    Pool(#[from] AccrualError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl FactoryError {
    /// Stable numeric code for API/CLI reporting
    pub fn code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 3001,
            Self::AlreadyDeployed(_) => 3002,
            Self::AlreadyNotified => 3003,
            Self::NotReady { .. } => 3004,
            Self::NoPoolsDeployed => 3005,
            Self::InvalidAmount => 3006,
            Self::Pool(inner) => inner.code(),
            Self::Ledger(_) => 3009,
        }
    }
}
