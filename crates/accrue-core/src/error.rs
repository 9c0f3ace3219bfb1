//! Error types for Accrue pool operations

use crate::ledger::LedgerError;
use crate::types::{Address, Amount, Timestamp};
use thiserror::Error;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, AccrualError>;

/// Errors raised by reward accrual, settlement and funding.
///
/// Every failed operation leaves pool and staker state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccrualError {
    // === Amount validation ===
    /// Zero or otherwise unusable deposit/withdraw/funding amount
    #[error("Invalid amount: must be greater than zero")]
    InvalidAmount,

    /// Withdraw exceeds the staker's position
    #[error("Insufficient stake: requested {requested}, staked {staked}")]
    InsufficientStake { requested: Amount, staked: Amount },

    // === Funding / payout ===
    /// Funding would promise more reward than the pool escrows
    #[error("Insufficient reward balance: need {required}, available {available}")]
    InsufficientRewardBalance { required: Amount, available: Amount },

    /// Pool holds fewer reward tokens than the staker is owed
    #[error("Insufficient reward reserve: owed {owed}, held {available}")]
    InsufficientRewardReserve { owed: Amount, available: Amount },

    // === Access ===
    /// Caller lacks the distributor capability
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    // === Time ===
    /// Clock reading earlier than the last settlement
    #[error("Clock regression: last settled at {last}, now {now}")]
    ClockRegression { last: Timestamp, now: Timestamp },

    /// Emission window with `finish < start`
    #[error("Invalid emission window: start {start}, finish {finish}")]
    InvalidWindow { start: Timestamp, finish: Timestamp },

    /// Rewards duration of zero seconds
    #[error("Rewards duration must be greater than zero")]
    InvalidDuration,

    // === Arithmetic ===
    /// Fixed-point exponent out of range
    #[error("Invalid fixed-point scale: 2^{bits}")]
    InvalidScale { bits: u32 },

    #[error("Math overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    // === Collaborators ===
    /// Token ledger refused a transfer
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl AccrualError {
    /// Stable numeric code for API and CLI reporting
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidAmount => 2001,
            Self::InsufficientStake { .. } => 2002,
            Self::InsufficientRewardBalance { .. } => 2003,
            Self::InsufficientRewardReserve { .. } => 2004,
            Self::Unauthorized(_) => 2005,
            Self::ClockRegression { .. } => 2006,
            Self::InvalidWindow { .. } | Self::InvalidDuration | Self::InvalidScale { .. } => 2007,
            Self::MathOverflow | Self::DivisionByZero => 2008,
            Self::Ledger(_) => 2009,
        }
    }

    /// Whether the same call may succeed later without a configuration change
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientRewardBalance { .. }
                | Self::InsufficientRewardReserve { .. }
                | Self::Ledger(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AccrualError::InvalidAmount.code(), 2001);
        let err = AccrualError::InsufficientStake {
            requested: 10,
            staked: 5,
        };
        assert_eq!(err.code(), 2002);
        assert_eq!(AccrualError::from(LedgerError::InsufficientBalance {
            needed: 1,
            available: 0,
        })
        .code(), 2009);
    }

    #[test]
    fn test_error_display() {
        let err = AccrualError::InsufficientStake {
            requested: 10,
            staked: 5,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("requested 10"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AccrualError::InsufficientRewardReserve {
            owed: 10,
            available: 0
        }
        .is_recoverable());
        assert!(!AccrualError::InvalidAmount.is_recoverable());
    }
}
