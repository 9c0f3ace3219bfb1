//! # Accrue Core
//!
//! Building blocks shared by the Accrue reward-pool crates:
//!
//! - `FixedPointScale` - scaled reward-per-share math with a 512-bit intermediate
//! - `Address` / `TokenId` - 32-byte identifiers with hex encoding
//! - `TokenLedger` - the fungible-token collaborator (balance, transfer, transferFrom)
//! - `Clock` - read-only time source; `ManualClock` for harnesses
//! - `AccessControl` - distributor/owner capability check
//! - `AccrualError` - the pool error taxonomy
//!
//! ```text
//!     staker ──deposit──►  ┌──────────────┐  ◄──notify── distributor
//!                          │  RewardPool  │
//!     staker ◄──collect──  └──────┬───────┘
//!                                 │ transfer / transferFrom
//!                          ┌──────▼───────┐
//!                          │ TokenLedger  │
//!                          └──────────────┘
//! ```

pub mod access;
pub mod clock;
pub mod error;
pub mod fixed_point;
pub mod ledger;
pub mod serde_amount;
pub mod types;

pub use access::*;
pub use clock::*;
pub use error::*;
pub use fixed_point::*;
pub use ledger::*;
pub use types::*;

/// Re-exported wide integer used for accumulator values
pub use primitive_types::U256;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::access::{AccessControl, AllowList, SingleOwner};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{AccrualError, Result};
    pub use crate::fixed_point::FixedPointScale;
    pub use crate::ledger::{InMemoryLedger, LedgerError, TokenLedger};
    pub use crate::types::{Address, Amount, Timestamp, TokenId};
    pub use primitive_types::U256;
}
