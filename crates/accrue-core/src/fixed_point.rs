//! # Fixed-Point Reward Math
//!
//! Reward-per-share values are stored as unsigned 256-bit integers scaled by
//! `2^bits`. Every product is formed in a 512-bit intermediate before the
//! division, so `rate × elapsed × SCALE` never overflows for any `u128` rate.
//!
//! ```text
//! Δacc  = rate × elapsed × SCALE / total_staked
//! owed  = Δacc × staked / SCALE            (truncated toward zero)
//! ```
//!
//! Truncation always rounds in the pool's favor: a staker can receive less
//! than their exact share (dust) but never more.

use crate::error::AccrualError;
use crate::types::Amount;
use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Power-of-two scale factor for the reward-per-share accumulator
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FixedPointScale {
    bits: u32,
}

impl FixedPointScale {
    /// `2^96`
    pub const Q96: Self = Self { bits: 96 };

    /// `2^128`
    pub const Q128: Self = Self { bits: 128 };

    /// Largest supported exponent
    pub const MAX_BITS: u32 = 128;

    /// Scale of `2^bits`, for `bits` in `1..=128`
    pub fn new(bits: u32) -> Result<Self, AccrualError> {
        if bits == 0 || bits > Self::MAX_BITS {
            return Err(AccrualError::InvalidScale { bits });
        }
        Ok(Self { bits })
    }

    /// Exponent of the scale
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The scale as an integer, `2^bits`
    pub fn one(&self) -> U256 {
        let mut limbs = [0u64; 4];
        limbs[(self.bits / 64) as usize] = 1u64 << (self.bits % 64);
        U256(limbs)
    }

    /// Accumulator increment for `elapsed` seconds at `rate` spread over `total_staked`.
    ///
    /// Zero stake yields zero: time that passes with nobody staked is not
    /// credited to anyone later.
    pub fn accrue_delta(
        &self,
        rate: Amount,
        elapsed: u64,
        total_staked: Amount,
    ) -> Result<U256, AccrualError> {
        if total_staked == 0 || rate == 0 || elapsed == 0 {
            return Ok(U256::zero());
        }
        let emitted = U256::from(rate)
            .checked_mul(U256::from(elapsed))
            .ok_or(AccrualError::MathOverflow)?;
        mul_div(emitted, self.one(), U256::from(total_staked))
    }

    /// Reward owed for holding `staked` units while the accumulator moved by `delta`
    pub fn settle_owed(&self, delta: U256, staked: Amount) -> Result<Amount, AccrualError> {
        if delta.is_zero() || staked == 0 {
            return Ok(0);
        }
        let owed = mul_div(delta, U256::from(staked), self.one())?;
        to_amount(owed)
    }
}

impl Default for FixedPointScale {
    fn default() -> Self {
        Self::Q128
    }
}

impl TryFrom<u32> for FixedPointScale {
    type Error = AccrualError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl From<FixedPointScale> for u32 {
    fn from(scale: FixedPointScale) -> Self {
        scale.bits
    }
}

impl fmt::Debug for FixedPointScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.bits)
    }
}

/// `a × b / d` with a 512-bit intermediate, truncating toward zero
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, AccrualError> {
    if d.is_zero() {
        return Err(AccrualError::DivisionByZero);
    }
    let quotient = a.full_mul(b) / widen(d);
    if quotient.bits() > 256 {
        return Err(AccrualError::MathOverflow);
    }
    let U512(limbs) = quotient;
    Ok(U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

fn widen(value: U256) -> U512 {
    let U256(limbs) = value;
    U512([limbs[0], limbs[1], limbs[2], limbs[3], 0, 0, 0, 0])
}

/// Narrow a 256-bit value to an [`Amount`]
pub fn to_amount(value: U256) -> Result<Amount, AccrualError> {
    if value.bits() > 128 {
        return Err(AccrualError::MathOverflow);
    }
    Ok(value.low_u128())
}
