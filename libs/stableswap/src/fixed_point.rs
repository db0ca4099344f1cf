//! Fixed-point integer primitives for on-chain compatible curve math
//!
//! All curve math runs on unsigned 256-bit integers with truncating division,
//! mirroring EVM/Vyper arithmetic. No floating point is used anywhere, so
//! results are bit-exact against an on-chain counterpart.
//!
//! ## Design Principles
//!
//! - **Checked**: every add/sub/mul/div reports overflow or a zero divisor
//!   as a [`StableSwapError`] instead of wrapping or panicking
//! - **Truncating**: division rounds toward zero, exactly like the contract
//! - **Explicit scale**: normalization takes its rates and precision as
//!   arguments; there is no global scale constant

use crate::errors::{Result, StableSwapError};
use ethereum_types::U256;

/// `a + b`
#[inline]
pub fn add(a: U256, b: U256, context: &'static str) -> Result<U256> {
    a.checked_add(b)
        .ok_or(StableSwapError::Overflow { context })
}

/// `a - b`, underflow is an invalid state rather than an overflow
#[inline]
pub fn sub(a: U256, b: U256, context: &'static str) -> Result<U256> {
    a.checked_sub(b)
        .ok_or(StableSwapError::ArithmeticInvalidState { context })
}

/// `a * b`
#[inline]
pub fn mul(a: U256, b: U256, context: &'static str) -> Result<U256> {
    a.checked_mul(b)
        .ok_or(StableSwapError::Overflow { context })
}

/// `a / b`, truncating toward zero
#[inline]
pub fn div(a: U256, b: U256, context: &'static str) -> Result<U256> {
    if b.is_zero() {
        return Err(StableSwapError::DivisionByZero { context });
    }
    Ok(a / b)
}

/// `a * b / c` with the product held at full 256-bit width
#[inline]
pub fn mul_div(a: U256, b: U256, c: U256, context: &'static str) -> Result<U256> {
    div(mul(a, b, context)?, c, context)
}

/// `|a - b|`
#[inline]
pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Sum of a slice, checked
pub fn sum(values: &[U256], context: &'static str) -> Result<U256> {
    values
        .iter()
        .try_fold(U256::zero(), |acc, &v| add(acc, v, context))
}

/// Narrow a 256-bit value back into raw `u128` token units
pub fn to_u128(value: U256, context: &'static str) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(StableSwapError::Overflow { context });
    }
    Ok(value.low_u128())
}

/// Normalize one raw balance: `rate * balance / precision`
///
/// A zero rate or zero balance normalizes to zero.
pub fn normalize_amount(balance: u128, rate: u128, precision: u128) -> Result<U256> {
    if rate == 0 || balance == 0 {
        return Ok(U256::zero());
    }
    mul_div(
        U256::from(rate),
        U256::from(balance),
        U256::from(precision),
        "balance normalization",
    )
}

/// Normalize every balance of a pool into the common precision (`xp`)
pub fn normalize(balances: &[u128], rates: &[u128], precision: u128) -> Result<Vec<U256>> {
    if balances.len() != rates.len() {
        return Err(StableSwapError::precondition(format!(
            "{} balances but {} rates",
            balances.len(),
            rates.len()
        )));
    }
    balances
        .iter()
        .zip(rates)
        .map(|(&balance, &rate)| normalize_amount(balance, rate, precision))
        .collect()
}

/// Convert a normalized amount back to raw units of an asset, truncating
pub fn denormalize_amount(amount: U256, rate: u128, precision: u128) -> Result<u128> {
    let raw = mul_div(
        amount,
        U256::from(precision),
        U256::from(rate),
        "amount denormalization",
    )?;
    to_u128(raw, "amount denormalization")
}
