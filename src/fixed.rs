// 2.0: fixed-point arithmetic with caller-directed rounding. all engine
// quantities carry 18 fractional digits; whenever a product or quotient is
// inexact at that scale the caller picks which way the last tick falls, so
// curve math can always leave the remainder with the pool.
//
// _dn rounds toward zero, _up rounds away from zero. all ops are checked:
// overflow and division by zero come back as MathError, never a wrapped value.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

pub const DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Smallest representable quantity: 10^-18.
pub fn tick() -> Decimal {
    Decimal::new(1, DECIMALS)
}

pub fn mul_dn(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero))
}

pub fn mul_up(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product.round_dp_with_strategy(DECIMALS, RoundingStrategy::AwayFromZero))
}

pub fn div_dn(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    Ok(quotient.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero))
}

/// Division rounding the magnitude up by one tick when inexact. The extra
/// tick is what keeps an inexact reserve quotient on the pool's side.
pub fn div_up(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(MathError::Overflow)?;
    let truncated = quotient.round_dp_with_strategy(DECIMALS, RoundingStrategy::ToZero);
    let exact = truncated
        .checked_mul(b)
        .map(|back| back == a)
        .unwrap_or(false);
    if exact {
        Ok(truncated)
    } else if truncated.is_sign_negative() || (truncated.is_zero() && a.is_sign_negative()) {
        truncated.checked_sub(tick()).ok_or(MathError::Overflow)
    } else {
        truncated.checked_add(tick()).ok_or(MathError::Overflow)
    }
}

pub fn checked_add(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}
