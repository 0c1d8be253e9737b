//! Overflow-checked integer helpers for the pricing math
use alloy_primitives::U256;

/// An error in fixed point arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FixedPointError {
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
    /// An intermediate value exceeded 256 bits
    #[error("arithmetic overflow")]
    Overflow,
}

/// Returns x * y / denominator, rounded down
pub fn mul_div_down(x: U256, y: U256, denominator: U256) -> Result<U256, FixedPointError> {
    if denominator.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }

    let product = x.checked_mul(y).ok_or(FixedPointError::Overflow)?;
    Ok(product / denominator)
}

/// Returns x * y, failing on overflow
pub fn checked_mul(x: U256, y: U256) -> Result<U256, FixedPointError> {
    x.checked_mul(y).ok_or(FixedPointError::Overflow)
}

/// Returns x + y, failing on overflow
pub fn checked_add(x: U256, y: U256) -> Result<U256, FixedPointError> {
    x.checked_add(y).ok_or(FixedPointError::Overflow)
}
