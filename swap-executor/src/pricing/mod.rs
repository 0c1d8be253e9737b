//! Constant-product pricing with an exact-integer slippage bound
//!
//! For a pool with reserves `(r_in, r_out)` and fee `f` (in basis points), an
//! input of `a` yields
//!     out = floor(a * (10000 - f) * r_out / (r_in * 10000 + a * (10000 - f)))
//! and the minimum accepted output under slippage `n/d` is
//!     min = floor(out * (d - n) / d)
//! Both are rounded down. All functions here are pure.

use alloy_primitives::U256;

use crate::{
    error::SwapError,
    types::{PairSnapshot, Route, SlippageTolerance, TradeQuote, BPS_DENOMINATOR},
};

use self::fixed_point::{checked_add, checked_mul, mul_div_down};

pub mod fixed_point;

/// Quote a trade through a single pool
pub fn quote(
    snapshot: &PairSnapshot,
    input_amount: U256,
    slippage: SlippageTolerance,
) -> Result<TradeQuote, SwapError> {
    quote_hops(std::slice::from_ref(snapshot), input_amount, slippage)
}

/// Quote a trade along a route, applying slippage once to the final output
pub fn quote_route(
    route: &Route,
    input_amount: U256,
    slippage: SlippageTolerance,
) -> Result<TradeQuote, SwapError> {
    quote_hops(route.hops(), input_amount, slippage)
}

/// Compute the output of a single constant-product swap, rounded down
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u16,
) -> Result<U256, SwapError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(SwapError::insufficient_liquidity("pool has a zero reserve"));
    }
    if u64::from(fee_bps) >= BPS_DENOMINATOR {
        return Err(SwapError::configuration(format!("fee of {fee_bps} bps is not below 100%")));
    }

    let fee_factor = U256::from(BPS_DENOMINATOR - u64::from(fee_bps));
    let amount_in_with_fee = checked_mul(amount_in, fee_factor)?;
    let denominator =
        checked_add(checked_mul(reserve_in, U256::from(BPS_DENOMINATOR))?, amount_in_with_fee)?;
    let amount_out = mul_div_down(amount_in_with_fee, reserve_out, denominator)?;

    if amount_out >= reserve_out {
        return Err(SwapError::insufficient_liquidity(format!(
            "output {amount_out} would drain reserve {reserve_out}"
        )));
    }

    Ok(amount_out)
}

/// Reduce an expected output by the slippage tolerance, rounded down
pub fn apply_slippage(
    expected_output: U256,
    slippage: SlippageTolerance,
) -> Result<U256, SwapError> {
    let retained = slippage.denominator() - slippage.numerator();
    let minimum = mul_div_down(
        expected_output,
        U256::from(retained),
        U256::from(slippage.denominator()),
    )?;

    Ok(minimum)
}

/// Chain the constant-product formula through each hop and bound the result
fn quote_hops(
    hops: &[PairSnapshot],
    input_amount: U256,
    slippage: SlippageTolerance,
) -> Result<TradeQuote, SwapError> {
    if input_amount.is_zero() {
        return Err(SwapError::configuration("input amount must be non-zero"));
    }

    let mut amount = input_amount;
    for hop in hops {
        if !hop.has_liquidity() {
            return Err(SwapError::insufficient_liquidity(format!(
                "pool {}/{} has a zero reserve",
                hop.token_a.label(),
                hop.token_b.label()
            )));
        }

        amount = get_amount_out(amount, hop.reserve_a, hop.reserve_b, hop.fee_bps)?;
    }

    // A zero expectation leaves the swap with no output protection at all
    if amount.is_zero() {
        return Err(SwapError::insufficient_liquidity(format!(
            "input of {input_amount} is too small to produce any output"
        )));
    }

    let minimum_output = apply_slippage(amount, slippage)?;
    Ok(TradeQuote::new(input_amount, amount, minimum_output))
}
