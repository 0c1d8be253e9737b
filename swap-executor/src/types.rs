//! Domain types shared across the pricing, building, and submission layers

use std::time::Duration;

use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::Serialize;

use crate::error::SwapError;

// -------------
// | Constants |
// -------------

/// The denominator for basis point quantities
pub const BPS_DENOMINATOR: u64 = 10_000;
/// The maximum number of pools a route may traverse
pub const MAX_ROUTE_HOPS: usize = 2;

// ----------
// | Tokens |
// ----------

/// An ERC20 token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token contract address
    pub address: Address,
    /// The number of decimals in the token's base unit
    pub decimals: u8,
    /// The token's symbol, informational only
    pub symbol: Option<String>,
}

impl Token {
    /// Constructor
    pub fn new(address: Address, decimals: u8, symbol: Option<String>) -> Self {
        Self { address, decimals, symbol }
    }

    /// A human readable label for the token
    pub fn label(&self) -> String {
        match &self.symbol {
            Some(symbol) => symbol.clone(),
            None => format!("{:#x}", self.address),
        }
    }

    /// Parse a decimal amount in human units into base units
    pub fn parse_amount(&self, amount: &str) -> Result<U256, SwapError> {
        match parse_units(amount, self.decimals).map_err(SwapError::configuration)? {
            ParseUnits::U256(value) => Ok(value),
            ParseUnits::I256(_) => {
                Err(SwapError::configuration(format!("amount must not be negative: {amount}")))
            },
        }
    }

    /// Render an amount in base units as human units
    pub fn format_amount(&self, amount: U256) -> String {
        format_units(amount, self.decimals).unwrap_or_else(|_| amount.to_string())
    }
}

// ---------
// | Pools |
// ---------

/// An immutable view of a constant-product pool, oriented so that `token_a`
/// is the token sold into the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSnapshot {
    /// The token sold into the pool
    pub token_a: Token,
    /// The token bought from the pool
    pub token_b: Token,
    /// The pool's reserve of `token_a`
    pub reserve_a: U256,
    /// The pool's reserve of `token_b`
    pub reserve_b: U256,
    /// The pool fee in basis points, charged on the input side
    pub fee_bps: u16,
}

impl PairSnapshot {
    /// Whether both reserves are non-zero
    pub fn has_liquidity(&self) -> bool {
        !self.reserve_a.is_zero() && !self.reserve_b.is_zero()
    }
}

/// An ordered sequence of one or two pools through which a swap is routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The pools, in trade order
    hops: Vec<PairSnapshot>,
}

impl Route {
    /// Build a route, checking that the hops chain into one another
    pub fn new(hops: Vec<PairSnapshot>) -> Result<Self, SwapError> {
        if hops.is_empty() || hops.len() > MAX_ROUTE_HOPS {
            return Err(SwapError::configuration(format!(
                "route must have between 1 and {MAX_ROUTE_HOPS} hops, got {}",
                hops.len()
            )));
        }

        for hop in &hops {
            if hop.token_a.address == hop.token_b.address {
                return Err(SwapError::configuration(format!(
                    "hop trades {} against itself",
                    hop.token_a.label()
                )));
            }
        }

        for pair in hops.windows(2) {
            if pair[0].token_b.address != pair[1].token_a.address {
                return Err(SwapError::configuration(format!(
                    "hop output {} does not match next hop input {}",
                    pair[0].token_b.label(),
                    pair[1].token_a.label()
                )));
            }
        }

        Ok(Self { hops })
    }

    /// A route through a single pool
    pub fn direct(pair: PairSnapshot) -> Result<Self, SwapError> {
        Self::new(vec![pair])
    }

    /// The pools in trade order
    pub fn hops(&self) -> &[PairSnapshot] {
        &self.hops
    }

    /// The token sold
    pub fn input_token(&self) -> &Token {
        &self.hops[0].token_a
    }

    /// The token bought
    pub fn output_token(&self) -> &Token {
        &self.hops[self.hops.len() - 1].token_b
    }

    /// The router path: the input token followed by each hop's output token
    pub fn path(&self) -> Vec<Address> {
        let mut path = vec![self.input_token().address];
        path.extend(self.hops.iter().map(|hop| hop.token_b.address));
        path
    }
}

// ----------
// | Quotes |
// ----------

/// A slippage tolerance expressed as an exact fraction in `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlippageTolerance {
    /// The numerator of the fraction
    numerator: u64,
    /// The denominator of the fraction, always non-zero
    denominator: u64,
}

impl SlippageTolerance {
    /// Construct a tolerance from a fraction
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, SwapError> {
        if denominator == 0 {
            return Err(SwapError::configuration("slippage denominator must be non-zero"));
        }
        if numerator >= denominator {
            return Err(SwapError::configuration(format!(
                "slippage must be below 100%, got {numerator}/{denominator}"
            )));
        }

        Ok(Self { numerator, denominator })
    }

    /// Construct a tolerance from basis points
    pub fn from_bps(bps: u64) -> Result<Self, SwapError> {
        Self::new(bps, BPS_DENOMINATOR)
    }

    /// A zero tolerance
    pub fn zero() -> Self {
        Self { numerator: 0, denominator: 1 }
    }

    /// The numerator of the fraction
    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    /// The denominator of the fraction
    pub fn denominator(&self) -> u64 {
        self.denominator
    }
}

/// A priced trade, derived once from a route and a slippage tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeQuote {
    /// The amount of the input token sold
    input_amount: U256,
    /// The output the pool would give at the snapshot reserves
    expected_output: U256,
    /// The least output the swap may settle for
    minimum_output: U256,
}

impl TradeQuote {
    /// Constructor, only reachable from the pricing module so that the
    /// minimum never exceeds the expectation
    pub(crate) fn new(input_amount: U256, expected_output: U256, minimum_output: U256) -> Self {
        debug_assert!(minimum_output <= expected_output);
        Self { input_amount, expected_output, minimum_output }
    }

    /// The amount of the input token sold
    pub fn input_amount(&self) -> U256 {
        self.input_amount
    }

    /// The output the pool would give at the snapshot reserves
    pub fn expected_output(&self) -> U256 {
        self.expected_output
    }

    /// The least output the swap may settle for
    pub fn minimum_output(&self) -> U256 {
        self.minimum_output
    }
}

/// An absolute unix timestamp after which the swap must not execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Deadline(u64);

impl Deadline {
    /// A deadline `window_secs` after `now`
    pub fn from_window(now: u64, window_secs: u64) -> Result<Self, SwapError> {
        now.checked_add(window_secs)
            .map(Self)
            .ok_or_else(|| SwapError::configuration("deadline window overflows"))
    }

    /// The deadline as a unix timestamp
    pub fn timestamp(&self) -> u64 {
        self.0
    }

    /// Whether the deadline has passed at `now`
    pub fn has_expired(&self, now: u64) -> bool {
        now >= self.0
    }

    /// The time left before the deadline at `now`, zero once it has passed
    pub fn remaining(&self, now: u64) -> Duration {
        Duration::from_secs(self.0.saturating_sub(now))
    }
}

// ----------------
// | Transactions |
// ----------------

/// An unsigned contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescription {
    /// The contract called
    pub target: Address,
    /// The ABI encoded calldata
    pub payload: Bytes,
    /// The native currency sent with the call
    pub value: U256,
}

impl CallDescription {
    /// A call that sends no native currency
    pub fn new(target: Address, payload: Bytes) -> Self {
        Self { target, payload, value: U256::ZERO }
    }
}

/// A call together with the gas parameters and nonce needed to sign it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    /// The call to execute
    pub call: CallDescription,
    /// The sending account
    pub sender: Address,
    /// The gas limit, taken from estimation
    pub gas_limit: u64,
    /// The gas price in wei
    pub gas_price: u128,
    /// The sender's next nonce
    pub nonce: u64,
}

/// A receipt for a transaction that executed successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedReceipt {
    /// The transaction hash
    pub tx_hash: TxHash,
    /// The block in which the transaction was included
    pub block_number: Option<u64>,
    /// The gas consumed by the transaction
    pub gas_used: u64,
}
