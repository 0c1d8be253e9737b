//! The CLI for the swap executor

use std::{str::FromStr, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::Address;
use clap::Parser;

use crate::{
    error::SwapError,
    types::{SlippageTolerance, BPS_DENOMINATOR},
};

/// Sell an exact amount of one ERC20 token for another through a
/// constant-product router
#[rustfmt::skip]
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // --- Chain --- //
    /// The RPC URL of the node to trade through
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: String,
    /// The private key of the trading account
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
    /// The chain id to sign for, fetched from the node if omitted
    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    // --- Trade --- //
    /// The address of the token to sell
    #[arg(long, env = "TOKEN_IN")]
    pub token_in: String,
    /// The address of the token to buy
    #[arg(long, env = "TOKEN_OUT")]
    pub token_out: String,
    /// An intermediate token to route through, for a two-pool trade
    #[arg(long, env = "VIA_TOKEN")]
    pub via_token: Option<String>,
    /// The amount of the input token to sell, in human units (e.g. "1.5")
    #[arg(long, env = "AMOUNT_IN")]
    pub amount_in: String,
    /// The account that receives the output token, defaults to the sender
    #[arg(long, env = "RECIPIENT")]
    pub recipient: Option<String>,

    // --- Router --- //
    /// The address of the router contract
    #[arg(long, env = "ROUTER_ADDRESS")]
    pub router_address: String,
    /// The pool fee in basis points
    #[arg(long, env = "FEE_BPS", default_value_t = 25)]
    pub fee_bps: u16,

    // --- Execution --- //
    /// The tolerated shortfall from the quoted output, in basis points
    #[arg(long, env = "SLIPPAGE_BPS", default_value_t = 50)]
    pub slippage_bps: u64,
    /// The number of seconds from the start of the run until the swap expires
    #[arg(long, env = "DEADLINE_SECS", default_value_t = 1200)]
    pub deadline_secs: u64,
    /// The interval at which to poll for transaction receipts
    #[arg(long, env = "RECEIPT_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub receipt_poll_interval_ms: u64,

    // --- Telemetry --- //
    /// Whether to emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

/// A validated swap configuration
#[derive(Clone)]
pub struct SwapConfig {
    /// The RPC URL of the node
    pub rpc_url: String,
    /// The trading account's key
    pub signer: PrivateKeySigner,
    /// The chain id to sign for, if given
    pub chain_id: Option<u64>,
    /// The token sold
    pub token_in: Address,
    /// The token bought
    pub token_out: Address,
    /// The intermediate token of a two-pool route
    pub via_token: Option<Address>,
    /// The amount sold, in human units
    pub amount_in: String,
    /// The output recipient
    pub recipient: Address,
    /// The router contract
    pub router: Address,
    /// The pool fee in basis points
    pub fee_bps: u16,
    /// The slippage tolerance
    pub slippage: SlippageTolerance,
    /// The deadline window in seconds
    pub deadline_window_secs: u64,
    /// The receipt polling interval
    pub receipt_poll_interval: Duration,
}

impl Cli {
    /// Check the arguments without touching the network
    pub fn validate(&self) -> Result<(), SwapError> {
        self.clone().into_config().map(|_| ())
    }

    /// Validate the arguments and convert them into a swap configuration
    pub fn into_config(self) -> Result<SwapConfig, SwapError> {
        if self.rpc_url.trim().is_empty() {
            return Err(SwapError::configuration("rpc url must not be empty"));
        }
        let signer = PrivateKeySigner::from_str(self.private_key.trim())
            .map_err(|_| SwapError::configuration("private key is malformed"))?;

        let token_in = parse_address("token-in", &self.token_in)?;
        let token_out = parse_address("token-out", &self.token_out)?;
        let router = parse_address("router-address", &self.router_address)?;
        let via_token =
            self.via_token.as_deref().map(|via| parse_address("via-token", via)).transpose()?;
        let recipient = match self.recipient.as_deref() {
            Some(recipient) => parse_address("recipient", recipient)?,
            None => signer.address(),
        };

        if token_in == token_out {
            return Err(SwapError::configuration("token-in and token-out must differ"));
        }
        if via_token.is_some_and(|via| via == token_in || via == token_out) {
            return Err(SwapError::configuration("via-token must differ from both trade tokens"));
        }

        validate_amount(&self.amount_in)?;
        if u64::from(self.fee_bps) >= BPS_DENOMINATOR {
            return Err(SwapError::configuration(format!(
                "fee must be below {BPS_DENOMINATOR} bps, got {}",
                self.fee_bps
            )));
        }
        let slippage = SlippageTolerance::from_bps(self.slippage_bps)?;
        if self.deadline_secs == 0 {
            return Err(SwapError::configuration("deadline window must be positive"));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(SwapError::configuration("receipt poll interval must be positive"));
        }

        Ok(SwapConfig {
            rpc_url: self.rpc_url,
            signer,
            chain_id: self.chain_id,
            token_in,
            token_out,
            via_token,
            amount_in: self.amount_in,
            recipient,
            router,
            fee_bps: self.fee_bps,
            slippage,
            deadline_window_secs: self.deadline_secs,
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
        })
    }
}

/// Parse a non-zero address argument
fn parse_address(name: &str, value: &str) -> Result<Address, SwapError> {
    let address = Address::from_str(value.trim())
        .map_err(|e| SwapError::configuration(format!("invalid {name} address {value}: {e}")))?;
    if address.is_zero() {
        return Err(SwapError::configuration(format!("{name} must not be the zero address")));
    }

    Ok(address)
}

/// Check that an amount is a positive decimal number
///
/// Conversion into base units needs the token's decimals, so happens after
/// the token is fetched
fn validate_amount(amount: &str) -> Result<(), SwapError> {
    let amount = amount.trim();
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let well_formed = !(whole.is_empty() && fraction.is_empty())
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction.chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(SwapError::configuration(format!("invalid amount: {amount}")));
    }

    if amount.chars().all(|c| c == '0' || c == '.') {
        return Err(SwapError::configuration("amount must be positive"));
    }

    Ok(())
}
