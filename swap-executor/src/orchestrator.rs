//! Drives a swap end to end: quote, approve, re-check the deadline, swap
//!
//! The swap is only built once the approval has confirmed. Any failure in
//! the approval phase stops the run before a swap transaction exists.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    chain_client::{PairDataSource, TransactionRpc},
    clock::Clock,
    error::{SwapError, SwapPhase},
    pricing,
    signer::TransactionSigner,
    submitter::TransactionSubmitter,
    types::{ConfirmedReceipt, Deadline, Route, SlippageTolerance, TradeQuote},
    tx_builder::TransactionBuilder,
};

/// How long past the deadline a receipt is still awaited, since a block
/// stamped at the deadline is only observed after it
const RECEIPT_GRACE_PERIOD: Duration = Duration::from_secs(60);

// ---------
// | Types |
// ---------

/// A request to sell an exact amount of one token along a route
#[derive(Debug, Clone)]
pub struct SwapRequest {
    /// The pools to trade through
    pub route: Route,
    /// The amount of the input token to sell, in base units
    pub input_amount: U256,
    /// The tolerated shortfall from the quoted output
    pub slippage: SlippageTolerance,
    /// The account receiving the output token
    pub recipient: Address,
    /// The number of seconds after the start of the run before the swap
    /// expires
    pub deadline_window_secs: u64,
}

/// The result of a swap that confirmed on-chain
#[derive(Debug, Clone, Serialize)]
pub struct SwapOutcome {
    /// The quote the swap was built from
    pub quote: TradeQuote,
    /// The deadline encoded into the swap
    pub deadline: Deadline,
    /// The approval receipt
    pub approval: ConfirmedReceipt,
    /// The swap receipt
    pub swap: ConfirmedReceipt,
}

// ---------------
// | Route Setup |
// ---------------

/// Fetch the tokens and pools connecting `token_in` to `token_out`, through
/// `via` when given
#[instrument(skip(source))]
pub async fn resolve_route<P: PairDataSource>(
    source: &P,
    token_in: Address,
    token_out: Address,
    via: Option<Address>,
) -> Result<Route, SwapError> {
    let input = source.fetch_token(token_in).await?;
    let output = source.fetch_token(token_out).await?;

    let hops = match via {
        None => vec![source.fetch_pair(&input, &output).await?],
        Some(via) => {
            let intermediate = source.fetch_token(via).await?;
            vec![
                source.fetch_pair(&input, &intermediate).await?,
                source.fetch_pair(&intermediate, &output).await?,
            ]
        },
    };

    for hop in &hops {
        info!(
            "pool {}/{}: reserves {} / {}",
            hop.token_a.label(),
            hop.token_b.label(),
            hop.token_a.format_amount(hop.reserve_a),
            hop.token_b.format_amount(hop.reserve_b),
        );
    }

    Route::new(hops)
}

// ----------------
// | Orchestrator |
// ----------------

/// Runs the approval and swap transactions for a single trade
pub struct SwapOrchestrator<R, S, C> {
    /// Submits the approval and swap
    submitter: TransactionSubmitter<R, S>,
    /// The router, which is both the approval spender and the swap target
    router: Address,
    /// The wall clock used for the deadline
    clock: C,
}

impl<R: TransactionRpc, S: TransactionSigner, C: Clock> SwapOrchestrator<R, S, C> {
    /// Constructor
    pub fn new(submitter: TransactionSubmitter<R, S>, router: Address, clock: C) -> Self {
        Self { submitter, router, clock }
    }

    /// Execute the swap described by `request`
    #[instrument(skip_all, fields(
        token_in = %request.route.input_token().label(),
        token_out = %request.route.output_token().label(),
        input_amount = %request.input_amount,
    ))]
    pub async fn execute(&self, request: &SwapRequest) -> Result<SwapOutcome, SwapError> {
        let started = self.clock.now_unix();
        let deadline = Deadline::from_window(started, request.deadline_window_secs)?;
        let quote = pricing::quote_route(&request.route, request.input_amount, request.slippage)?;

        let token_in = request.route.input_token();
        let token_out = request.route.output_token();
        info!(
            "quoted {} {} -> {} {} (minimum {}), deadline {}",
            token_in.format_amount(quote.input_amount()),
            token_in.label(),
            token_out.format_amount(quote.expected_output()),
            token_out.label(),
            token_out.format_amount(quote.minimum_output()),
            deadline.timestamp(),
        );

        let builder = TransactionBuilder::new(token_in.address, self.router);

        // --- Approval --- //
        let approval_call = builder.build_approval(self.router, quote.input_amount());
        let approval = self
            .submitter
            .submit(approval_call, SwapPhase::Approval, receipt_timeout(deadline, started))
            .await
            .into_result(SwapPhase::Approval)?;
        info!("approval confirmed in {:#x}", approval.tx_hash);

        // The approval may have taken long enough to consume the window
        let now = self.clock.now_unix();
        if deadline.has_expired(now) {
            warn!("deadline {} passed at {now}, not building the swap", deadline.timestamp());
            return Err(SwapError::DeadlineExpired { deadline: deadline.timestamp(), now });
        }

        // --- Swap --- //
        let swap_call = builder.build_swap(
            &request.route.path(),
            quote.input_amount(),
            quote.minimum_output(),
            request.recipient,
            deadline,
        )?;
        let swap = self
            .submitter
            .submit(swap_call, SwapPhase::Swap, receipt_timeout(deadline, now))
            .await
            .into_result(SwapPhase::Swap)?;
        info!("swap confirmed in {:#x}", swap.tx_hash);

        Ok(SwapOutcome { quote, deadline, approval, swap })
    }
}

/// The longest a receipt is awaited from `now`
///
/// A transaction still pending after this is surfaced to the caller with its
/// hash rather than awaited indefinitely
fn receipt_timeout(deadline: Deadline, now: u64) -> Duration {
    deadline.remaining(now) + RECEIPT_GRACE_PERIOD
}
