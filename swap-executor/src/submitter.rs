//! Submits a single transaction and tracks it to a terminal state
//!
//! Each submission moves through
//!     Built -> Estimated -> Signed -> Broadcast -> {Confirmed | Reverted}
//! with `EstimationFailed`, `SigningFailed`, and `NetworkFailed` as terminal
//! failure states. Nothing here retries: a failed or ambiguous submission is
//! returned to the caller as is.

use std::{fmt::Display, sync::Arc, time::Duration};

use alloy_primitives::TxHash;
use tracing::{error, info, instrument, warn};

use crate::{
    chain_client::{ReceiptStatus, TransactionRpc},
    error::{SwapError, SwapPhase},
    signer::TransactionSigner,
    types::{CallDescription, ConfirmedReceipt, PreparedTransaction},
};

// ---------
// | Types |
// ---------

/// The state of a single transaction submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// The call has been built but not yet estimated
    Built,
    /// Gas estimation succeeded
    Estimated,
    /// The transaction has been signed
    Signed,
    /// The transaction has been handed to the node
    Broadcast,
    /// The transaction executed successfully
    Confirmed,
    /// The transaction was included and reverted
    Reverted,
    /// Gas estimation failed, so the call would revert
    EstimationFailed,
    /// The signer rejected the transaction
    SigningFailed,
    /// A transport failure interrupted the submission
    NetworkFailed,
}

impl SubmissionState {
    /// Whether the state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Confirmed
                | SubmissionState::Reverted
                | SubmissionState::EstimationFailed
                | SubmissionState::SigningFailed
                | SubmissionState::NetworkFailed
        )
    }

    /// Whether the state machine permits a move from `self` to `next`
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Built, Estimated)
                | (Built, EstimationFailed)
                // Gas price and nonce reads happen between estimation and signing
                | (Estimated, Signed)
                | (Estimated, NetworkFailed)
                | (Estimated, SigningFailed)
                | (Signed, Broadcast)
                | (Signed, NetworkFailed)
                | (Broadcast, Confirmed)
                | (Broadcast, Reverted)
                | (Broadcast, NetworkFailed)
        )
    }
}

impl Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The terminal outcome of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// The transaction executed successfully
    Confirmed(ConfirmedReceipt),
    /// The transaction was included and reverted
    Reverted {
        /// The reverted transaction
        tx_hash: TxHash,
        /// The revert reason, if available
        reason: Option<String>,
    },
    /// Gas estimation failed, nothing was signed or sent
    EstimationFailed(String),
    /// The signer rejected the transaction, nothing was sent
    SigningFailed(String),
    /// A transport failure; if `sent` is set the transaction may be on-chain
    NetworkFailed {
        /// The hash of the signed transaction, if signing completed
        tx_hash: Option<TxHash>,
        /// Whether a broadcast had been attempted
        sent: bool,
        /// The transport error
        reason: String,
    },
}

impl TransactionOutcome {
    /// Whether the transaction was confirmed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TransactionOutcome::Confirmed(_))
    }

    /// The terminal state corresponding to this outcome
    pub fn state(&self) -> SubmissionState {
        match self {
            TransactionOutcome::Confirmed(_) => SubmissionState::Confirmed,
            TransactionOutcome::Reverted { .. } => SubmissionState::Reverted,
            TransactionOutcome::EstimationFailed(_) => SubmissionState::EstimationFailed,
            TransactionOutcome::SigningFailed(_) => SubmissionState::SigningFailed,
            TransactionOutcome::NetworkFailed { .. } => SubmissionState::NetworkFailed,
        }
    }

    /// Convert the outcome into a result, attributing failures to `phase`
    pub fn into_result(self, phase: SwapPhase) -> Result<ConfirmedReceipt, SwapError> {
        match self {
            TransactionOutcome::Confirmed(receipt) => Ok(receipt),
            TransactionOutcome::Reverted { tx_hash, reason } => {
                Err(SwapError::Reverted { phase, tx_hash, reason })
            },
            TransactionOutcome::EstimationFailed(reason) => {
                Err(SwapError::EstimationFailed { phase, reason })
            },
            TransactionOutcome::SigningFailed(reason) => {
                Err(SwapError::SigningFailed { phase, reason })
            },
            TransactionOutcome::NetworkFailed { tx_hash, sent, reason } => {
                Err(SwapError::NetworkFailed { phase, tx_hash, sent, reason })
            },
        }
    }
}

/// Tracks one submission's state and logs each transition
struct SubmissionTracker {
    /// The phase the transaction belongs to
    phase: SwapPhase,
    /// The current state
    state: SubmissionState,
    /// The transaction hash, once signed
    tx_hash: Option<TxHash>,
}

impl SubmissionTracker {
    /// A tracker for a freshly built call
    fn new(phase: SwapPhase) -> Self {
        Self { phase, state: SubmissionState::Built, tx_hash: None }
    }

    /// Move to the next state
    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {next}",
            self.state
        );

        match self.tx_hash {
            Some(tx_hash) => info!(
                phase = %self.phase,
                tx_hash = %tx_hash,
                "{} tx: {} -> {next}", self.phase, self.state
            ),
            None => info!(phase = %self.phase, "{} tx: {} -> {next}", self.phase, self.state),
        }
        self.state = next;
    }

    /// Move to a terminal state and return the matching outcome
    fn finish(&mut self, outcome: TransactionOutcome) -> TransactionOutcome {
        self.advance(outcome.state());
        outcome
    }
}

// -------------
// | Submitter |
// -------------

/// Estimates, signs, broadcasts, and awaits transactions from one account
pub struct TransactionSubmitter<R, S> {
    /// The RPC capability
    rpc: Arc<R>,
    /// The signing capability
    signer: Arc<S>,
}

impl<R, S> Clone for TransactionSubmitter<R, S> {
    fn clone(&self) -> Self {
        Self { rpc: self.rpc.clone(), signer: self.signer.clone() }
    }
}

impl<R: TransactionRpc, S: TransactionSigner> TransactionSubmitter<R, S> {
    /// Constructor
    pub fn new(rpc: Arc<R>, signer: Arc<S>) -> Self {
        Self { rpc, signer }
    }

    /// Submit a call and wait for it to reach a terminal state
    ///
    /// The receipt is awaited for at most `receipt_timeout`; a transaction
    /// still pending after that is reported as a `NetworkFailed` outcome
    /// carrying its hash
    #[instrument(skip_all, fields(phase = %phase, target = %call.target))]
    pub async fn submit(
        &self,
        call: CallDescription,
        phase: SwapPhase,
        receipt_timeout: Duration,
    ) -> TransactionOutcome {
        let mut tracker = SubmissionTracker::new(phase);
        let sender = self.signer.address();

        // A failing estimate means the call would revert on-chain
        let gas_limit = match self.rpc.estimate_gas(&call, sender).await {
            Ok(gas) => gas,
            Err(e) => {
                warn!("{phase} gas estimation failed: {e}");
                return tracker.finish(TransactionOutcome::EstimationFailed(e.to_string()));
            },
        };
        tracker.advance(SubmissionState::Estimated);

        let gas_price = match self.rpc.gas_price().await {
            Ok(price) => price,
            Err(e) => return tracker.finish(unsent_failure(e)),
        };
        let nonce = match self.rpc.pending_nonce(sender).await {
            Ok(nonce) => nonce,
            Err(e) => return tracker.finish(unsent_failure(e)),
        };

        let prepared = PreparedTransaction { call, sender, gas_limit, gas_price, nonce };
        let signed = match self.signer.sign(&prepared) {
            Ok(signed) => signed,
            Err(e) => {
                error!("{phase} signing failed: {e}");
                return tracker.finish(TransactionOutcome::SigningFailed(e.to_string()));
            },
        };
        tracker.tx_hash = Some(signed.tx_hash);
        tracker.advance(SubmissionState::Signed);

        // The node may have accepted the transaction even if the send errors
        match self.rpc.send_raw_transaction(&signed.raw).await {
            Ok(node_hash) if node_hash != signed.tx_hash => warn!(
                "node reported hash {node_hash:#x} for {phase} tx {:#x}, tracking the signed hash",
                signed.tx_hash
            ),
            Ok(_) => {},
            Err(e) => {
                error!("{phase} broadcast of {:#x} failed: {e}", signed.tx_hash);
                return tracker.finish(TransactionOutcome::NetworkFailed {
                    tx_hash: Some(signed.tx_hash),
                    sent: true,
                    reason: e.to_string(),
                });
            },
        }
        tracker.advance(SubmissionState::Broadcast);

        let outcome = match self.rpc.wait_for_receipt(signed.tx_hash, receipt_timeout).await {
            Ok(ReceiptStatus::Success(receipt)) => TransactionOutcome::Confirmed(receipt),
            Ok(ReceiptStatus::Reverted { tx_hash, reason }) => {
                warn!("{phase} tx {tx_hash:#x} reverted: {reason:?}");
                TransactionOutcome::Reverted { tx_hash, reason }
            },
            Err(e) => {
                error!("{phase} tx {:#x} is pending with unknown status: {e}", signed.tx_hash);
                TransactionOutcome::NetworkFailed {
                    tx_hash: Some(signed.tx_hash),
                    sent: true,
                    reason: e.to_string(),
                }
            },
        };

        tracker.finish(outcome)
    }
}

/// A transport failure before anything was broadcast
fn unsent_failure<E: Display>(e: E) -> TransactionOutcome {
    TransactionOutcome::NetworkFailed { tx_hash: None, sent: false, reason: e.to_string() }
}
