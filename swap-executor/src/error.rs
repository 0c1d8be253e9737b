//! Error types for the swap executor

use std::fmt::Display;

use alloy_primitives::TxHash;

use crate::{chain_client::error::ChainClientError, pricing::fixed_point::FixedPointError};

// ---------
// | Types |
// ---------

/// The phase of a swap in which an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    /// Reading token metadata and pool reserves
    Fetch,
    /// The ERC20 approval transaction
    Approval,
    /// The router swap transaction
    Swap,
}

impl Display for SwapPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapPhase::Fetch => write!(f, "fetch"),
            SwapPhase::Approval => write!(f, "approval"),
            SwapPhase::Swap => write!(f, "swap"),
        }
    }
}

/// What an error implies about on-chain state, and so whether the operator
/// may safely retry the swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSafety {
    /// Nothing was broadcast, retrying is safe
    NothingHappened,
    /// A transaction may or may not have been accepted, the operator must
    /// investigate before retrying
    OutcomeUncertain,
    /// A transaction was included and reverted
    Failed,
}

/// The top level error returned by the swap executor
#[derive(Debug, Clone, thiserror::Error)]
pub enum SwapError {
    /// Missing or malformed external input
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The fetch capability found no token or pool
    #[error("not found: {0}")]
    NotFound(String),
    /// The pool cannot satisfy the trade
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),
    /// A transaction would revert if sent
    #[error("{phase} gas estimation failed: {reason}")]
    EstimationFailed {
        /// The phase whose transaction failed estimation
        phase: SwapPhase,
        /// The reason reported by the node
        reason: String,
    },
    /// The signing capability rejected a transaction
    #[error("{phase} signing failed: {reason}")]
    SigningFailed {
        /// The phase whose transaction could not be signed
        phase: SwapPhase,
        /// The reason reported by the signer
        reason: String,
    },
    /// The swap deadline passed before the swap was built
    #[error("deadline {deadline} expired (now: {now})")]
    DeadlineExpired {
        /// The unix timestamp of the deadline
        deadline: u64,
        /// The unix timestamp at which the deadline was checked
        now: u64,
    },
    /// A transaction was included on-chain but reverted
    #[error(
        "{phase} transaction {tx_hash:#x} reverted: {}",
        .reason.as_deref().unwrap_or("no revert reason available")
    )]
    Reverted {
        /// The phase whose transaction reverted
        phase: SwapPhase,
        /// The hash of the reverted transaction
        tx_hash: TxHash,
        /// The revert reason, if the node exposed one
        reason: Option<String>,
    },
    /// A transport level failure
    #[error("{phase} network failure: {reason}")]
    NetworkFailed {
        /// The phase in which the failure occurred
        phase: SwapPhase,
        /// The hash of the transaction in flight, if one was broadcast
        tx_hash: Option<TxHash>,
        /// Whether a broadcast had been attempted when the failure occurred
        sent: bool,
        /// The transport error
        reason: String,
    },
}

impl SwapError {
    /// Create a new configuration error
    #[allow(clippy::needless_pass_by_value)]
    pub fn configuration<T: ToString>(e: T) -> Self {
        SwapError::Configuration(e.to_string())
    }

    /// Create a new insufficient liquidity error
    #[allow(clippy::needless_pass_by_value)]
    pub fn insufficient_liquidity<T: ToString>(e: T) -> Self {
        SwapError::InsufficientLiquidity(e.to_string())
    }

    /// Classify the error by what it implies about on-chain state
    pub fn safety(&self) -> ErrorSafety {
        match self {
            SwapError::Configuration(_)
            | SwapError::NotFound(_)
            | SwapError::InsufficientLiquidity(_)
            | SwapError::EstimationFailed { .. }
            | SwapError::SigningFailed { .. }
            | SwapError::DeadlineExpired { .. } => ErrorSafety::NothingHappened,
            SwapError::NetworkFailed { sent: false, .. } => ErrorSafety::NothingHappened,
            SwapError::NetworkFailed { sent: true, .. } => ErrorSafety::OutcomeUncertain,
            SwapError::Reverted { .. } => ErrorSafety::Failed,
        }
    }

    /// Whether the operator may retry the swap without investigating
    pub fn is_retry_safe(&self) -> bool {
        self.safety() == ErrorSafety::NothingHappened
    }
}

impl From<ChainClientError> for SwapError {
    fn from(e: ChainClientError) -> Self {
        match e {
            ChainClientError::NotFound(msg) => SwapError::NotFound(msg),
            // The node answered, but with data that does not fit the configured
            // router and tokens
            ChainClientError::Parse(msg) => SwapError::Configuration(msg),
            other @ (ChainClientError::Rpc(_) | ChainClientError::Timeout(_)) => {
                SwapError::NetworkFailed {
                    phase: SwapPhase::Fetch,
                    tx_hash: None,
                    sent: false,
                    reason: other.to_string(),
                }
            },
        }
    }
}

impl From<FixedPointError> for SwapError {
    fn from(e: FixedPointError) -> Self {
        SwapError::configuration(format!("trade amount out of range: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_safety_classes() {
        let tx_hash = TxHash::repeat_byte(1);

        assert!(SwapError::configuration("bad address").is_retry_safe());
        assert!(SwapError::DeadlineExpired { deadline: 1, now: 2 }.is_retry_safe());
        assert!(SwapError::EstimationFailed { phase: SwapPhase::Swap, reason: "x".into() }
            .is_retry_safe());

        let unsent = SwapError::NetworkFailed {
            phase: SwapPhase::Approval,
            tx_hash: None,
            sent: false,
            reason: "connection refused".into(),
        };
        assert_eq!(unsent.safety(), ErrorSafety::NothingHappened);

        let in_flight = SwapError::NetworkFailed {
            phase: SwapPhase::Swap,
            tx_hash: Some(tx_hash),
            sent: true,
            reason: "timeout".into(),
        };
        assert_eq!(in_flight.safety(), ErrorSafety::OutcomeUncertain);

        let reverted = SwapError::Reverted { phase: SwapPhase::Swap, tx_hash, reason: None };
        assert_eq!(reverted.safety(), ErrorSafety::Failed);
    }

    #[test]
    fn test_chain_client_error_conversion() {
        let err: SwapError = ChainClientError::not_found("no pool").into();
        assert!(matches!(err, SwapError::NotFound(_)));

        let err: SwapError = ChainClientError::rpc("unreachable").into();
        assert!(matches!(
            err,
            SwapError::NetworkFailed { phase: SwapPhase::Fetch, sent: false, .. }
        ));

        let err: SwapError = ChainClientError::timeout("no answer").into();
        assert!(matches!(err, SwapError::NetworkFailed { sent: false, .. }));

        // A pool holding neither token is a misconfigured router, not a transport failure
        let err: SwapError = ChainClientError::parse("pool holds neither token").into();
        assert!(matches!(err, SwapError::Configuration(_)));
        assert!(err.is_retry_safe());
    }

    #[test]
    fn test_reverted_display_without_reason() {
        let err = SwapError::Reverted {
            phase: SwapPhase::Approval,
            tx_hash: TxHash::ZERO,
            reason: None,
        };
        assert!(err.to_string().contains("no revert reason available"));
    }
}
