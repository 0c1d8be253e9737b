//! Capabilities the swap consumes from the chain, and the alloy client that
//! provides them
//!
//! The fetch capability reads token metadata and pool reserves; the
//! transaction capability estimates, prices, broadcasts, and awaits
//! transactions. Both are traits so the submitter and orchestrator can be
//! driven by test doubles.

use std::time::Duration;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy_primitives::{Address, TxHash};
use async_trait::async_trait;

use crate::types::{CallDescription, ConfirmedReceipt, PairSnapshot, Token};

use self::error::ChainClientError;

pub mod error;
mod fetch;
mod rpc;

// ----------
// | Traits |
// ----------

/// Reads token metadata and pool reserves
#[async_trait]
pub trait PairDataSource: Send + Sync {
    /// Fetch an ERC20 token's metadata
    async fn fetch_token(&self, address: Address) -> Result<Token, ChainClientError>;

    /// Fetch the pool between two tokens, oriented so that `token_a` is sold
    ///
    /// Fails with `NotFound` if no pool exists for the pair
    async fn fetch_pair(
        &self,
        token_a: &Token,
        token_b: &Token,
    ) -> Result<PairSnapshot, ChainClientError>;
}

/// The terminal status of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// The transaction executed successfully
    Success(ConfirmedReceipt),
    /// The transaction was included but reverted
    Reverted {
        /// The reverted transaction
        tx_hash: TxHash,
        /// The revert reason, if the node exposes one
        reason: Option<String>,
    },
}

/// The JSON-RPC operations needed to submit a transaction
#[async_trait]
pub trait TransactionRpc: Send + Sync {
    /// Estimate the gas used by a call from `sender` against current state
    async fn estimate_gas(
        &self,
        call: &CallDescription,
        sender: Address,
    ) -> Result<u64, ChainClientError>;

    /// Fetch the current network gas price in wei
    async fn gas_price(&self) -> Result<u128, ChainClientError>;

    /// Fetch the sender's next nonce, including pending transactions
    async fn pending_nonce(&self, sender: Address) -> Result<u64, ChainClientError>;

    /// Broadcast a signed, EIP-2718 encoded transaction
    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<TxHash, ChainClientError>;

    /// Wait until the transaction is included and return its status
    ///
    /// Fails with `Timeout` if no receipt appears within `timeout`; the
    /// transaction may still be pending in that case
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainClientError>;
}

// ----------
// | Client |
// ----------

/// A client for the router's chain, backed by an alloy provider
#[derive(Clone)]
pub struct ChainClient {
    /// The underlying RPC provider
    provider: DynProvider,
    /// The router whose factory the pools are read from
    router: Address,
    /// The pool fee in basis points attached to fetched snapshots
    fee_bps: u16,
    /// The interval at which to poll for receipts
    receipt_poll_interval: Duration,
}

impl ChainClient {
    /// Connect to the node at `rpc_url`
    pub async fn new(
        rpc_url: &str,
        router: Address,
        fee_bps: u16,
        receipt_poll_interval: Duration,
    ) -> Result<Self, ChainClientError> {
        let provider =
            ProviderBuilder::new().connect(rpc_url).await.map_err(ChainClientError::rpc)?;

        Ok(Self::from_provider(DynProvider::new(provider), router, fee_bps, receipt_poll_interval))
    }

    /// Build a client around an existing provider
    pub fn from_provider(
        provider: DynProvider,
        router: Address,
        fee_bps: u16,
        receipt_poll_interval: Duration,
    ) -> Self {
        Self { provider, router, fee_bps, receipt_poll_interval }
    }

    /// Fetch the chain id from the node
    pub async fn chain_id(&self) -> Result<u64, ChainClientError> {
        self.provider.get_chain_id().await.map_err(ChainClientError::rpc)
    }
}
