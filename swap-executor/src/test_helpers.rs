//! Test doubles for the chain, signing, and clock capabilities
//!
//! Every RPC call is recorded into an event log so tests can assert on the
//! order and number of calls made

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use alloy_primitives::{keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;

use crate::{
    chain_client::{error::ChainClientError, PairDataSource, ReceiptStatus, TransactionRpc},
    clock::Clock,
    signer::{SignedTransaction, SignerError, TransactionSigner},
    types::{CallDescription, ConfirmedReceipt, PairSnapshot, PreparedTransaction, Token},
};

// -------
// | RPC |
// -------

/// A call made against the mock RPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcEvent {
    /// A gas estimate for a call
    EstimateGas {
        /// The contract called
        target: Address,
        /// The calldata
        payload: Bytes,
    },
    /// A gas price read
    GasPrice,
    /// A nonce read for the given account
    PendingNonce(Address),
    /// A raw transaction broadcast
    SendRaw(Bytes),
    /// A receipt wait for the given transaction
    WaitForReceipt(TxHash),
}

/// A scripted receipt result
enum ReceiptScript {
    /// The transaction succeeds
    Success,
    /// The transaction reverts with the given reason
    Revert(Option<String>),
    /// The receipt wait fails
    Error(ChainClientError),
}

/// A scripted RPC double; unscripted calls succeed
#[derive(Default)]
pub struct MockRpc {
    /// The calls made, in order
    events: Mutex<Vec<RpcEvent>>,
    /// Scripted gas estimates
    estimates: Mutex<VecDeque<Result<u64, ChainClientError>>>,
    /// Scripted gas prices
    gas_prices: Mutex<VecDeque<Result<u128, ChainClientError>>>,
    /// Scripted broadcast results, optionally overriding the returned hash
    sends: Mutex<VecDeque<Result<Option<TxHash>, ChainClientError>>>,
    /// Scripted receipt results
    receipts: Mutex<VecDeque<ReceiptScript>>,
    /// The timeout passed to each receipt wait
    receipt_timeouts: Mutex<Vec<Duration>>,
}

impl MockRpc {
    /// The gas estimate returned when none is scripted
    pub const GAS_ESTIMATE: u64 = 50_000;
    /// The gas price returned when none is scripted
    pub const GAS_PRICE: u128 = 2_000_000_000;
    /// The nonce returned for every account
    pub const NONCE: u64 = 3;

    /// Script the next gas estimate
    pub fn push_estimate(&self, result: Result<u64, ChainClientError>) {
        self.estimates.lock().unwrap().push_back(result);
    }

    /// Script the next gas price
    pub fn push_gas_price(&self, result: Result<u128, ChainClientError>) {
        self.gas_prices.lock().unwrap().push_back(result);
    }

    /// Script the next broadcast
    pub fn push_send(&self, result: Result<(), ChainClientError>) {
        self.sends.lock().unwrap().push_back(result.map(|()| None));
    }

    /// Script the next broadcast to succeed but report `tx_hash`
    pub fn push_send_hash(&self, tx_hash: TxHash) {
        self.sends.lock().unwrap().push_back(Ok(Some(tx_hash)));
    }

    /// Script the next receipt as a success
    pub fn push_receipt_success(&self) {
        self.receipts.lock().unwrap().push_back(ReceiptScript::Success);
    }

    /// Script the next receipt as a revert
    pub fn push_receipt_revert(&self, reason: Option<String>) {
        self.receipts.lock().unwrap().push_back(ReceiptScript::Revert(reason));
    }

    /// Script the next receipt wait as a failure
    pub fn push_receipt_error(&self, err: ChainClientError) {
        self.receipts.lock().unwrap().push_back(ReceiptScript::Error(err));
    }

    /// The calls made so far
    pub fn events(&self) -> Vec<RpcEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The timeouts passed to each receipt wait, in order
    pub fn receipt_timeouts(&self) -> Vec<Duration> {
        self.receipt_timeouts.lock().unwrap().clone()
    }

    /// The number of broadcasts attempted
    pub fn send_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, RpcEvent::SendRaw(_))).count()
    }

    /// The calls whose estimate targeted `target`
    pub fn estimates_for(&self, target: Address) -> Vec<Bytes> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RpcEvent::EstimateGas { target: t, payload } if t == target => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Record a call
    fn record(&self, event: RpcEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl TransactionRpc for MockRpc {
    async fn estimate_gas(
        &self,
        call: &CallDescription,
        _sender: Address,
    ) -> Result<u64, ChainClientError> {
        self.record(RpcEvent::EstimateGas { target: call.target, payload: call.payload.clone() });
        self.estimates.lock().unwrap().pop_front().unwrap_or(Ok(Self::GAS_ESTIMATE))
    }

    async fn gas_price(&self) -> Result<u128, ChainClientError> {
        self.record(RpcEvent::GasPrice);
        self.gas_prices.lock().unwrap().pop_front().unwrap_or(Ok(Self::GAS_PRICE))
    }

    async fn pending_nonce(&self, sender: Address) -> Result<u64, ChainClientError> {
        self.record(RpcEvent::PendingNonce(sender));
        Ok(Self::NONCE)
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<TxHash, ChainClientError> {
        self.record(RpcEvent::SendRaw(Bytes::copy_from_slice(raw_tx)));
        let reported = self.sends.lock().unwrap().pop_front().unwrap_or(Ok(None))?;
        Ok(reported.unwrap_or_else(|| keccak256(raw_tx)))
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainClientError> {
        self.record(RpcEvent::WaitForReceipt(tx_hash));
        self.receipt_timeouts.lock().unwrap().push(timeout);
        match self.receipts.lock().unwrap().pop_front() {
            None | Some(ReceiptScript::Success) => Ok(ReceiptStatus::Success(ConfirmedReceipt {
                tx_hash,
                block_number: Some(1),
                gas_used: Self::GAS_ESTIMATE,
            })),
            Some(ReceiptScript::Revert(reason)) => Ok(ReceiptStatus::Reverted { tx_hash, reason }),
            Some(ReceiptScript::Error(e)) => Err(e),
        }
    }
}

// ----------
// | Signer |
// ----------

/// A signer double that records what it signs
#[derive(Default)]
pub struct MockSigner {
    /// The transactions signed, in order
    signed: Mutex<Vec<PreparedTransaction>>,
    /// Scripted rejections, consumed one per signing request
    rejections: Mutex<VecDeque<String>>,
}

impl MockSigner {
    /// Reject the next signing request with `reason`
    pub fn push_rejection(&self, reason: &str) {
        self.rejections.lock().unwrap().push_back(reason.to_string());
    }

    /// The transactions signed so far
    pub fn signed(&self) -> Vec<PreparedTransaction> {
        self.signed.lock().unwrap().clone()
    }
}

impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        Address::repeat_byte(0x5e)
    }

    fn sign(&self, tx: &PreparedTransaction) -> Result<SignedTransaction, SignerError> {
        if let Some(reason) = self.rejections.lock().unwrap().pop_front() {
            return Err(SignerError::new(reason));
        }
        self.signed.lock().unwrap().push(tx.clone());

        let mut raw = tx.call.target.to_vec();
        raw.extend_from_slice(&tx.call.payload);
        raw.extend_from_slice(&tx.nonce.to_be_bytes());
        let tx_hash = keccak256(&raw);

        Ok(SignedTransaction { raw: raw.into(), tx_hash })
    }
}

// ---------
// | Clock |
// ---------

/// A clock that returns scripted times, repeating the last one
pub struct MockClock {
    /// The remaining times
    times: Mutex<VecDeque<u64>>,
    /// The last time returned
    last: Mutex<u64>,
}

impl MockClock {
    /// A clock returning `times` in order
    pub fn new(times: Vec<u64>) -> Self {
        let first = times.first().copied().unwrap_or_default();
        Self { times: Mutex::new(times.into()), last: Mutex::new(first) }
    }

    /// A clock frozen at `now`
    pub fn fixed(now: u64) -> Self {
        Self::new(vec![now])
    }
}

impl Clock for MockClock {
    fn now_unix(&self) -> u64 {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.times.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}

// ----------------
// | Pair Source |
// ----------------

/// An in-memory fetch capability
#[derive(Default)]
pub struct MockPairSource {
    /// Known tokens
    tokens: HashMap<Address, Token>,
    /// Reserves keyed by (token_a, token_b)
    pools: HashMap<(Address, Address), (U256, U256)>,
}

impl MockPairSource {
    /// Register a token
    pub fn with_token(mut self, token: Token) -> Self {
        self.tokens.insert(token.address, token);
        self
    }

    /// Register a pool, visible from both directions
    pub fn with_pool(mut self, a: Address, b: Address, reserve_a: u64, reserve_b: u64) -> Self {
        let (reserve_a, reserve_b) = (U256::from(reserve_a), U256::from(reserve_b));
        self.pools.insert((a, b), (reserve_a, reserve_b));
        self.pools.insert((b, a), (reserve_b, reserve_a));
        self
    }
}

#[async_trait]
impl PairDataSource for MockPairSource {
    async fn fetch_token(&self, address: Address) -> Result<Token, ChainClientError> {
        self.tokens
            .get(&address)
            .cloned()
            .ok_or_else(|| ChainClientError::not_found(format!("token {address:#x}")))
    }

    async fn fetch_pair(
        &self,
        token_a: &Token,
        token_b: &Token,
    ) -> Result<PairSnapshot, ChainClientError> {
        let (reserve_a, reserve_b) =
            self.pools.get(&(token_a.address, token_b.address)).copied().ok_or_else(|| {
                ChainClientError::not_found(format!("pool {}/{}", token_a.label(), token_b.label()))
            })?;

        Ok(PairSnapshot {
            token_a: token_a.clone(),
            token_b: token_b.clone(),
            reserve_a,
            reserve_b,
            fee_bps: 25,
        })
    }
}
