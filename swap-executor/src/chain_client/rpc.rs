//! Transaction submission through the alloy provider

use std::time::Duration;

use alloy::{
    eips::BlockId,
    network::TransactionBuilder,
    providers::Provider,
    rpc::types::TransactionRequest,
};
use alloy_primitives::{Address, TxHash};
use async_trait::async_trait;
use tokio::time;
use tracing::{debug, warn};

use crate::types::{CallDescription, ConfirmedReceipt};

use super::{error::ChainClientError, ChainClient, ReceiptStatus, TransactionRpc};

/// Convert a call into an alloy transaction request from `sender`
fn to_transaction_request(call: &CallDescription, sender: Address) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(sender)
        .with_to(call.target)
        .with_value(call.value)
        .with_input(call.payload.clone())
}

#[async_trait]
impl TransactionRpc for ChainClient {
    async fn estimate_gas(
        &self,
        call: &CallDescription,
        sender: Address,
    ) -> Result<u64, ChainClientError> {
        let tx = to_transaction_request(call, sender);
        self.provider.estimate_gas(tx).await.map_err(ChainClientError::rpc)
    }

    async fn gas_price(&self) -> Result<u128, ChainClientError> {
        self.provider.get_gas_price().await.map_err(ChainClientError::rpc)
    }

    async fn pending_nonce(&self, sender: Address) -> Result<u64, ChainClientError> {
        self.provider.get_transaction_count(sender).pending().await.map_err(ChainClientError::rpc)
    }

    async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<TxHash, ChainClientError> {
        let pending =
            self.provider.send_raw_transaction(raw_tx).await.map_err(ChainClientError::rpc)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<ReceiptStatus, ChainClientError> {
        time::timeout(timeout, self.poll_receipt(tx_hash)).await.map_err(|_| {
            ChainClientError::timeout(format!("no receipt for {tx_hash:#x} after {timeout:?}"))
        })?
    }
}

impl ChainClient {
    /// Poll for the receipt at the configured interval until it appears
    ///
    /// A transport failure while polling is returned rather than retried
    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<ReceiptStatus, ChainClientError> {
        loop {
            let maybe_receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(ChainClientError::rpc)?;

            if let Some(receipt) = maybe_receipt {
                if receipt.status() {
                    return Ok(ReceiptStatus::Success(ConfirmedReceipt {
                        tx_hash,
                        block_number: receipt.block_number,
                        gas_used: receipt.gas_used,
                    }));
                }

                let reason = self.fetch_revert_reason(tx_hash, receipt.block_number).await;
                return Ok(ReceiptStatus::Reverted { tx_hash, reason });
            }

            debug!("tx {tx_hash:#x} not yet included");
            time::sleep(self.receipt_poll_interval).await;
        }
    }

    /// Recover a revert reason by replaying the transaction against the state
    /// of the block before its inclusion
    ///
    /// Best effort, returns `None` if the replay does not revert
    async fn fetch_revert_reason(
        &self,
        tx_hash: TxHash,
        block_number: Option<u64>,
    ) -> Option<String> {
        let parent_block = block_number?.checked_sub(1)?;
        let tx = match self.provider.get_transaction_by_hash(tx_hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return None,
            Err(e) => {
                warn!("could not fetch reverted tx {tx_hash:#x}: {e}");
                return None;
            },
        };

        match self.provider.call(tx.into_request()).block(BlockId::number(parent_block)).await {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        providers::{DynProvider, ProviderBuilder},
        transports::mock::Asserter,
    };
    use serde_json::Value;

    use super::*;

    /// A client over a mocked transport polling every millisecond
    fn mocked_client() -> (ChainClient, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let client = ChainClient::from_provider(
            DynProvider::new(provider),
            Address::repeat_byte(0xaa),
            25,
            Duration::from_millis(1),
        );
        (client, asserter)
    }

    #[tokio::test]
    async fn test_wait_for_receipt_gives_up_at_timeout() {
        let (client, asserter) = mocked_client();
        // Far more pending answers than polls fit in the timeout
        for _ in 0..1_000 {
            asserter.push_success(&Value::Null);
        }

        let tx_hash = TxHash::repeat_byte(7);
        let err =
            client.wait_for_receipt(tx_hash, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ChainClientError::Timeout(ref msg) if msg.contains("0x0707")));
    }

    #[tokio::test]
    async fn test_wait_for_receipt_returns_transport_failure() {
        let (client, asserter) = mocked_client();
        asserter.push_success(&Value::Null);
        asserter.push_failure_msg("upstream unavailable");

        let err = client
            .wait_for_receipt(TxHash::repeat_byte(7), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainClientError::Rpc(_)), "{err}");
    }
}
