//! Signs prepared transactions with a local private key

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    signers::{local::PrivateKeySigner, SignerSync},
};
use alloy_primitives::{Address, Bytes, TxHash, TxKind};

use crate::types::PreparedTransaction;

/// An error signing a transaction
#[derive(Debug, Clone, thiserror::Error)]
#[error("signer error: {0}")]
pub struct SignerError(String);

impl SignerError {
    /// Create a new signer error
    #[allow(clippy::needless_pass_by_value)]
    pub fn new<T: ToString>(e: T) -> Self {
        Self(e.to_string())
    }
}

/// A signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// The EIP-2718 encoded transaction
    pub raw: Bytes,
    /// The transaction hash
    pub tx_hash: TxHash,
}

/// Signs transactions on behalf of a single account
pub trait TransactionSigner: Send + Sync {
    /// The address of the signing account
    fn address(&self) -> Address;

    /// Sign a prepared transaction
    fn sign(&self, tx: &PreparedTransaction) -> Result<SignedTransaction, SignerError>;
}

/// A signer backed by an in-memory private key
#[derive(Clone)]
pub struct LocalSigner {
    /// The private key
    signer: PrivateKeySigner,
    /// The chain id bound into each signature
    chain_id: u64,
}

impl LocalSigner {
    /// Constructor
    pub fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign(&self, tx: &PreparedTransaction) -> Result<SignedTransaction, SignerError> {
        if tx.sender != self.signer.address() {
            return Err(SignerError::new(format!(
                "cannot sign for {:#x} with key for {:#x}",
                tx.sender,
                self.signer.address()
            )));
        }

        let consensus_tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.call.target),
            value: tx.call.value,
            input: tx.call.payload.clone(),
        };

        let signature_hash = consensus_tx.signature_hash();
        let signature = self.signer.sign_hash_sync(&signature_hash).map_err(SignerError::new)?;
        let signed_tx = consensus_tx.into_signed(signature);
        let tx_hash = *signed_tx.hash();

        let raw = TxEnvelope::Legacy(signed_tx).encoded_2718();
        Ok(SignedTransaction { raw: raw.into(), tx_hash })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{keccak256, U256};

    use super::*;
    use crate::types::CallDescription;

    /// A well known development key (anvil account 0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Build a prepared transaction from the given sender
    fn prepared_tx(sender: Address) -> PreparedTransaction {
        PreparedTransaction {
            call: CallDescription::new(Address::repeat_byte(0x11), Bytes::from(vec![1, 2, 3])),
            sender,
            gas_limit: 60_000,
            gas_price: 1_000_000_000,
            nonce: 7,
        }
    }

    #[test]
    fn test_sign_is_deterministic_and_hash_matches() {
        let key: PrivateKeySigner = DEV_KEY.parse().unwrap();
        let signer = LocalSigner::new(key, 8453);
        let tx = prepared_tx(signer.address());

        let first = signer.sign(&tx).unwrap();
        let second = signer.sign(&tx).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.tx_hash, keccak256(&first.raw));

        let mut bumped = tx.clone();
        bumped.call.value = U256::from(1u64);
        assert_ne!(signer.sign(&bumped).unwrap().tx_hash, first.tx_hash);
    }

    #[test]
    fn test_sign_rejects_foreign_sender() {
        let key: PrivateKeySigner = DEV_KEY.parse().unwrap();
        let signer = LocalSigner::new(key, 1);
        let tx = prepared_tx(Address::repeat_byte(0x99));
        assert!(signer.sign(&tx).is_err());
    }
}
