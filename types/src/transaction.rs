// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    account_address::AccountAddress,
    hash::HashValue,
    signer::{SigningError, TransactionSigner},
};
use ed25519_dalek::{PublicKey, Signature, Verifier};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};

/// The kinds of transaction the harness knows how to synthesize. The serialized
/// names double as configuration keys.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    TransferFungibleAsset,
    TriggerContract,
}

impl TransactionType {
    pub const ALL: [TransactionType; 3] = [
        TransactionType::Transfer,
        TransactionType::TransferFungibleAsset,
        TransactionType::TriggerContract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::TransferFungibleAsset => "transfer_fungible_asset",
            TransactionType::TriggerContract => "trigger_contract",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moves native coin from `owner` to `to`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransferContract {
    pub owner: AccountAddress,
    pub to: AccountAddress,
    pub amount: u64,
}

/// Moves `amount` units of the fungible asset identified by `asset_name`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransferAssetContract {
    pub asset_name: Vec<u8>,
    pub owner: AccountAddress,
    pub to: AccountAddress,
    pub amount: u64,
}

/// Calls a deployed contract with ABI-encoded `data`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TriggerSmartContract {
    pub owner: AccountAddress,
    pub contract_address: AccountAddress,
    pub data: Vec<u8>,
    pub call_value: u64,
    pub token_id: u64,
    pub call_token_value: u64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TransactionPayload {
    Transfer(TransferContract),
    TransferAsset(TransferAssetContract),
    TriggerSmartContract(TriggerSmartContract),
}

impl TransactionPayload {
    pub fn payload_type(&self) -> TransactionType {
        match self {
            TransactionPayload::Transfer(_) => TransactionType::Transfer,
            TransactionPayload::TransferAsset(_) => TransactionType::TransferFungibleAsset,
            TransactionPayload::TriggerSmartContract(_) => TransactionType::TriggerContract,
        }
    }

    pub fn owner(&self) -> AccountAddress {
        match self {
            TransactionPayload::Transfer(c) => c.owner,
            TransactionPayload::TransferAsset(c) => c.owner,
            TransactionPayload::TriggerSmartContract(c) => c.owner,
        }
    }
}

/// The unsigned body of a transaction.
///
/// `ref_block_bytes` and `ref_block_hash` bind the transaction to a recent
/// block; `expiration` and `timestamp` are unix milliseconds.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RawTransaction {
    pub payload: TransactionPayload,
    pub ref_block_bytes: [u8; 2],
    pub ref_block_hash: [u8; 8],
    pub expiration: i64,
    pub timestamp: i64,
}

impl RawTransaction {
    pub fn new(
        payload: TransactionPayload,
        ref_block_bytes: [u8; 2],
        ref_block_hash: [u8; 8],
        expiration: i64,
        timestamp: i64,
    ) -> Self {
        Self {
            payload,
            ref_block_bytes,
            ref_block_hash,
            expiration,
            timestamp,
        }
    }

    /// Canonical encoding of the body; the bytes that get hashed and signed.
    pub fn signing_message(&self) -> Vec<u8> {
        bcs::to_bytes(self).expect("BCS serialization of RawTransaction cannot fail")
    }

    /// SHA-256 of the canonical encoding. Doubles as the transaction ID.
    pub fn hash(&self) -> HashValue {
        HashValue::sha256_of(&self.signing_message())
    }

    /// Signs the body, consuming it.
    pub fn sign(self, signer: &TransactionSigner) -> SignedTransaction {
        let signature = signer.sign_digest(&self.hash());
        SignedTransaction::new(self, vec![signature.to_bytes().to_vec()])
    }
}

/// A raw body together with its signatures. Immutable once built.
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize)]
pub struct SignedTransaction {
    raw_txn: RawTransaction,
    signatures: Vec<Vec<u8>>,
}

impl SignedTransaction {
    pub fn new(raw_txn: RawTransaction, signatures: Vec<Vec<u8>>) -> Self {
        Self {
            raw_txn,
            signatures,
        }
    }

    pub fn raw_txn(&self) -> &RawTransaction {
        &self.raw_txn
    }

    pub fn payload(&self) -> &TransactionPayload {
        &self.raw_txn.payload
    }

    pub fn signatures(&self) -> &[Vec<u8>] {
        &self.signatures
    }

    pub fn expiration(&self) -> i64 {
        self.raw_txn.expiration
    }

    /// The transaction ID: SHA-256 over the canonical raw body.
    pub fn id(&self) -> HashValue {
        self.raw_txn.hash()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bcs::to_bytes(self).expect("BCS serialization of SignedTransaction cannot fail")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bcs::Error> {
        bcs::from_bytes(bytes)
    }

    /// Checks the first signature against `public_key`.
    pub fn verify_signature(&self, public_key: &PublicKey) -> Result<(), SigningError> {
        let bytes = self
            .signatures
            .first()
            .ok_or(SigningError::MissingSignature)?;
        let signature = Signature::try_from(bytes.as_slice())
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))?;
        public_key
            .verify(self.id().as_bytes(), &signature)
            .map_err(|e| SigningError::InvalidSignature(e.to_string()))
    }
}

impl Debug for SignedTransaction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "SignedTransaction {{ id: {}, type: {}, expiration: {}, signatures: {} }}",
            self.id(),
            self.raw_txn.payload.payload_type(),
            self.raw_txn.expiration,
            self.signatures.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(signer: &TransactionSigner, expiration: i64) -> RawTransaction {
        RawTransaction::new(
            TransactionPayload::Transfer(TransferContract {
                owner: signer.address(),
                to: signer.address(),
                amount: 1,
            }),
            [0x12, 0x34],
            [1, 2, 3, 4, 5, 6, 7, 8],
            expiration,
            1_000,
        )
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = TransactionSigner::from_seed([3u8; 32]);
        let txn = transfer(&signer, 10).sign(&signer);
        txn.verify_signature(signer.public_key()).unwrap();

        let other = TransactionSigner::from_seed([4u8; 32]);
        assert!(txn.verify_signature(other.public_key()).is_err());
    }

    #[test]
    fn test_id_depends_on_body_only() {
        let signer = TransactionSigner::from_seed([3u8; 32]);
        let a = transfer(&signer, 10).sign(&signer);
        let b = SignedTransaction::new(a.raw_txn().clone(), vec![]);
        assert_eq!(a.id(), b.id());

        let c = transfer(&signer, 11).sign(&signer);
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_bytes_round_trip() {
        let signer = TransactionSigner::from_seed([9u8; 32]);
        let txn = transfer(&signer, 42).sign(&signer);
        let decoded = SignedTransaction::from_bytes(&txn.to_bytes()).unwrap();
        assert_eq!(txn, decoded);
        assert!(SignedTransaction::from_bytes(&[0xff, 0x01]).is_err());
    }

    #[test]
    fn test_payload_type() {
        let signer = TransactionSigner::from_seed([1u8; 32]);
        let payload = TransactionPayload::TriggerSmartContract(TriggerSmartContract {
            owner: signer.address(),
            contract_address: signer.address(),
            data: vec![],
            call_value: 0,
            token_id: 0,
            call_token_value: 0,
        });
        assert_eq!(payload.payload_type(), TransactionType::TriggerContract);
        assert_eq!(payload.owner(), signer.address());
        assert_eq!(
            serde_json::to_string(&TransactionType::TransferFungibleAsset).unwrap(),
            "\"transfer_fungible_asset\""
        );
    }
}
