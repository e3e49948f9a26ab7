// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{
    chain_reference::{ChainReference, now_millis},
    counters::GENERATED_TRANSACTIONS,
};
use anyhow::Result;
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use stress_config::config::AccountConfig;
use stress_types::{
    AccountAddress, RawTransaction, SignedTransaction, TransactionPayload, TransactionSigner,
    TransferAssetContract, TransferContract, TriggerSmartContract,
    transaction::TransactionType,
};

const TRANSFER_METHOD_SIGNATURE: &str = "transfer(address,uint256)";

/// ABI call data for `transfer(address,uint256)`: the 4-byte keccak selector,
/// then the receiver and the amount as 32-byte words.
pub fn transfer_call_data(receiver: &AccountAddress, amount: u64) -> Vec<u8> {
    let selector = Keccak256::digest(TRANSFER_METHOD_SIGNATURE.as_bytes());
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&selector[..4]);

    let mut receiver_word = [0u8; 32];
    receiver_word[12..].copy_from_slice(receiver.without_prefix());
    data.extend_from_slice(&receiver_word);

    let mut amount_word = [0u8; 32];
    amount_word[24..].copy_from_slice(&amount.to_be_bytes());
    data.extend_from_slice(&amount_word);
    data
}

/// Contract fields shared by every synthesized transaction.
#[derive(Clone, Debug)]
pub struct ContractParams {
    pub to: AccountAddress,
    pub fungible_asset_id: Vec<u8>,
    pub trigger_contract_address: AccountAddress,
    pub transfer_amount: u64,
    pub transfer_fungible_asset_amount: u64,
    pub trigger_contract_amount: u64,
}

impl ContractParams {
    pub fn from_config(account: &AccountConfig) -> Result<Self> {
        Ok(Self {
            to: account.to_address()?,
            fungible_asset_id: account.fungible_asset_id.as_bytes().to_vec(),
            trigger_contract_address: account.trigger_contract_address()?,
            transfer_amount: account.transfer_amount,
            transfer_fungible_asset_amount: account.transfer_fungible_asset_amount,
            trigger_contract_amount: account.trigger_contract_amount,
        })
    }
}

/// Builds, timestamps and signs transactions against a shared `ChainReference`.
pub struct TransactionFactory {
    signer: TransactionSigner,
    reference: Arc<ChainReference>,
    params: ContractParams,
    trigger_call_data: Vec<u8>,
}

impl TransactionFactory {
    pub fn new(
        signer: TransactionSigner,
        reference: Arc<ChainReference>,
        params: ContractParams,
    ) -> Self {
        let trigger_call_data = transfer_call_data(&params.to, params.trigger_contract_amount);
        Self {
            signer,
            reference,
            params,
            trigger_call_data,
        }
    }

    pub fn from_config(account: &AccountConfig, reference: Arc<ChainReference>) -> Result<Self> {
        Ok(Self::new(
            account.signer()?,
            reference,
            ContractParams::from_config(account)?,
        ))
    }

    pub fn signer(&self) -> &TransactionSigner {
        &self.signer
    }

    pub fn reference(&self) -> &Arc<ChainReference> {
        &self.reference
    }

    /// Builds and signs one transaction of the given type.
    pub fn create(&self, txn_type: TransactionType) -> SignedTransaction {
        let txn = self.sign(self.build_raw(self.payload(txn_type)));
        GENERATED_TRANSACTIONS
            .with_label_values(&[txn_type.as_str()])
            .inc();
        txn
    }

    pub fn payload(&self, txn_type: TransactionType) -> TransactionPayload {
        let owner = self.signer.address();
        match txn_type {
            TransactionType::Transfer => TransactionPayload::Transfer(TransferContract {
                owner,
                to: self.params.to,
                amount: self.params.transfer_amount,
            }),
            TransactionType::TransferFungibleAsset => {
                TransactionPayload::TransferAsset(TransferAssetContract {
                    asset_name: self.params.fungible_asset_id.clone(),
                    owner,
                    to: self.params.to,
                    amount: self.params.transfer_fungible_asset_amount,
                })
            },
            TransactionType::TriggerContract => {
                TransactionPayload::TriggerSmartContract(TriggerSmartContract {
                    owner,
                    contract_address: self.params.trigger_contract_address,
                    data: self.trigger_call_data.clone(),
                    call_value: 0,
                    token_id: 0,
                    call_token_value: 0,
                })
            },
        }
    }

    /// Attaches the current reference snapshot and the next expiration.
    pub fn build_raw(&self, payload: TransactionPayload) -> RawTransaction {
        let expiration = self.reference.next_expiration();
        let snapshot = self.reference.snapshot();
        RawTransaction::new(
            payload,
            snapshot.ref_block_bytes,
            snapshot.ref_block_hash,
            expiration,
            now_millis(),
        )
    }

    pub fn sign(&self, raw_txn: RawTransaction) -> SignedTransaction {
        raw_txn.sign(&self.signer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain_reference::ReferenceBlock;
    use claims::assert_ok;
    use std::time::Duration;
    use stress_types::HashValue;

    pub(crate) const TO_ADDRESS: &str = "41e552f6487585c2b58bc2c9bb4492bc1f17132cd0";
    pub(crate) const CONTRACT_ADDRESS: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    pub(crate) fn test_factory() -> TransactionFactory {
        let reference = Arc::new(ChainReference::new(
            ReferenceBlock::new(0x0a0b, &HashValue::sha256_of(b"reference")),
            Duration::from_secs(3600),
        ));
        TransactionFactory::new(
            TransactionSigner::from_seed([11u8; 32]),
            reference,
            ContractParams {
                to: TO_ADDRESS.parse().unwrap(),
                fungible_asset_id: b"1000001".to_vec(),
                trigger_contract_address: CONTRACT_ADDRESS.parse().unwrap(),
                transfer_amount: 5,
                transfer_fungible_asset_amount: 6,
                trigger_contract_amount: 7,
            },
        )
    }

    #[test]
    fn test_transfer_call_data_layout() {
        let receiver: AccountAddress = TO_ADDRESS.parse().unwrap();
        let data = transfer_call_data(&receiver, 0x0102);
        assert_eq!(data.len(), 68);
        // keccak256("transfer(address,uint256)")[..4]
        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], receiver.without_prefix());
        assert_eq!(&data[36..66], &[0u8; 30]);
        assert_eq!(&data[66..], &[0x01, 0x02]);
    }

    #[test]
    fn test_create_each_type() {
        let factory = test_factory();
        for txn_type in TransactionType::ALL {
            let txn = factory.create(txn_type);
            assert_eq!(txn.payload().payload_type(), txn_type);
            assert_eq!(txn.payload().owner(), factory.signer().address());
            assert_eq!(txn.raw_txn().ref_block_bytes, [0x0a, 0x0b]);
            assert_ok!(txn.verify_signature(factory.signer().public_key()));
        }
    }

    #[test]
    fn test_identical_payloads_get_distinct_ids() {
        let factory = test_factory();
        let first = factory.create(TransactionType::Transfer);
        let second = factory.create(TransactionType::Transfer);
        assert_eq!(first.payload(), second.payload());
        assert!(second.expiration() > first.expiration());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_reference_update_is_picked_up() {
        let factory = test_factory();
        let new_block = ReferenceBlock::new(0xbeef, &HashValue::sha256_of(b"next"));
        factory.reference().update(new_block);
        let txn = factory.create(TransactionType::TriggerContract);
        assert_eq!(txn.raw_txn().ref_block_bytes, new_block.ref_block_bytes);
        assert_eq!(txn.raw_txn().ref_block_hash, new_block.ref_block_hash);
    }
}
