// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod account_address;
pub mod block;
pub mod hash;
pub mod signer;
pub mod transaction;

pub use account_address::AccountAddress;
pub use block::{Block, BlockHeader};
pub use hash::HashValue;
pub use signer::{SigningError, TransactionSigner};
pub use transaction::{
    RawTransaction, SignedTransaction, TransactionPayload, TransferAssetContract,
    TransferContract, TriggerSmartContract,
};
