// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! JSON bodies of the node's wallet HTTP API.

use crate::RestError;
use serde::{Deserialize, Serialize};
use stress_types::{Block, BlockHeader, HashValue, SignedTransaction};

#[derive(Debug, Serialize)]
pub struct BroadcastHexRequest {
    pub transaction: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    /// Usually hex-encoded UTF-8
    #[serde(default)]
    pub message: Option<String>,
}

impl BroadcastResponse {
    pub fn into_result(self) -> Result<(), RestError> {
        if self.result {
            return Ok(());
        }
        Err(RestError::Rejected {
            code: self.code.unwrap_or_else(|| "UNKNOWN".to_string()),
            message: self.message.map(decode_message).unwrap_or_default(),
        })
    }
}

fn decode_message(message: String) -> String {
    hex::decode(&message)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or(message)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRangeRequest {
    pub start_num: u64,
    pub end_num: u64,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlockListResponse {
    #[serde(default)]
    pub block: Vec<BlockJson>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockJson {
    pub number: u64,
    pub parent_hash: String,
    pub timestamp: i64,
    /// Hex-encoded BCS of each signed transaction
    #[serde(default)]
    pub transactions: Vec<String>,
}

impl TryFrom<BlockJson> for Block {
    type Error = RestError;

    fn try_from(block: BlockJson) -> Result<Self, Self::Error> {
        let parent_hash: HashValue = block.parent_hash.parse().map_err(RestError::decode)?;
        let transactions = block
            .transactions
            .iter()
            .map(|txn| {
                let bytes = hex::decode(txn).map_err(RestError::decode)?;
                SignedTransaction::from_bytes(&bytes).map_err(RestError::decode)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Block::new(
            BlockHeader {
                number: block.number,
                parent_hash,
                timestamp: block.timestamp,
            },
            transactions,
        ))
    }
}

impl From<&Block> for BlockJson {
    fn from(block: &Block) -> Self {
        Self {
            number: block.header.number,
            parent_hash: block.header.parent_hash.to_hex(),
            timestamp: block.header.timestamp,
            transactions: block
                .transactions
                .iter()
                .map(|txn| hex::encode(txn.to_bytes()))
                .collect(),
        }
    }
}
