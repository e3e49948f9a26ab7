// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{hash::HashValue, transaction::SignedTransaction};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlockHeader {
    pub number: u64,
    pub parent_hash: HashValue,
    /// Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<SignedTransaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn num_transactions(&self) -> usize {
        self.transactions.len()
    }
}
