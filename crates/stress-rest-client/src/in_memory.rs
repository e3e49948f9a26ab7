// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! A `ChainClient` backed by process memory, for tests.

use crate::{ChainClient, RestError, Result};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use stress_types::{Block, BlockHeader, HashValue, SignedTransaction};
use tokio::time::Instant;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .expect("Cannot currently handle a poisoned lock")
}

/// Records every submission and page request, serves blocks from a map and
/// can be told to fail.
#[derive(Default)]
pub struct InMemoryChain {
    name: String,
    blocks: Mutex<BTreeMap<u64, Block>>,
    head: Mutex<Option<Block>>,
    submitted: Mutex<Vec<SignedTransaction>>,
    submit_instants: Mutex<Vec<Instant>>,
    range_requests: Mutex<Vec<(u64, u64)>>,
    submit_calls: AtomicUsize,
    fail_every_nth_submission: AtomicUsize,
    fail_head_requests: AtomicBool,
    failing_range_start: Mutex<Option<u64>>,
}

impl InMemoryChain {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_blocks(name: &str, blocks: impl IntoIterator<Item = Block>) -> Self {
        let chain = Self::new(name);
        for block in blocks {
            chain.push_block(block);
        }
        chain
    }

    /// A block with `num_transactions` copies of `txn` (or none).
    pub fn block(
        number: u64,
        timestamp: i64,
        txn: Option<&SignedTransaction>,
        num_transactions: usize,
    ) -> Block {
        let mut parent_hash = [0u8; HashValue::LENGTH];
        parent_hash[HashValue::LENGTH - 8..].copy_from_slice(&number.saturating_sub(1).to_be_bytes());
        Block::new(
            BlockHeader {
                number,
                parent_hash: HashValue::new(parent_hash),
                timestamp,
            },
            txn.map(|txn| vec![txn.clone(); num_transactions])
                .unwrap_or_default(),
        )
    }

    pub fn push_block(&self, block: Block) {
        lock(&self.blocks).insert(block.number(), block);
    }

    /// Overrides the head block; otherwise the highest stored block is the head.
    pub fn set_head(&self, block: Block) {
        *lock(&self.head) = Some(block);
    }

    /// Every `n`th submission (1-based) is rejected. `0` disables.
    pub fn fail_every_nth_submission(&self, n: usize) {
        self.fail_every_nth_submission.store(n, Ordering::SeqCst);
    }

    pub fn fail_head_requests(&self, fail: bool) {
        self.fail_head_requests.store(fail, Ordering::SeqCst);
    }

    /// The page request starting at `start` fails.
    pub fn fail_range_starting_at(&self, start: Option<u64>) {
        *lock(&self.failing_range_start) = start;
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        lock(&self.submitted).clone()
    }

    /// When each submission call arrived, accepted or not.
    pub fn submit_instants(&self) -> Vec<Instant> {
        lock(&self.submit_instants).clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn range_requests(&self) -> Vec<(u64, u64)> {
        lock(&self.range_requests).clone()
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn submit(&self, txn: &SignedTransaction) -> Result<()> {
        lock(&self.submit_instants).push(Instant::now());
        let call = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let every = self.fail_every_nth_submission.load(Ordering::SeqCst);
        if every != 0 && call % every == 0 {
            return Err(RestError::Rejected {
                code: "SERVER_BUSY".to_string(),
                message: format!("submission {} rejected", call),
            });
        }
        lock(&self.submitted).push(txn.clone());
        Ok(())
    }

    async fn get_head_block(&self) -> Result<Block> {
        if self.fail_head_requests.load(Ordering::SeqCst) {
            return Err(RestError::Status {
                url: self.name.clone(),
                status: 503,
                body: "head block unavailable".to_string(),
            });
        }
        if let Some(head) = lock(&self.head).clone() {
            return Ok(head);
        }
        lock(&self.blocks)
            .values()
            .next_back()
            .cloned()
            .ok_or_else(|| RestError::NotFound("head block".to_string()))
    }

    async fn get_blocks_in_range(&self, start: u64, end: u64) -> Result<Vec<Block>> {
        lock(&self.range_requests).push((start, end));
        if *lock(&self.failing_range_start) == Some(start) {
            return Err(RestError::Status {
                url: self.name.clone(),
                status: 500,
                body: format!("range [{}, {}) unavailable", start, end),
            });
        }
        if start >= end {
            return Ok(vec![]);
        }
        Ok(lock(&self.blocks)
            .range(start..end)
            .map(|(_, block)| block.clone())
            .collect())
    }

    fn endpoint(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use stress_types::{
        RawTransaction, TransactionPayload, TransactionSigner, TransferContract,
    };

    fn txn() -> SignedTransaction {
        let signer = TransactionSigner::from_seed([1u8; 32]);
        RawTransaction::new(
            TransactionPayload::Transfer(TransferContract {
                owner: signer.address(),
                to: signer.address(),
                amount: 1,
            }),
            [0, 1],
            [0; 8],
            1,
            1,
        )
        .sign(&signer)
    }

    #[tokio::test]
    async fn test_blocks_and_head() {
        let txn = txn();
        let chain = InMemoryChain::with_blocks(
            "mem",
            (10..20).map(|n| InMemoryChain::block(n, n as i64 * 3000, Some(&txn), 2)),
        );
        assert_eq!(chain.get_head_block().await.unwrap().number(), 19);
        assert_eq!(chain.get_blocks_in_range(12, 15).await.unwrap().len(), 3);
        assert_eq!(
            chain.get_blocks_in_range(11, 12).await.unwrap()[0].num_transactions(),
            2
        );
        assert!(chain.get_blocks_in_range(30, 31).await.unwrap().is_empty());
        assert_eq!(chain.range_requests(), vec![(12, 15), (11, 12), (30, 31)]);

        chain.set_head(InMemoryChain::block(100, 0, None, 0));
        assert_eq!(chain.get_head_block().await.unwrap().number(), 100);
        chain.fail_head_requests(true);
        assert_err!(chain.get_head_block().await);
    }

    #[tokio::test]
    async fn test_submission_failures() {
        let chain = InMemoryChain::new("mem");
        chain.fail_every_nth_submission(3);
        let txn = txn();
        let mut failures = 0;
        for _ in 0..9 {
            if chain.submit(&txn).await.is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 3);
        assert_eq!(chain.submit_calls(), 9);
        assert_eq!(chain.submit_instants().len(), 9);
        assert_eq!(chain.submitted().len(), 6);

        chain.fail_every_nth_submission(0);
        assert_ok!(chain.submit(&txn).await);
    }
}
