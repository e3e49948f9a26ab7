// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::counters::REFERENCE_REFRESHES;
use anyhow::{Context, Result, anyhow};
use arc_swap::ArcSwap;
use std::{
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use stress_config::config::ReferenceConfig;
use stress_logger::prelude::*;
use stress_rest_client::ChainClient;
use stress_types::{Block, HashValue};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// The recent block a transaction is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceBlock {
    pub ref_block_bytes: [u8; 2],
    pub ref_block_hash: [u8; 8],
}

impl ReferenceBlock {
    /// Bytes 6..8 of the big-endian block number and bytes 8..16 of its hash.
    pub fn new(block_number: u64, block_hash: &HashValue) -> Self {
        let number = block_number.to_be_bytes();
        let mut ref_block_hash = [0u8; 8];
        ref_block_hash.copy_from_slice(&block_hash.as_bytes()[8..16]);
        Self {
            ref_block_bytes: [number[6], number[7]],
            ref_block_hash,
        }
    }

    /// References the parent of the given head block.
    pub fn from_head_block(head: &Block) -> Self {
        Self::new(head.number().saturating_sub(1), &head.header.parent_hash)
    }
}

/// Shared reference state read by every transaction build.
///
/// The block snapshot is swapped atomically. The expiration watermark only
/// moves forward: each build takes the next value, refreshes lift it to
/// `now + validity_window` when that is higher.
#[derive(Debug)]
pub struct ChainReference {
    snapshot: ArcSwap<ReferenceBlock>,
    expiration: AtomicI64,
    validity_window: Duration,
}

impl ChainReference {
    pub fn new(initial: ReferenceBlock, validity_window: Duration) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(initial),
            expiration: AtomicI64::new(now_millis() + validity_window.as_millis() as i64),
            validity_window,
        }
    }

    /// Resolves the starting reference: the head block when refresh is enabled,
    /// the configured block otherwise.
    pub async fn initialize(
        config: &ReferenceConfig,
        client: Option<&dyn ChainClient>,
    ) -> Result<Self> {
        let validity_window = Duration::from_secs(config.validity_window_secs);
        let initial = if config.update {
            let client = client.ok_or_else(|| anyhow!("reference refresh needs a client"))?;
            let head = client.get_head_block().await.with_context(|| {
                format!("Failed to fetch head block from {}", client.endpoint())
            })?;
            ReferenceBlock::from_head_block(&head)
        } else {
            ReferenceBlock::new(config.block_number, &config.block_hash()?)
        };
        info!(
            "Transaction reference initialized: ref_block_bytes {}, ref_block_hash {}",
            hex::encode(initial.ref_block_bytes),
            hex::encode(initial.ref_block_hash)
        );
        Ok(Self::new(initial, validity_window))
    }

    pub fn snapshot(&self) -> Arc<ReferenceBlock> {
        self.snapshot.load_full()
    }

    /// A strictly increasing expiration, unique per call.
    pub fn next_expiration(&self) -> i64 {
        self.expiration.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_expiration(&self) -> i64 {
        self.expiration.load(Ordering::SeqCst)
    }

    pub fn update(&self, block: ReferenceBlock) {
        self.expiration.fetch_max(
            now_millis() + self.validity_window.as_millis() as i64,
            Ordering::SeqCst,
        );
        self.snapshot.store(Arc::new(block));
    }
}

/// Background task polling the head block and refreshing a `ChainReference`.
///
/// A failed poll is fatal: the run's token is cancelled and the error is
/// returned from `shutdown`.
pub struct ReferenceUpdater {
    stop: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl ReferenceUpdater {
    pub fn spawn(
        reference: Arc<ChainReference>,
        client: Arc<dyn ChainClient>,
        refresh_interval: Duration,
        run_token: CancellationToken,
    ) -> Self {
        let stop = run_token.child_token();
        let handle = tokio::spawn(Self::run(
            reference,
            client,
            refresh_interval,
            run_token,
            stop.clone(),
        ));
        Self { stop, handle }
    }

    async fn run(
        reference: Arc<ChainReference>,
        client: Arc<dyn ChainClient>,
        refresh_interval: Duration,
        run_token: CancellationToken,
        stop: CancellationToken,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(refresh_interval);
        // the first tick completes immediately, the initial reference is already current
        interval.tick().await;
        loop {
            tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                _ = interval.tick() => {},
            }

            match client.get_head_block().await {
                Ok(head) => {
                    let block = ReferenceBlock::from_head_block(&head);
                    reference.update(block);
                    REFERENCE_REFRESHES.inc();
                    debug!(
                        "Transaction reference updated to block {}, expiration watermark {}",
                        head.number(),
                        reference.current_expiration()
                    );
                },
                Err(error) => {
                    error!(
                        "Failed to refresh transaction reference from {}: {}",
                        client.endpoint(),
                        error
                    );
                    run_token.cancel();
                    return Err(error).context("Transaction reference refresh failed");
                },
            }
        }
    }

    /// Stops the updater and surfaces its error, if it failed.
    pub async fn shutdown(self) -> Result<()> {
        self.stop.cancel();
        self.handle
            .await
            .context("Transaction reference updater panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use std::collections::HashSet;
    use stress_rest_client::InMemoryChain;

    fn hash_with_marker() -> HashValue {
        let mut bytes = [0u8; HashValue::LENGTH];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = i as u8;
        }
        HashValue::new(bytes)
    }

    #[test]
    fn test_reference_block_derivation() {
        let reference = ReferenceBlock::new(0x0102_0304_0506_0708, &hash_with_marker());
        assert_eq!(reference.ref_block_bytes, [0x07, 0x08]);
        assert_eq!(reference.ref_block_hash, [8, 9, 10, 11, 12, 13, 14, 15]);

        let head = InMemoryChain::block(0x1235, 0, None, 0);
        let from_head = ReferenceBlock::from_head_block(&head);
        assert_eq!(from_head.ref_block_bytes, [0x12, 0x34]);
        assert_eq!(
            from_head.ref_block_hash,
            <[u8; 8]>::try_from(&head.header.parent_hash.as_bytes()[8..16]).unwrap()
        );
    }

    #[test]
    fn test_expirations_are_unique_and_monotonic() {
        let reference = Arc::new(ChainReference::new(
            ReferenceBlock::new(1, &HashValue::zero()),
            Duration::from_secs(60),
        ));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reference = reference.clone();
                std::thread::spawn(move || {
                    let mut previous = i64::MIN;
                    let mut values = Vec::with_capacity(1000);
                    for _ in 0..1000 {
                        let expiration = reference.next_expiration();
                        assert!(expiration > previous);
                        previous = expiration;
                        values.push(expiration);
                    }
                    values
                })
            })
            .collect();
        let mut all = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(all.insert(value));
            }
        }
        assert_eq!(all.len(), 4000);
    }

    #[test]
    fn test_update_never_moves_watermark_backwards() {
        let reference = ChainReference::new(
            ReferenceBlock::new(1, &HashValue::zero()),
            Duration::from_secs(3600),
        );
        // push the watermark far ahead
        for _ in 0..10 {
            reference.next_expiration();
        }
        let before = reference.current_expiration();
        reference.update(ReferenceBlock::new(2, &HashValue::zero()));
        assert!(reference.current_expiration() >= before);
        assert_eq!(
            *reference.snapshot(),
            ReferenceBlock::new(2, &HashValue::zero())
        );
    }

    #[tokio::test]
    async fn test_initialize_from_config_and_head() {
        let config = ReferenceConfig {
            block_number: 258,
            block_hash: hash_with_marker().to_hex(),
            ..Default::default()
        };
        let reference = assert_ok!(ChainReference::initialize(&config, None).await);
        assert_eq!(reference.snapshot().ref_block_bytes, [0x01, 0x02]);

        let chain = InMemoryChain::with_blocks("mem", [InMemoryChain::block(300, 0, None, 0)]);
        let config = ReferenceConfig {
            update: true,
            url: Some("http://127.0.0.1:8090".to_string()),
            ..Default::default()
        };
        let reference = assert_ok!(ChainReference::initialize(&config, Some(&chain)).await);
        assert_eq!(
            *reference.snapshot(),
            ReferenceBlock::from_head_block(&InMemoryChain::block(300, 0, None, 0))
        );

        chain.fail_head_requests(true);
        assert_err!(ChainReference::initialize(&config, Some(&chain)).await);
        assert_err!(ChainReference::initialize(&config, None).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_updater_refreshes_snapshot() {
        let chain = Arc::new(InMemoryChain::with_blocks("mem", [InMemoryChain::block(
            10, 0, None, 0,
        )]));
        let reference = Arc::new(ChainReference::new(
            ReferenceBlock::new(0, &HashValue::zero()),
            Duration::from_secs(60),
        ));
        let token = CancellationToken::new();
        let updater = ReferenceUpdater::spawn(
            reference.clone(),
            chain.clone(),
            Duration::from_secs(1),
            token.clone(),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(
            *reference.snapshot(),
            ReferenceBlock::from_head_block(&InMemoryChain::block(10, 0, None, 0))
        );

        assert_ok!(updater.shutdown().await);
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_updater_failure_cancels_run() {
        let chain = Arc::new(InMemoryChain::new("mem"));
        chain.fail_head_requests(true);
        let reference = Arc::new(ChainReference::new(
            ReferenceBlock::new(0, &HashValue::zero()),
            Duration::from_secs(60),
        ));
        let token = CancellationToken::new();
        let updater =
            ReferenceUpdater::spawn(reference, chain, Duration::from_secs(1), token.clone());

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
        assert_err!(updater.shutdown().await);
    }
}
