// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{counters::REPLAYED_BLOCKS, generation::write_transactions};
use anyhow::{Context, Result, bail};
use std::{path::Path, sync::Arc};
use stress_logger::prelude::*;
use stress_rest_client::ChainClient;
use stress_types::SignedTransaction;
use tokio_util::sync::CancellationToken;

/// Blocks requested per page.
pub const REPLAY_PAGE_SIZE: u64 = 5;

/// Collects the transactions of a historical block range for replay.
pub struct ReplayExtractor {
    client: Arc<dyn ChainClient>,
}

impl ReplayExtractor {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Walks `[start, end)` in pages of `REPLAY_PAGE_SIZE` blocks and returns
    /// every transaction in block order. Empty pages are skipped; a failed
    /// page aborts the walk.
    pub async fn extract(
        &self,
        start: u64,
        end: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<SignedTransaction>> {
        if start > end {
            bail!("Invalid replay range [{}, {})", start, end);
        }
        info!("Extracting transactions from blocks [{}, {})", start, end);

        let mut txns = Vec::new();
        let mut page_start = start;
        while page_start < end {
            if cancel.is_cancelled() {
                bail!("Replay extraction cancelled at block {}", page_start);
            }
            let page_end = page_start.saturating_add(REPLAY_PAGE_SIZE).min(end);
            let blocks = self
                .client
                .get_blocks_in_range(page_start, page_end)
                .await
                .with_context(|| {
                    format!(
                        "Failed to fetch blocks [{}, {}) from {}",
                        page_start,
                        page_end,
                        self.client.endpoint()
                    )
                })?;
            REPLAYED_BLOCKS.inc_by(blocks.len() as u64);
            for block in blocks {
                txns.extend(block.transactions);
            }
            sample!(
                SampleRate::Frequency(100),
                info!("Replay extraction reached block {}, {} transactions", page_end, txns.len())
            );
            page_start = page_end;
        }

        info!(
            "Extracted {} transactions from blocks [{}, {})",
            txns.len(),
            start,
            end
        );
        Ok(txns)
    }

    /// Extracts `[start, end)` and writes the result to `output`. Returns the
    /// number of records written.
    pub async fn extract_to_file(
        &self,
        start: u64,
        end: u64,
        output: &Path,
        flush_batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let txns = self.extract(start, end, cancel).await?;
        let written = write_transactions(txns, output, flush_batch_size, cancel).await?;
        info!("Wrote {} replay transactions to {}", written, output.display());
        Ok(written)
    }
}
