// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Throughput of a block range, measured from the blocks themselves.

use anyhow::{Context, Result, bail};
use std::path::Path;
use stress_config::config::StatisticConfig;
use stress_logger::prelude::*;
use stress_rest_client::ChainClient;
use stress_types::Block;

/// Blocks requested per page.
pub const STATISTIC_PAGE_SIZE: u64 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatisticSettings {
    /// Blocks with fewer transactions do not open or close the measured window
    pub min_block_transactions: usize,
    pub block_interval_ms: u64,
}

impl From<&StatisticConfig> for StatisticSettings {
    fn from(config: &StatisticConfig) -> Self {
        Self {
            min_block_transactions: config.min_block_transactions,
            block_interval_ms: config.block_interval_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockStatistic {
    pub first_block: u64,
    pub last_block: u64,
    /// Transactions in `[first_block, last_block)`
    pub total_transactions: u64,
    pub max_block_size: usize,
    pub min_block_size: usize,
    pub actual_ms: i64,
    pub expected_ms: i64,
    pub tps: f64,
    pub miss_block_rate: f64,
}

impl BlockStatistic {
    /// Loads the blocks of `[start, end]` and measures them.
    pub async fn collect(
        client: &dyn ChainClient,
        start: u64,
        end: u64,
        settings: StatisticSettings,
    ) -> Result<Self> {
        if start >= end {
            bail!("Invalid block range: start block {}, end block {}", start, end);
        }

        let range_end = end
            .checked_add(1)
            .with_context(|| format!("End block {} is out of range", end))?;

        let mut blocks = Vec::new();
        let mut page_start = start;
        while page_start < range_end {
            let page_end = page_start
                .saturating_add(STATISTIC_PAGE_SIZE)
                .min(range_end);
            let page = client
                .get_blocks_in_range(page_start, page_end)
                .await
                .with_context(|| {
                    format!(
                        "Failed to fetch blocks [{}, {}) from {}",
                        page_start,
                        page_end,
                        client.endpoint()
                    )
                })?;
            blocks.extend(page);
            page_start = page_end;
        }
        if blocks.is_empty() {
            bail!("No blocks found in [{}, {}]", start, end);
        }
        Self::from_blocks(&blocks, settings)
    }

    /// Measures blocks sorted by number. The window runs from the first to the
    /// last block holding at least `min_block_transactions`.
    pub fn from_blocks(blocks: &[Block], settings: StatisticSettings) -> Result<Self> {
        let busy = |block: &&Block| block.num_transactions() >= settings.min_block_transactions;
        let (first, last) = match (blocks.iter().find(busy), blocks.iter().rev().find(busy)) {
            (Some(first), Some(last)) if first.number() < last.number() => (first, last),
            _ => bail!(
                "Fewer than two blocks hold at least {} transactions",
                settings.min_block_transactions
            ),
        };
        info!("Measuring blocks [{}, {})", first.number(), last.number());

        let window: Vec<_> = blocks
            .iter()
            .filter(|block| (first.number()..last.number()).contains(&block.number()))
            .map(Block::num_transactions)
            .collect();
        let total_transactions = window.iter().map(|size| *size as u64).sum::<u64>();

        let actual_ms = last
            .timestamp()
            .checked_sub(first.timestamp())
            .with_context(|| {
                format!(
                    "Timestamps of blocks {} and {} are out of range",
                    first.number(),
                    last.number()
                )
            })?;
        if actual_ms <= 0 {
            bail!(
                "Block {} is not later than block {}",
                last.number(),
                first.number()
            );
        }
        let expected_ms = (last.number() - first.number())
            .checked_mul(settings.block_interval_ms)
            .and_then(|ms| i64::try_from(ms).ok())
            .with_context(|| {
                format!(
                    "Expected duration of {} blocks at {} ms overflows",
                    last.number() - first.number(),
                    settings.block_interval_ms
                )
            })?;

        Ok(Self {
            first_block: first.number(),
            last_block: last.number(),
            total_transactions,
            max_block_size: window.iter().copied().max().unwrap_or(0),
            min_block_size: window.iter().copied().min().unwrap_or(0),
            actual_ms,
            expected_ms,
            tps: total_transactions as f64 * 1000.0 / actual_ms as f64,
            miss_block_rate: (actual_ms - expected_ms) as f64 / actual_ms as f64,
        })
    }

    pub fn report(&self) -> String {
        format!(
            "Stress test report:\n\
             block range: [{}, {})\n\
             total transactions: {}\n\
             cost time: {} minutes\n\
             max block size: {}\n\
             min block size: {}\n\
             tps: {:.2}\n\
             miss block rate: {:.4}\n",
            self.first_block,
            self.last_block,
            self.total_transactions,
            self.actual_ms / 60_000,
            self.max_block_size,
            self.min_block_size,
            self.tps,
            self.miss_block_rate
        )
    }

    pub async fn write_report(&self, output: &Path) -> Result<()> {
        let report = self.report();
        for line in report.lines() {
            info!("{}", line);
        }
        tokio::fs::write(output, report)
            .await
            .with_context(|| format!("Failed to write statistic report {}", output.display()))
    }
}
