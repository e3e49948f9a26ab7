// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{
    AccountConfig, BroadcastConfig, Error, PersistableConfig, ReferenceConfig, ReplayConfig,
    StatisticConfig, config_sanitizer::ConfigSanitizer,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stress_types::transaction::TransactionType;

/// The percentages of the transaction mix must add up to exactly this.
pub const TRANSACTION_MIX_TOTAL: u32 = 100;

/// The top-level config of the stress harness.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// Run the generation phase
    pub generate: bool,
    pub total_transactions: usize,
    /// Larger totals are split into several output files of at most this many records
    pub single_task_transactions: usize,
    /// Broadcast rate, in transactions per second
    pub tps: usize,
    pub num_generator_workers: usize,
    /// Output file flush and progress log interval, in records
    pub flush_batch_size: usize,
    /// Seed for the producers' type draws. Random when unset.
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    /// Percentage weight per transaction type, in insertion order
    pub transaction_mix: IndexMap<TransactionType, u8>,

    pub reference: ReferenceConfig,
    pub account: AccountConfig,
    pub replay: ReplayConfig,
    pub broadcast: BroadcastConfig,
    pub statistic: StatisticConfig,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            generate: true,
            total_transactions: 1_000_000,
            single_task_transactions: 1_000_000,
            tps: 1000,
            num_generator_workers: num_cpus::get(),
            flush_batch_size: 1000,
            seed: None,
            output_dir: PathBuf::from("stress-test-output"),
            transaction_mix: IndexMap::from([(TransactionType::Transfer, 100)]),
            reference: ReferenceConfig::default(),
            account: AccountConfig::default(),
            replay: ReplayConfig::default(),
            broadcast: BroadcastConfig::default(),
            statistic: StatisticConfig::default(),
        }
    }
}

impl StressConfig {
    /// Loads the config at `path` and runs every sanitizer over it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config = Self::load_config(path)?;
        config.sanitize()?;
        Ok(config)
    }

    pub fn sanitize(&self) -> Result<(), Error> {
        <Self as ConfigSanitizer>::sanitize(self)
    }
}

impl ConfigSanitizer for StressConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();

        if stress_config.generate && stress_config.total_transactions == 0 {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                "total_transactions must be > 0".to_string(),
            ));
        }
        for (field, value) in [
            ("single_task_transactions", stress_config.single_task_transactions),
            ("tps", stress_config.tps),
            ("num_generator_workers", stress_config.num_generator_workers),
            ("flush_batch_size", stress_config.flush_batch_size),
        ] {
            if value == 0 {
                return Err(Error::ConfigSanitizerFailed(
                    sanitizer_name,
                    format!("{} must be > 0", field),
                ));
            }
        }

        let total_weight: u32 = stress_config
            .transaction_mix
            .values()
            .map(|weight| *weight as u32)
            .sum();
        if total_weight != TRANSACTION_MIX_TOTAL {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                format!(
                    "transaction_mix weights must sum to {}, got {}",
                    TRANSACTION_MIX_TOTAL, total_weight
                ),
            ));
        }

        ReferenceConfig::sanitize(stress_config)?;
        AccountConfig::sanitize(stress_config)?;
        ReplayConfig::sanitize(stress_config)?;
        BroadcastConfig::sanitize(stress_config)?;
        StatisticConfig::sanitize(stress_config)
    }
}
