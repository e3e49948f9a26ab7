// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, StressConfig, config_sanitizer::ConfigSanitizer};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatisticConfig {
    /// Blocks with fewer transactions do not open or close the measured range
    pub min_block_transactions: usize,
    /// Nominal block production interval of the network
    pub block_interval_ms: u64,
}

impl Default for StatisticConfig {
    fn default() -> Self {
        Self {
            min_block_transactions: 50,
            block_interval_ms: 3000,
        }
    }
}

impl ConfigSanitizer for StatisticConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        if stress_config.statistic.block_interval_ms == 0 {
            return Err(Error::ConfigSanitizerFailed(
                Self::get_sanitizer_name(),
                "block_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
