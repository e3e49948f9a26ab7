// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{
    Error, StressConfig,
    config_sanitizer::{ConfigSanitizer, sanitize_url},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Endpoints to submit to; each transaction picks one at random
    pub urls: Vec<String>,
    /// Broadcast the generated transaction files
    pub generated: bool,
    /// Broadcast the replayed transaction file
    pub replayed: bool,
    /// Write the ID of every submitted transaction next to its source file
    pub save_transaction_ids: bool,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            urls: vec![],
            generated: true,
            replayed: false,
            save_transaction_ids: true,
        }
    }
}

impl ConfigSanitizer for BroadcastConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();
        for url in &stress_config.broadcast.urls {
            sanitize_url(&sanitizer_name, "broadcast.urls", url)?;
        }
        Ok(())
    }
}
