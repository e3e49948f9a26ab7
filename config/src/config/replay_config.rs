// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{
    Error, StressConfig,
    config_sanitizer::{ConfigSanitizer, sanitize_url},
};
use serde::{Deserialize, Serialize};

/// Extraction of historical transactions over `[start_block_number, end_block_number)`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub enable: bool,
    pub url: Option<String>,
    pub start_block_number: u64,
    pub end_block_number: u64,
}

impl ConfigSanitizer for ReplayConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();
        let replay = &stress_config.replay;
        if !replay.enable {
            return Ok(());
        }

        let url = replay.url.as_deref().ok_or(Error::Missing("replay.url"))?;
        sanitize_url(&sanitizer_name, "replay.url", url)?;
        if replay.start_block_number > replay.end_block_number {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                format!(
                    "start_block_number {} must be <= end_block_number {}",
                    replay.start_block_number, replay.end_block_number
                ),
            ));
        }
        Ok(())
    }
}
