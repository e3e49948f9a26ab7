// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{
    Error, StressConfig,
    config_sanitizer::{ConfigSanitizer, sanitize_url},
};
use serde::{Deserialize, Serialize};
use stress_types::HashValue;

/// Where transactions take their reference block from.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Reference block number used when `update` is off
    pub block_number: u64,
    /// Reference block hash (64 hex chars) used when `update` is off
    pub block_hash: String,
    /// Poll the head block at `url` and refresh the reference periodically
    pub update: bool,
    pub url: Option<String>,
    pub refresh_interval_secs: u64,
    /// How far in the future the first expiration is placed
    pub validity_window_secs: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            block_number: 0,
            block_hash: HashValue::zero().to_hex(),
            update: false,
            url: None,
            refresh_interval_secs: 60,
            validity_window_secs: 24 * 60 * 60,
        }
    }
}

impl ReferenceConfig {
    pub fn block_hash(&self) -> Result<HashValue, Error> {
        self.block_hash.parse().map_err(|error| {
            Error::ConfigSanitizerFailed(
                Self::get_sanitizer_name(),
                format!("block_hash {:?} is invalid: {}", self.block_hash, error),
            )
        })
    }
}

impl ConfigSanitizer for ReferenceConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();
        let reference = &stress_config.reference;

        if reference.update {
            let url = reference.url.as_deref().ok_or(Error::Missing("reference.url"))?;
            sanitize_url(&sanitizer_name, "reference.url", url)?;
            if reference.refresh_interval_secs == 0 {
                return Err(Error::ConfigSanitizerFailed(
                    sanitizer_name,
                    "refresh_interval_secs must be > 0".to_string(),
                ));
            }
        } else {
            reference.block_hash()?;
        }

        if reference.validity_window_secs == 0 {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                "validity_window_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
