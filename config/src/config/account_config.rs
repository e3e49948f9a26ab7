// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, StressConfig, config_sanitizer::ConfigSanitizer};
use serde::{Deserialize, Serialize};
use stress_types::{AccountAddress, TransactionSigner};

/// USDT contract on mainnet, as 21-byte hex.
const DEFAULT_TRIGGER_CONTRACT_ADDRESS: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

/// The sending account and the parameters of every synthesized contract.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    /// 32-byte ed25519 private key as 64 hex chars
    pub private_key: String,
    /// Receiver of transfers, 21-byte hex address
    pub to_address: String,
    pub fungible_asset_id: String,
    pub trigger_contract_address: String,
    pub transfer_amount: u64,
    pub transfer_fungible_asset_amount: u64,
    pub trigger_contract_amount: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            private_key: String::new(),
            to_address: String::new(),
            fungible_asset_id: "1000001".to_string(),
            trigger_contract_address: DEFAULT_TRIGGER_CONTRACT_ADDRESS.to_string(),
            transfer_amount: 1,
            transfer_fungible_asset_amount: 1,
            trigger_contract_amount: 1,
        }
    }
}

impl AccountConfig {
    pub fn signer(&self) -> Result<TransactionSigner, Error> {
        TransactionSigner::from_private_key_hex(&self.private_key).map_err(|error| {
            Error::ConfigSanitizerFailed(Self::get_sanitizer_name(), error.to_string())
        })
    }

    pub fn to_address(&self) -> Result<AccountAddress, Error> {
        Self::parse_address("to_address", &self.to_address)
    }

    pub fn trigger_contract_address(&self) -> Result<AccountAddress, Error> {
        Self::parse_address("trigger_contract_address", &self.trigger_contract_address)
    }

    fn parse_address(field: &str, value: &str) -> Result<AccountAddress, Error> {
        value.parse().map_err(|error| {
            Error::ConfigSanitizerFailed(
                Self::get_sanitizer_name(),
                format!("{} {:?} is invalid: {}", field, value, error),
            )
        })
    }
}

impl ConfigSanitizer for AccountConfig {
    fn sanitize(stress_config: &StressConfig) -> Result<(), Error> {
        let account = &stress_config.account;
        if account.private_key.is_empty() {
            return Err(Error::Missing("account.private_key"));
        }
        if account.to_address.is_empty() {
            return Err(Error::Missing("account.to_address"));
        }
        account.signer()?;
        account.to_address()?;
        account.trigger_contract_address()?;

        if account.transfer_amount == 0
            || account.transfer_fungible_asset_amount == 0
            || account.trigger_contract_amount == 0
        {
            return Err(Error::ConfigSanitizerFailed(
                Self::get_sanitizer_name(),
                format!(
                    "transfer {}, fungible asset {}, trigger contract {} amounts must be > 0",
                    account.transfer_amount,
                    account.transfer_fungible_asset_amount,
                    account.trigger_contract_amount
                ),
            ));
        }
        Ok(())
    }
}
