// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use ed25519_dalek::PublicKey;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// A 21-byte account address: a one-byte network prefix followed by the last
/// 20 bytes of the keccak-256 digest of the owner's public key.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AccountAddress([u8; AccountAddress::LENGTH]);

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("AccountAddress parse error: {0}")]
pub struct AccountAddressParseError(String);

impl AccountAddress {
    pub const LENGTH: usize = 21;

    /// Network prefix byte carried by every mainnet-style address.
    pub const PREFIX: u8 = 0x41;

    pub const fn new(address: [u8; Self::LENGTH]) -> Self {
        Self(address)
    }

    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Keccak256::digest(public_key.as_bytes());
        let mut address = [0u8; Self::LENGTH];
        address[0] = Self::PREFIX;
        address[1..].copy_from_slice(&digest[digest.len() - (Self::LENGTH - 1)..]);
        Self(address)
    }

    pub fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, AccountAddressParseError> {
        let bytes = hex::decode(hex).map_err(|e| AccountAddressParseError(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The 20 address bytes without the network prefix, as used in ABI words.
    pub fn without_prefix(&self) -> &[u8] {
        &self.0[1..]
    }
}

impl TryFrom<&[u8]> for AccountAddress {
    type Error = AccountAddressParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let address = <[u8; Self::LENGTH]>::try_from(bytes).map_err(|_| {
            AccountAddressParseError(format!(
                "expected {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            ))
        })?;
        if address[0] != Self::PREFIX {
            return Err(AccountAddressParseError(format!(
                "unexpected address prefix {:#04x}",
                address[0]
            )));
        }
        Ok(Self(address))
    }
}

impl FromStr for AccountAddress {
    type Err = AccountAddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim_start_matches("0x"))
    }
}

impl Display for AccountAddress {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for AccountAddress {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "AccountAddress({})", self)
    }
}
