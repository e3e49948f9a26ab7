// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// A 32-byte digest. Used for transaction identities and block hashes.
#[derive(Clone, Copy, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HashValue([u8; HashValue::LENGTH]);

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("HashValue decoding failed: {0}")]
pub struct HashValueParseError(String);

impl HashValue {
    /// The length of the hash in bytes.
    pub const LENGTH: usize = 32;

    pub const fn new(hash: [u8; Self::LENGTH]) -> Self {
        HashValue(hash)
    }

    pub const fn zero() -> Self {
        HashValue([0; Self::LENGTH])
    }

    /// SHA-256 over the given bytes.
    pub fn sha256_of(buffer: &[u8]) -> Self {
        let digest = Sha256::digest(buffer);
        let mut hash = [0u8; Self::LENGTH];
        hash.copy_from_slice(digest.as_slice());
        HashValue(hash)
    }

    pub fn from_slice<T: AsRef<[u8]>>(bytes: T) -> Result<Self, HashValueParseError> {
        <[u8; Self::LENGTH]>::try_from(bytes.as_ref())
            .map(Self)
            .map_err(|_| {
                HashValueParseError(format!(
                    "expected {} bytes, got {}",
                    Self::LENGTH,
                    bytes.as_ref().len()
                ))
            })
    }

    pub fn from_hex<T: AsRef<[u8]>>(hex: T) -> Result<Self, HashValueParseError> {
        let bytes = hex::decode(hex).map_err(|e| HashValueParseError(e.to_string()))?;
        Self::from_slice(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl AsRef<[u8]> for HashValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for HashValue {
    type Err = HashValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashValue::from_hex(s.trim_start_matches("0x"))
    }
}

impl Display for HashValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for HashValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "HashValue({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_of_known_vector() {
        // sha256("abc")
        assert_eq!(
            HashValue::sha256_of(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hex_parsing() {
        let hash = HashValue::sha256_of(b"stress");
        assert_eq!(hash, hash.to_hex().parse::<HashValue>().unwrap());
        assert_eq!(hash, format!("0x{}", hash).parse::<HashValue>().unwrap());
        assert!("abcd".parse::<HashValue>().is_err());
        assert!("zz".parse::<HashValue>().is_err());
    }
}
