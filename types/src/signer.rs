// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::{account_address::AccountAddress, hash::HashValue};
use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer};
use rand::{SeedableRng, rngs::StdRng};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Transaction carries no signature")]
    MissingSignature,
}

/// TransactionSigner holds the key pair every synthesized transaction is signed
/// with, plus the account address derived from its public key.
pub struct TransactionSigner {
    keypair: Keypair,
    address: AccountAddress,
}

impl TransactionSigner {
    pub fn new(secret: SecretKey) -> Self {
        let public = PublicKey::from(&secret);
        let address = AccountAddress::from_public_key(&public);
        Self {
            keypair: Keypair { secret, public },
            address,
        }
    }

    /// Parses a 32-byte private key given as 64 hex characters.
    pub fn from_private_key_hex(private_key: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(private_key.trim_start_matches("0x"))
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        let secret = SecretKey::from_bytes(&bytes)
            .map_err(|e| SigningError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::new(secret))
    }

    /// Deterministic signer for tests and local runs.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let mut rng = StdRng::from_seed(seed);
        Self::generate(&mut rng)
    }

    pub fn generate<R: rand_core::CryptoRng + rand_core::RngCore>(rng: &mut R) -> Self {
        Self::new(SecretKey::generate(rng))
    }

    /// Signs a 32-byte digest.
    pub fn sign_digest(&self, digest: &HashValue) -> Signature {
        self.keypair.sign(digest.as_bytes())
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keypair.public
    }
}

impl fmt::Debug for TransactionSigner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TransactionSigner")
            .field("address", &self.address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};
    use ed25519_dalek::Verifier;

    #[test]
    fn test_from_private_key_hex() {
        let hex = "0101010101010101010101010101010101010101010101010101010101010101";
        let signer = assert_ok!(TransactionSigner::from_private_key_hex(hex));
        let prefixed = assert_ok!(TransactionSigner::from_private_key_hex(&format!("0x{}", hex)));
        assert_eq!(signer.address(), prefixed.address());

        assert_err!(TransactionSigner::from_private_key_hex("0101"));
        assert_err!(TransactionSigner::from_private_key_hex("xyz"));
    }

    #[test]
    fn test_sign_digest() {
        let signer = TransactionSigner::from_seed([5u8; 32]);
        let digest = HashValue::sha256_of(b"payload");
        let signature = signer.sign_digest(&digest);
        assert_ok!(signer.public_key().verify(digest.as_bytes(), &signature));
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = TransactionSigner::from_seed([5u8; 32]);
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains(&signer.address().to_hex()));
        assert!(!rendered.contains("secret"));
    }
}
