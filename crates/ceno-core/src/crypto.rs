//! Key material for the signaling key scheme.
//!
//! The private half of a signaling key is a 32-byte Ed25519 seed. Its public
//! routing key is the SHA-256 hash of the Ed25519 verifying key, which is what
//! readers of the request form use to locate the records.

use ed25519_dalek::SigningKey;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::constants::{CRYPTO_KEY_LENGTH, SEED_LENGTH};

/// Compute the SHA-256 hash of the given data.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Generate a fresh private seed using the OS random number generator.
#[must_use]
pub fn generate_seed() -> [u8; SEED_LENGTH] {
    SigningKey::generate(&mut OsRng).to_bytes()
}

/// Generate a fresh symmetric crypto key.
#[must_use]
pub fn generate_crypto_key() -> [u8; CRYPTO_KEY_LENGTH] {
    let mut key = [0u8; CRYPTO_KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}

/// Derive the public routing key for a private seed.
#[must_use]
pub fn public_routing_key(seed: &[u8; SEED_LENGTH]) -> [u8; 32] {
    let verifying = SigningKey::from_bytes(seed).verifying_key();
    sha256(verifying.as_bytes())
}
