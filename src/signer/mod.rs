//! Signer Directory
//!
//! The custody service that owns the signing key, seen through two calls:
//! look up the public key for a key reference, and sign a digest that is
//! already hashed. [`TurnkeySigner`] talks to the remote service;
//! [`LocalKeySigner`] keeps an in-process key for tests and local runs.

pub mod local;
pub mod turnkey;

pub use local::LocalKeySigner;
pub use turnkey::TurnkeySigner;

use serde::{Deserialize, Serialize};

use crate::error::CustodyResult;
use crate::tx::RawSignatureComponents;

/// Hashing the signer applies to the payload before signing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashFunction {
    /// Payload is already a digest; sign it as is
    #[serde(rename = "HASH_FUNCTION_NOT_APPLICABLE")]
    NotApplicable,
    #[serde(rename = "HASH_FUNCTION_SHA256")]
    Sha256,
}

/// Capability interface over the key-custody service. Implementations must
/// be safe for concurrent independent use and must never retry a signing
/// request on their own.
pub trait SignerDirectory: Send + Sync {
    /// Raw Ed25519 public key for `key_id`, hex encoded
    fn public_key_hex(&self, key_id: &str) -> CustodyResult<String>;

    /// Sign `digest_hex` with the key behind `sign_with` (the wallet address)
    fn sign_digest(
        &self,
        sign_with: &str,
        digest_hex: &str,
        hash_function: HashFunction,
    ) -> CustodyResult<RawSignatureComponents>;
}
