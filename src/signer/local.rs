//! In-process Ed25519 signer

use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::{HashFunction, SignerDirectory};
use crate::error::{CustodyError, CustodyResult};
use crate::tx::RawSignatureComponents;
use crate::types::SuiAddress;

/// Holds one key under one key id. Signs only for its own address and only
/// pre-hashed 32-byte payloads.
pub struct LocalKeySigner {
    key_id: String,
    signing_key: SigningKey,
}

impl LocalKeySigner {
    pub fn generate(key_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(key_id: impl Into<String>, seed: [u8; 32]) -> Self {
        let seed = Zeroizing::new(seed);
        Self {
            key_id: key_id.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn from_seed_hex(key_id: impl Into<String>, seed_hex: &str) -> CustodyResult<Self> {
        let bytes = Zeroizing::new(hex::decode(seed_hex.trim_start_matches("0x"))?);
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CustodyError::config("Ed25519 seed must be 32 bytes"))?;
        Ok(Self::from_seed(key_id, seed))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn address(&self) -> SuiAddress {
        SuiAddress::from_public_key(&self.public_key())
    }
}

impl SignerDirectory for LocalKeySigner {
    fn public_key_hex(&self, key_id: &str) -> CustodyResult<String> {
        if key_id != self.key_id {
            return Err(CustodyError::signer(format!("Unknown key id '{}'", key_id)));
        }
        Ok(hex::encode(self.public_key()))
    }

    fn sign_digest(
        &self,
        sign_with: &str,
        digest_hex: &str,
        hash_function: HashFunction,
    ) -> CustodyResult<RawSignatureComponents> {
        if hash_function != HashFunction::NotApplicable {
            return Err(CustodyError::signer("Only pre-hashed payloads are signed"));
        }
        let own = self.address();
        if !sign_with.eq_ignore_ascii_case(&own.to_hex()) {
            return Err(CustodyError::signer(format!("Key does not sign for {}", sign_with)));
        }

        let digest = hex::decode(digest_hex.trim_start_matches("0x"))
            .map_err(|e| CustodyError::signer("Payload is not hex").with_details(e.to_string()))?;
        if digest.len() != 32 {
            return Err(CustodyError::signer(format!("Payload must be a 32-byte digest, got {} bytes", digest.len())));
        }

        let signature = self.signing_key.sign(&digest);
        Ok(RawSignatureComponents::from_signature_bytes(&signature.to_bytes()))
    }
}
