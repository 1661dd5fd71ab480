//! Serialized Signatures
//!
//! The network accepts a simple signature as
//! `base64(flag || signature || public_key)`. For Ed25519 that is
//! 1 + 64 + 32 = 97 bytes with flag `0x00`.

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::digest::SigningDigest;
use crate::error::{CustodyError, CustodyResult};

/// Flag used to disambiguate the signature schemes supported by Sui.
/// Only Ed25519 is produced here; the rest are recognized when decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    Ed25519,
    Secp256k1,
    Secp256r1,
    MultiSig,
    Bls12381,
    ZkLogin,
    Passkey,
}

impl SignatureScheme {
    pub fn flag(self) -> u8 {
        match self {
            SignatureScheme::Ed25519 => 0x00,
            SignatureScheme::Secp256k1 => 0x01,
            SignatureScheme::Secp256r1 => 0x02,
            SignatureScheme::MultiSig => 0x03,
            SignatureScheme::Bls12381 => 0x04,
            SignatureScheme::ZkLogin => 0x05,
            SignatureScheme::Passkey => 0x06,
        }
    }

    pub fn from_flag(flag: u8) -> CustodyResult<Self> {
        Ok(match flag {
            0x00 => SignatureScheme::Ed25519,
            0x01 => SignatureScheme::Secp256k1,
            0x02 => SignatureScheme::Secp256r1,
            0x03 => SignatureScheme::MultiSig,
            0x04 => SignatureScheme::Bls12381,
            0x05 => SignatureScheme::ZkLogin,
            0x06 => SignatureScheme::Passkey,
            other => {
                return Err(CustodyError::malformed_signature(format!(
                    "Unknown signature scheme flag 0x{:02x}",
                    other
                )))
            }
        })
    }
}

/// Signature components as returned by a signer: `r` then `s`, 32 bytes
/// each. The order is scheme-specific and must not be swapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSignatureComponents {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
}

impl RawSignatureComponents {
    pub fn new(r: impl Into<Vec<u8>>, s: impl Into<Vec<u8>>) -> Self {
        Self { r: r.into(), s: s.into() }
    }

    /// Decode hex components (case-insensitive, optional 0x prefix)
    pub fn from_hex(r: &str, s: &str) -> CustodyResult<Self> {
        let decode = |name: &str, value: &str| {
            hex::decode(value.trim_start_matches("0x")).map_err(|e| {
                CustodyError::malformed_signature(format!("Signature component {} is not hex", name))
                    .with_details(e.to_string())
            })
        };
        Ok(Self::new(decode("r", r)?, decode("s", s)?))
    }

    /// Split a 64-byte Ed25519 signature into its halves
    pub fn from_signature_bytes(signature: &[u8; 64]) -> Self {
        Self::new(&signature[..32], &signature[32..])
    }

    /// Concatenate r || s
    pub fn to_signature_bytes(&self) -> CustodyResult<[u8; 64]> {
        check_len("r", &self.r, 32)?;
        check_len("s", &self.s, 32)?;
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        Ok(out)
    }
}

fn check_len(name: &str, bytes: &[u8], expected: usize) -> CustodyResult<()> {
    if bytes.len() != expected {
        return Err(CustodyError::malformed_signature(format!(
            "{} must be {} bytes, got {}",
            name,
            expected,
            bytes.len()
        )));
    }
    Ok(())
}

/// `flag || signature || public_key`, bound to one transaction digest
#[derive(Clone, PartialEq, Eq)]
pub struct SerializedSignature([u8; SerializedSignature::LENGTH]);

impl SerializedSignature {
    pub const LENGTH: usize = 1 + 64 + 32;

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    pub fn scheme(&self) -> CustodyResult<SignatureScheme> {
        SignatureScheme::from_flag(self.0[0])
    }

    pub fn signature_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.0[1..65]);
        out
    }

    pub fn public_key(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[65..]);
        out
    }

    /// Standard base64 with padding, no line wraps
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(encoded: &str) -> CustodyResult<Self> {
        let bytes = STANDARD.decode(encoded).map_err(|e| {
            CustodyError::malformed_signature("Serialized signature is not base64").with_details(e.to_string())
        })?;
        let arr: [u8; Self::LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
            CustodyError::malformed_signature(format!(
                "Serialized signature must be {} bytes, got {}",
                Self::LENGTH,
                v.len()
            ))
        })?;
        let sig = Self(arr);
        sig.scheme()?;
        Ok(sig)
    }

    /// Strict Ed25519 verification of this signature over `digest`
    pub fn verify(&self, digest: &SigningDigest) -> CustodyResult<()> {
        if self.scheme()? != SignatureScheme::Ed25519 {
            return Err(CustodyError::malformed_signature("Only Ed25519 signatures can be verified"));
        }
        let key = VerifyingKey::from_bytes(&self.public_key()).map_err(|e| {
            CustodyError::malformed_signature("Invalid Ed25519 public key").with_details(e.to_string())
        })?;
        let signature = Signature::from_bytes(&self.signature_bytes());
        key.verify_strict(digest.as_bytes(), &signature).map_err(|e| {
            CustodyError::malformed_signature("Signature does not verify against the transaction digest")
                .with_details(e.to_string())
        })
    }
}

impl fmt::Debug for SerializedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedSignature({})", self.to_base64())
    }
}

/// Assemble `0x00 || r || s || public_key`
pub fn assemble(sig: &RawSignatureComponents, public_key: &[u8]) -> CustodyResult<SerializedSignature> {
    let signature = sig.to_signature_bytes()?;
    check_len("public key", public_key, 32)?;

    let mut out = [0u8; SerializedSignature::LENGTH];
    out[0] = SignatureScheme::Ed25519.flag();
    out[1..65].copy_from_slice(&signature);
    out[65..].copy_from_slice(public_key);
    Ok(SerializedSignature(out))
}
