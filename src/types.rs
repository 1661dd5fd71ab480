//! Shared types
//!
//! Addresses, object identifiers and wallet identity. Addresses follow the
//! Sui format: https://docs.sui.io/concepts/sui-move-concepts/addresses

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CustodyError, CustodyResult};
use crate::tx::SignatureScheme;

pub(crate) type Blake2b256 = Blake2b<U32>;

/// Sui address is 32 bytes, displayed as 0x-prefixed hex
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuiAddress(#[serde(with = "crate::serde_bytes::address")] pub [u8; 32]);

/// Object IDs share the address format
pub type ObjectId = SuiAddress;

impl SuiAddress {
    pub const LENGTH: usize = 32;

    /// Sui framework package, `0x2`
    pub const FRAMEWORK: SuiAddress = SuiAddress::from_low_byte(0x02);
    /// Shared clock object, `0x6`
    pub const CLOCK: SuiAddress = SuiAddress::from_low_byte(0x06);
    /// Shared randomness object, `0x8`
    pub const RANDOM: SuiAddress = SuiAddress::from_low_byte(0x08);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    const fn from_low_byte(b: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = b;
        Self(bytes)
    }

    /// Derive address from an Ed25519 public key
    /// address = blake2b_256(flag || public_key)
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = Blake2b256::new();
        hasher.update([SignatureScheme::Ed25519.flag()]);
        hasher.update(public_key);
        Self(hasher.finalize().into())
    }

    /// Parse a hex literal that may omit leading zeros (`0x2`, `0x6`).
    /// Used for package and object identifiers.
    pub fn from_hex_literal(s: &str) -> CustodyResult<Self> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| CustodyError::invalid_address(format!("Missing 0x prefix: {}", s)))?;
        if hex_part.is_empty() || hex_part.len() > 64 {
            return Err(CustodyError::invalid_address(format!(
                "Expected 1 to 64 hex digits, got {}",
                hex_part.len()
            )));
        }
        Self::decode_hex(&format!("{:0>64}", hex_part))
    }

    fn decode_hex(hex_part: &str) -> CustodyResult<Self> {
        let bytes = hex::decode(hex_part)
            .map_err(|e| CustodyError::invalid_address(format!("Invalid hex: {}", e)))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CustodyError::invalid_address("Invalid address length"))?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

/// Strict parse: `0x` followed by exactly 64 hex digits.
impl FromStr for SuiAddress {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .strip_prefix("0x")
            .ok_or_else(|| CustodyError::invalid_address(format!("Missing 0x prefix: {}", s)))?;
        if hex_part.len() != 64 {
            return Err(CustodyError::invalid_address(format!(
                "Expected 64 hex digits, got {}",
                hex_part.len()
            )));
        }
        Self::decode_hex(hex_part)
    }
}

impl fmt::Display for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Object content digest, base58 on the JSON-RPC wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDigest(#[serde(with = "crate::serde_bytes::digest")] pub [u8; 32]);

impl ObjectDigest {
    pub fn from_base58(s: &str) -> CustodyResult<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CustodyError::parse_error(format!("Invalid base58 digest: {}", e)))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CustodyError::parse_error("Object digest must be 32 bytes"))?;
        Ok(Self(arr))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for ObjectDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

/// Object reference (ID, version, digest)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: ObjectId,
    pub version: u64,
    pub digest: ObjectDigest,
}

impl ObjectRef {
    pub fn new(object_id: ObjectId, version: u64, digest: ObjectDigest) -> Self {
        Self { object_id, version, digest }
    }
}

/// Signing identity: the custody key's public key and the address derived
/// from it. Re-derived on every fetch, never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletIdentity {
    pub address: SuiAddress,
    #[serde(rename = "publicKeyHex", with = "crate::serde_bytes::hex32")]
    pub public_key: [u8; 32],
}

impl WalletIdentity {
    pub fn from_public_key(public_key: [u8; 32]) -> Self {
        Self {
            address: SuiAddress::from_public_key(&public_key),
            public_key,
        }
    }

    /// Parse the raw hex public key returned by a signer directory
    pub fn from_public_key_hex(public_key_hex: &str) -> CustodyResult<Self> {
        let bytes = hex::decode(public_key_hex.trim_start_matches("0x"))
            .map_err(|e| CustodyError::signer(format!("Invalid public key hex: {}", e)))?;
        let public_key: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CustodyError::signer(format!("Ed25519 public key must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self::from_public_key(public_key))
    }
}

/// Wallet summary: identity plus the SUI balance held on-chain
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub address: SuiAddress,
    pub public_key_hex: String,
    pub balance_mist: String,
    pub balance_sui: String,
}

/// JSON envelope for CLI output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CustodyError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: CustodyError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            r#"{"success":false,"error":{"code":"internal","message":"Serialization failed"}}"#.to_string()
        })
    }
}
