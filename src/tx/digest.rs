//! Signing Digest
//!
//! The signer never sees raw transaction bytes. It signs
//! `blake2b_256(intent || tx_bytes)`, where the 3-byte intent scopes the
//! signature to transaction data, intent version 0, Sui app id.

use blake2::Digest;
use std::fmt;

use super::builder::UnsignedTransaction;
use crate::types::Blake2b256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IntentScope {
    TransactionData = 0,
    TransactionEffects = 1,
    CheckpointSummary = 2,
    PersonalMessage = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IntentVersion {
    V0 = 0,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AppId {
    Sui = 0,
}

/// Intent header prepended to every signed message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intent {
    pub scope: IntentScope,
    pub version: IntentVersion,
    pub app_id: AppId,
}

impl Intent {
    pub const fn sui_transaction() -> Self {
        Self {
            scope: IntentScope::TransactionData,
            version: IntentVersion::V0,
            app_id: AppId::Sui,
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.scope as u8, self.version as u8, self.app_id as u8]
    }
}

/// The exact 32 bytes handed to the signer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SigningDigest(pub [u8; 32]);

impl SigningDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, as sent to the signer
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SigningDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningDigest({})", self.to_hex())
    }
}

/// Prepend `intent` to `bytes`
pub fn message_with_intent(intent: Intent, bytes: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(3 + bytes.len());
    message.extend_from_slice(&intent.to_bytes());
    message.extend_from_slice(bytes);
    message
}

/// Digest of raw transaction bytes under the transaction intent
pub fn digest_bytes(tx_bytes: &[u8]) -> SigningDigest {
    let mut hasher = Blake2b256::new();
    hasher.update(message_with_intent(Intent::sui_transaction(), tx_bytes));
    SigningDigest(hasher.finalize().into())
}

/// Signing digest of a built transaction
pub fn digest(tx: &UnsignedTransaction) -> SigningDigest {
    digest_bytes(tx.as_bytes())
}
