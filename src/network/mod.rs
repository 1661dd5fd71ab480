//! Network Client
//!
//! The capability the builder and orchestrator need from a Sui fullnode.
//! [`SuiRpcClient`] is the JSON-RPC implementation; tests substitute an
//! in-memory one.

pub mod rpc;

pub use rpc::SuiRpcClient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{CustodyError, CustodyResult};
use crate::tx::SerializedSignature;
use crate::types::{ObjectDigest, ObjectId, ObjectRef, SuiAddress};

/// Fully qualified SUI coin type
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

/// A coin owned by an address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub coin_object_id: ObjectId,
    #[serde(with = "u64_string")]
    pub version: u64,
    pub digest: ObjectDigest,
    #[serde(with = "u64_string")]
    pub balance: u64,
    #[serde(default)]
    pub coin_type: String,
}

impl Coin {
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.coin_object_id, self.version, self.digest)
    }
}

/// One page of `suix_getCoins`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPage {
    pub data: Vec<Coin>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Who owns an object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    AddressOwner(SuiAddress),
    ObjectOwner(SuiAddress),
    Shared {
        #[serde(with = "u64_string")]
        initial_shared_version: u64,
    },
    Immutable,
}

/// Current reference and ownership of an object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectInfo {
    pub object_ref: ObjectRef,
    pub owner: Owner,
}

/// Execution status reported by effects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Success)
    }

    /// `"success"` or `"failure"`
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failure { .. } => "failure",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExecutionStatus::Success => None,
            ExecutionStatus::Failure { error } => Some(error),
        }
    }
}

/// Gas charged by an execution or dry run, in MIST
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCostSummary {
    #[serde(with = "u64_string")]
    pub computation_cost: u64,
    #[serde(with = "u64_string")]
    pub storage_cost: u64,
    #[serde(with = "u64_string")]
    pub storage_rebate: u64,
    #[serde(default, with = "u64_string")]
    pub non_refundable_storage_fee: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DryRunResult {
    pub status: ExecutionStatus,
    pub gas_used: GasCostSummary,
}

/// Outcome of `sui_executeTransactionBlock` once effects are certified
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutionResponse {
    pub digest: String,
    pub status: ExecutionStatus,
    pub raw_effects: Value,
}

/// What the builder and orchestrator need from the network. Implementations
/// must be safe for concurrent independent use.
pub trait NetworkClient: Send + Sync {
    fn reference_gas_price(&self) -> CustodyResult<u64>;

    fn get_coins(
        &self,
        owner: &SuiAddress,
        coin_type: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> CustodyResult<CoinPage>;

    fn get_object(&self, object_id: &ObjectId) -> CustodyResult<ObjectInfo>;

    /// Execute `tx_bytes` without committing
    fn dry_run(&self, tx_bytes: &[u8]) -> CustodyResult<DryRunResult>;

    /// Submit and wait for effects certification
    fn execute(&self, tx_bytes: &[u8], signature: &SerializedSignature) -> CustodyResult<ExecutionResponse>;
}

/// Coins of `coin_type` owned by `owner`, across all pages.
/// A cursor the node has already handed out is a `Network` error.
pub fn owned_coins(network: &dyn NetworkClient, owner: &SuiAddress, coin_type: &str) -> CustodyResult<Vec<Coin>> {
    let mut coins = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = network.get_coins(owner, coin_type, cursor.as_deref(), None)?;
        coins.extend(page.data);
        match page.next_cursor {
            Some(next) if page.has_next_page => {
                if !seen.insert(next.clone()) {
                    return Err(CustodyError::network("Coin pagination repeated a cursor")
                        .with_details(format!("cursor {}", next)));
                }
                cursor = Some(next);
            }
            _ => break,
        }
    }
    Ok(coins)
}

/// Total balance of `coin_type` held by `owner`
pub fn owned_balance(network: &dyn NetworkClient, owner: &SuiAddress, coin_type: &str) -> CustodyResult<u128> {
    Ok(owned_coins(network, owner, coin_type)?
        .iter()
        .map(|c| c.balance as u128)
        .sum())
}

/// Sui JSON-RPC renders 64-bit integers as decimal strings; accept both.
pub(crate) mod u64_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(n),
        }
    }
}
