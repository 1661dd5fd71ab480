//! Sui JSON-RPC client
//!
//! Blocking JSON-RPC 2.0 over HTTPS against a fullnode. One instance is
//! shared by every flow in the process; it holds no per-request state.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{
    u64_string, CoinPage, DryRunResult, ExecutionResponse, ExecutionStatus, GasCostSummary, NetworkClient,
    ObjectInfo, Owner,
};
use crate::error::{CustodyError, CustodyResult};
use crate::tx::SerializedSignature;
use crate::types::{ObjectDigest, ObjectId, ObjectRef, SuiAddress};
use crate::utils::http;

/// Request type asking the fullnode to return only after effects are certified
pub const WAIT_FOR_EFFECTS_CERT: &str = "WaitForEffectsCert";

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResponse {
    #[serde(default)]
    data: Option<ObjectData>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectData {
    object_id: ObjectId,
    #[serde(with = "u64_string")]
    version: u64,
    digest: ObjectDigest,
    owner: Option<Owner>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Effects {
    status: ExecutionStatus,
    gas_used: GasCostSummary,
}

#[derive(Deserialize)]
struct DryRunResponse {
    effects: Effects,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    digest: String,
    #[serde(default)]
    effects: Option<Value>,
}

pub struct SuiRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl SuiRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CustodyResult<Self> {
        Ok(Self::with_client(http::build_client(timeout)?, url))
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One JSON-RPC round trip. RPC error objects become `Network` errors.
    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> CustodyResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        crate::log_debug!("network::rpc", "JSON-RPC request", method = method, id = id);

        let response = self.client.post(&self.url).json(&body).send()?;
        let response: RpcResponse = http::read_json(response)?;

        if let Some(err) = response.error {
            return Err(CustodyError::network(format!("{} failed", method))
                .with_details(format!("code {}: {}", err.code, err.message)));
        }
        let result = response
            .result
            .ok_or_else(|| CustodyError::network(format!("{} returned neither result nor error", method)))?;

        serde_json::from_value(result).map_err(|e| {
            CustodyError::parse_error(format!("Unexpected {} response", method)).with_details(e.to_string())
        })
    }
}

impl NetworkClient for SuiRpcClient {
    fn reference_gas_price(&self) -> CustodyResult<u64> {
        #[derive(Deserialize)]
        struct Price(#[serde(with = "u64_string")] u64);

        let Price(price) = self.call("suix_getReferenceGasPrice", json!([]))?;
        Ok(price)
    }

    fn get_coins(
        &self,
        owner: &SuiAddress,
        coin_type: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> CustodyResult<CoinPage> {
        self.call("suix_getCoins", json!([owner, coin_type, cursor, limit]))
    }

    fn get_object(&self, object_id: &ObjectId) -> CustodyResult<ObjectInfo> {
        let response: ObjectResponse = self.call("sui_getObject", json!([object_id, {"showOwner": true}]))?;

        let data = match (response.data, response.error) {
            (Some(data), _) => data,
            (None, Some(err)) => {
                return Err(CustodyError::network(format!("Object {} is unavailable", object_id)).with_details(err.to_string()))
            }
            (None, None) => return Err(CustodyError::network(format!("Object {} not found", object_id))),
        };
        let owner = data
            .owner
            .ok_or_else(|| CustodyError::parse_error(format!("Object {} response lacks an owner", object_id)))?;

        Ok(ObjectInfo {
            object_ref: ObjectRef::new(data.object_id, data.version, data.digest),
            owner,
        })
    }

    fn dry_run(&self, tx_bytes: &[u8]) -> CustodyResult<DryRunResult> {
        let response: DryRunResponse = self.call("sui_dryRunTransactionBlock", json!([STANDARD.encode(tx_bytes)]))?;
        Ok(DryRunResult {
            status: response.effects.status,
            gas_used: response.effects.gas_used,
        })
    }

    fn execute(&self, tx_bytes: &[u8], signature: &SerializedSignature) -> CustodyResult<ExecutionResponse> {
        let response: ExecuteResponse = self.call(
            "sui_executeTransactionBlock",
            json!([
                STANDARD.encode(tx_bytes),
                [signature.to_base64()],
                {"showEffects": true},
                WAIT_FOR_EFFECTS_CERT,
            ]),
        )?;

        let effects = response
            .effects
            .ok_or_else(|| CustodyError::network("Execution response carries no effects"))?;
        let status: ExecutionStatus = serde_json::from_value(effects.get("status").cloned().unwrap_or(Value::Null))
            .map_err(|e| CustodyError::parse_error("Effects lack an execution status").with_details(e.to_string()))?;

        Ok(ExecutionResponse {
            digest: response.digest,
            status,
            raw_effects: effects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use mockito::Matcher;

    fn client(server: &mockito::ServerGuard) -> SuiRpcClient {
        SuiRpcClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_reference_gas_price() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "suix_getReferenceGasPrice"})))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"750"}"#)
            .create();

        assert_eq!(client(&server).reference_gas_price().unwrap(), 750);
        mock.assert();
    }

    #[test]
    fn test_rpc_error_is_network_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}"#)
            .create();

        let err = client(&server).reference_gas_price().unwrap_err();
        assert_eq!(err.code, ErrorCode::Network);
        assert!(err.details.unwrap().contains("Invalid params"));
    }

    #[test]
    fn test_http_failure_is_network_error() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/").with_status(503).with_body("overloaded").create();

        let err = client(&server).reference_gas_price().unwrap_err();
        assert_eq!(err.code, ErrorCode::Network);
    }

    #[test]
    fn test_get_shared_object() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "sui_getObject"})))
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {"data": {
                        "objectId": "0x0000000000000000000000000000000000000000000000000000000000000006",
                        "version": "100",
                        "digest": bs58::encode([1u8; 32]).into_string(),
                        "owner": {"Shared": {"initial_shared_version": 1}}
                    }}
                })
                .to_string(),
            )
            .create();

        let info = client(&server).get_object(&SuiAddress::CLOCK).unwrap();
        assert_eq!(info.object_ref.version, 100);
        assert_eq!(info.owner, Owner::Shared { initial_shared_version: 1 });
    }

    #[test]
    fn test_missing_object() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"error":{"code":"notExists","object_id":"0x9"}}}"#)
            .create();

        let err = client(&server).get_object(&SuiAddress([9; 32])).unwrap_err();
        assert_eq!(err.code, ErrorCode::Network);
        assert!(err.details.unwrap().contains("notExists"));
    }

    #[test]
    fn test_dry_run() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "sui_dryRunTransactionBlock",
                "params": [STANDARD.encode([1u8, 2, 3])]
            })))
            .with_body(
                json!({"jsonrpc": "2.0", "id": 1, "result": {"effects": {
                    "status": {"status": "success"},
                    "gasUsed": {
                        "computationCost": "1000000",
                        "storageCost": "1976000",
                        "storageRebate": "978120",
                        "nonRefundableStorageFee": "9880"
                    }
                }}})
                .to_string(),
            )
            .create();

        let result = client(&server).dry_run(&[1, 2, 3]).unwrap();
        assert!(result.status.is_success());
        assert_eq!(result.gas_used.storage_cost, 1_976_000);
    }

    #[test]
    fn test_execute_requests_effects_cert() {
        let mut server = mockito::Server::new();
        let signature = crate::tx::assemble(&crate::tx::RawSignatureComponents::new([1; 32], [2; 32]), &[3; 32]).unwrap();
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "sui_executeTransactionBlock",
                "params": [STANDARD.encode([7u8]), [signature.to_base64()], {"showEffects": true}, "WaitForEffectsCert"]
            })))
            .with_body(
                json!({"jsonrpc": "2.0", "id": 1, "result": {
                    "digest": "5xQ",
                    "effects": {"status": {"status": "failure", "error": "InsufficientGas"}}
                }})
                .to_string(),
            )
            .create();

        let response = client(&server).execute(&[7], &signature).unwrap();
        mock.assert();
        assert_eq!(response.digest, "5xQ");
        assert_eq!(response.status.error(), Some("InsufficientGas"));
        assert!(response.raw_effects.get("status").is_some());
    }

    #[test]
    fn test_get_coins_passes_cursor() {
        let mut server = mockito::Server::new();
        let owner = SuiAddress([4; 32]);
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({
                "method": "suix_getCoins",
                "params": [owner.to_hex(), "0x2::sui::SUI", "abc", null]
            })))
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"data":[],"nextCursor":null,"hasNextPage":false}}"#)
            .create();

        let page = client(&server).get_coins(&owner, "0x2::sui::SUI", Some("abc"), None).unwrap();
        assert!(page.data.is_empty());
        assert!(!page.has_next_page);
    }
}
