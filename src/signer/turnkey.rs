//! Turnkey custody client
//!
//! Every request is authenticated with an `X-Stamp` header: the API key's
//! ECDSA P-256 signature over the exact request body.
//! API reference: https://docs.turnkey.com/api-reference

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use reqwest::blocking::Client;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use zeroize::Zeroizing;

use super::{HashFunction, SignerDirectory};
use crate::config::TurnkeyConfig;
use crate::error::{CustodyError, CustodyResult, ErrorCode};
use crate::tx::RawSignatureComponents;
use crate::utils::http;

pub const STAMP_HEADER: &str = "X-Stamp";
pub const STAMP_SCHEME: &str = "SIGNATURE_SCHEME_TK_API_P256";

const SIGN_RAW_PAYLOAD: &str = "ACTIVITY_TYPE_SIGN_RAW_PAYLOAD_V2";
const PAYLOAD_ENCODING_HEX: &str = "PAYLOAD_ENCODING_HEXADECIMAL";

const DEFAULT_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Serialize)]
struct Stamp<'a> {
    #[serde(rename = "publicKey")]
    public_key: &'a str,
    scheme: &'a str,
    signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetPrivateKeyRequest<'a> {
    organization_id: &'a str,
    private_key_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetPrivateKeyResponse {
    private_key: PrivateKeyRecord,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateKeyRecord {
    public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRawPayloadRequest<'a> {
    #[serde(rename = "type")]
    activity_type: &'a str,
    timestamp_ms: String,
    organization_id: &'a str,
    parameters: SignRawPayloadParameters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRawPayloadParameters<'a> {
    sign_with: &'a str,
    payload: &'a str,
    encoding: &'a str,
    hash_function: HashFunction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetActivityRequest<'a> {
    organization_id: &'a str,
    activity_id: &'a str,
}

#[derive(Deserialize)]
struct ActivityResponse {
    activity: Activity,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Activity {
    id: String,
    status: ActivityStatus,
    #[serde(default)]
    result: Option<ActivityResult>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
enum ActivityStatus {
    #[serde(rename = "ACTIVITY_STATUS_CREATED")]
    Created,
    #[serde(rename = "ACTIVITY_STATUS_PENDING")]
    Pending,
    #[serde(rename = "ACTIVITY_STATUS_COMPLETED")]
    Completed,
    #[serde(rename = "ACTIVITY_STATUS_FAILED")]
    Failed,
    #[serde(rename = "ACTIVITY_STATUS_CONSENSUS_NEEDED")]
    ConsensusNeeded,
    #[serde(rename = "ACTIVITY_STATUS_REJECTED")]
    Rejected,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResult {
    #[serde(default)]
    sign_raw_payload_result: Option<SignRawPayloadResult>,
}

#[derive(Deserialize)]
struct SignRawPayloadResult {
    r: String,
    s: String,
}

pub struct TurnkeySigner {
    client: Client,
    base_url: String,
    organization_id: String,
    api_public_key: String,
    api_key: SigningKey,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl TurnkeySigner {
    pub fn new(config: &TurnkeyConfig, timeout: Duration) -> CustodyResult<Self> {
        Self::with_client(config, http::build_client(timeout)?)
    }

    /// The configured API public key must belong to the API private key.
    pub fn with_client(config: &TurnkeyConfig, client: Client) -> CustodyResult<Self> {
        let scalar = Zeroizing::new(
            hex::decode(config.api_private_key.expose_secret().trim())
                .map_err(|_| CustodyError::config("TURNKEY_API_PRIVATE_KEY is not hex"))?,
        );
        let api_key = SigningKey::from_slice(&scalar)
            .map_err(|_| CustodyError::config("TURNKEY_API_PRIVATE_KEY is not a P-256 scalar"))?;

        let derived = hex::encode(api_key.verifying_key().to_encoded_point(true).as_bytes());
        if !derived.eq_ignore_ascii_case(config.api_public_key.trim()) {
            return Err(CustodyError::config(
                "TURNKEY_API_PUBLIC_KEY does not match TURNKEY_API_PRIVATE_KEY",
            ));
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            organization_id: config.organization_id.clone(),
            api_public_key: derived,
            api_key,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// How long to wait for an activity that is not yet complete
    pub fn with_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// `X-Stamp` value for `body`
    pub fn stamp(&self, body: &str) -> CustodyResult<String> {
        let signature: Signature = self.api_key.sign(body.as_bytes());
        let stamp = Stamp {
            public_key: &self.api_public_key,
            scheme: STAMP_SCHEME,
            signature: hex::encode(signature.to_der().as_bytes()),
        };
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(&stamp)?))
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, request: &B) -> CustodyResult<T> {
        let body = serde_json::to_string(request)?;
        let stamp = self.stamp(&body)?;

        crate::log_debug!("signer::turnkey", "Custody request", path = path, stamp = stamp);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(STAMP_HEADER, stamp)
            .body(body)
            .send()?;
        http::read_json(response)
    }

    /// Read-only status polling. The signing request itself is never re-sent.
    fn await_activity(&self, mut activity: Activity) -> CustodyResult<Activity> {
        let mut attempts = 0;
        while matches!(activity.status, ActivityStatus::Created | ActivityStatus::Pending) {
            if attempts >= self.poll_attempts {
                return Err(CustodyError::signer(format!(
                    "Activity {} still pending after {} polls",
                    activity.id, attempts
                )));
            }
            attempts += 1;
            thread::sleep(self.poll_interval);

            let response: ActivityResponse = self.post(
                "/public/v1/query/get_activity",
                &GetActivityRequest {
                    organization_id: &self.organization_id,
                    activity_id: &activity.id,
                },
            )?;
            activity = response.activity;
        }
        Ok(activity)
    }
}

impl SignerDirectory for TurnkeySigner {
    fn public_key_hex(&self, key_id: &str) -> CustodyResult<String> {
        let response: GetPrivateKeyResponse = self
            .post(
                "/public/v1/query/get_private_key",
                &GetPrivateKeyRequest {
                    organization_id: &self.organization_id,
                    private_key_id: key_id,
                },
            )
            .map_err(|e| CustodyError::wrap(ErrorCode::Signer, "Failed to fetch custody public key", &e))?;
        Ok(response.private_key.public_key)
    }

    fn sign_digest(
        &self,
        sign_with: &str,
        digest_hex: &str,
        hash_function: HashFunction,
    ) -> CustodyResult<RawSignatureComponents> {
        let request = SignRawPayloadRequest {
            activity_type: SIGN_RAW_PAYLOAD,
            timestamp_ms: chrono::Utc::now().timestamp_millis().to_string(),
            organization_id: &self.organization_id,
            parameters: SignRawPayloadParameters {
                sign_with,
                payload: digest_hex,
                encoding: PAYLOAD_ENCODING_HEX,
                hash_function,
            },
        };

        let response: ActivityResponse = self
            .post("/public/v1/submit/sign_raw_payload", &request)
            .map_err(|e| CustodyError::wrap(ErrorCode::Signer, "Signing request failed", &e))?;
        let activity = self
            .await_activity(response.activity)
            .map_err(|e| match e.code {
                ErrorCode::Signer => e,
                _ => CustodyError::wrap(ErrorCode::Signer, "Failed to poll signing activity", &e),
            })?;

        match activity.status {
            ActivityStatus::Completed => {}
            status => {
                return Err(CustodyError::signer(format!("Signing activity {} did not complete", activity.id))
                    .with_details(format!("{:?}", status)))
            }
        }

        let result = activity
            .result
            .and_then(|r| r.sign_raw_payload_result)
            .ok_or_else(|| CustodyError::signer("Completed activity carries no signature"))?;

        RawSignatureComponents::from_hex(&result.r, &result.s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use p256::ecdsa::{signature::Verifier, VerifyingKey};
    use rand::rngs::OsRng;
    use secrecy::SecretString;
    use serde_json::json;

    fn config(url: &str) -> (TurnkeyConfig, SigningKey) {
        let key = SigningKey::random(&mut OsRng);
        let config = TurnkeyConfig {
            base_url: url.to_string(),
            api_public_key: hex::encode(key.verifying_key().to_encoded_point(true).as_bytes()),
            api_private_key: SecretString::from(hex::encode(key.to_bytes())),
            organization_id: "org-1".to_string(),
        };
        (config, key)
    }

    fn signer(server: &mockito::ServerGuard) -> (TurnkeySigner, SigningKey) {
        let (config, key) = config(&server.url());
        let signer = TurnkeySigner::new(&config, Duration::from_secs(5))
            .unwrap()
            .with_polling(3, Duration::ZERO);
        (signer, key)
    }

    fn activity(status: &str, result: serde_json::Value) -> String {
        json!({"activity": {"id": "act-1", "status": status, "result": result}}).to_string()
    }

    #[test]
    fn test_stamp_verifies_over_body() {
        let (config, key) = config("https://api.turnkey.com");
        let signer = TurnkeySigner::new(&config, Duration::from_secs(5)).unwrap();
        let body = r#"{"organizationId":"org-1"}"#;

        let decoded = URL_SAFE_NO_PAD.decode(signer.stamp(body).unwrap()).unwrap();
        let stamp: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(stamp["scheme"], STAMP_SCHEME);
        assert_eq!(stamp["publicKey"], config.api_public_key);

        let der = hex::decode(stamp["signature"].as_str().unwrap()).unwrap();
        let signature = Signature::from_der(&der).unwrap();
        VerifyingKey::from(&key).verify(body.as_bytes(), &signature).unwrap();
    }

    #[test]
    fn test_mismatched_api_keys_rejected() {
        let (mut config, _) = config("https://api.turnkey.com");
        let (other, _) = self::config("https://api.turnkey.com");
        config.api_public_key = other.api_public_key;
        let err = TurnkeySigner::new(&config, Duration::from_secs(5)).err().unwrap();
        assert_eq!(err.code, ErrorCode::Config);
    }

    #[test]
    fn test_public_key_lookup() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/public/v1/query/get_private_key")
            .match_header(STAMP_HEADER, Matcher::Any)
            .match_body(Matcher::Json(json!({"organizationId": "org-1", "privateKeyId": "key-1"})))
            .with_body(json!({"privateKey": {"publicKey": "ab".repeat(32), "privateKeyId": "key-1"}}).to_string())
            .create();

        let (signer, _) = signer(&server);
        assert_eq!(signer.public_key_hex("key-1").unwrap(), "ab".repeat(32));
        mock.assert();
    }

    #[test]
    fn test_sign_completed() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/public/v1/submit/sign_raw_payload")
            .match_body(Matcher::PartialJson(json!({
                "type": "ACTIVITY_TYPE_SIGN_RAW_PAYLOAD_V2",
                "organizationId": "org-1",
                "parameters": {
                    "signWith": "0xabc",
                    "payload": "00".repeat(32),
                    "encoding": "PAYLOAD_ENCODING_HEXADECIMAL",
                    "hashFunction": "HASH_FUNCTION_NOT_APPLICABLE"
                }
            })))
            .with_body(activity(
                "ACTIVITY_STATUS_COMPLETED",
                json!({"signRawPayloadResult": {"r": "11".repeat(32), "s": "22".repeat(32), "v": "00"}}),
            ))
            .expect(1)
            .create();

        let (signer, _) = signer(&server);
        let raw = signer
            .sign_digest("0xabc", &"00".repeat(32), HashFunction::NotApplicable)
            .unwrap();
        assert_eq!(raw, RawSignatureComponents::new([0x11; 32], [0x22; 32]));
        mock.assert();
    }

    #[test]
    fn test_pending_activity_is_polled_not_resent() {
        let mut server = mockito::Server::new();
        let submit = server
            .mock("POST", "/public/v1/submit/sign_raw_payload")
            .with_body(activity("ACTIVITY_STATUS_PENDING", serde_json::Value::Null))
            .expect(1)
            .create();
        let poll = server
            .mock("POST", "/public/v1/query/get_activity")
            .match_body(Matcher::PartialJson(json!({"activityId": "act-1"})))
            .with_body(activity(
                "ACTIVITY_STATUS_COMPLETED",
                json!({"signRawPayloadResult": {"r": "aa".repeat(32), "s": "bb".repeat(32)}}),
            ))
            .expect(1)
            .create();

        let (signer, _) = signer(&server);
        let raw = signer
            .sign_digest("0xabc", &"00".repeat(32), HashFunction::NotApplicable)
            .unwrap();
        assert_eq!(raw.r, vec![0xaa; 32]);
        submit.assert();
        poll.assert();
    }

    #[test]
    fn test_rejected_activity_is_signer_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/public/v1/submit/sign_raw_payload")
            .with_body(activity("ACTIVITY_STATUS_REJECTED", serde_json::Value::Null))
            .create();

        let (signer, _) = signer(&server);
        let err = signer
            .sign_digest("0xabc", &"00".repeat(32), HashFunction::NotApplicable)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Signer);
        assert!(err.details.unwrap().contains("Rejected"));
    }

    #[test]
    fn test_http_error_is_signer_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/public/v1/submit/sign_raw_payload")
            .with_status(403)
            .with_body(r#"{"code":7,"message":"policy denied"}"#)
            .create();

        let (signer, _) = signer(&server);
        let err = signer
            .sign_digest("0xabc", &"00".repeat(32), HashFunction::NotApplicable)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Signer);
        assert!(err.details.unwrap().contains("403"));
    }

    #[test]
    fn test_polling_gives_up() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/public/v1/submit/sign_raw_payload")
            .with_body(activity("ACTIVITY_STATUS_PENDING", serde_json::Value::Null))
            .create();
        let poll = server
            .mock("POST", "/public/v1/query/get_activity")
            .with_body(activity("ACTIVITY_STATUS_PENDING", serde_json::Value::Null))
            .expect(3)
            .create();

        let (signer, _) = signer(&server);
        let err = signer
            .sign_digest("0xabc", &"00".repeat(32), HashFunction::NotApplicable)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Signer);
        poll.assert();
    }
}
