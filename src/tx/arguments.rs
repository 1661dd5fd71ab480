//! Move Call Arguments
//!
//! [`CallArgument`] is the caller-facing, JSON-shaped argument description
//! (`{"kind": "u64", "value": "100"}`). [`encode`] turns it into an
//! [`EncodedArgument`]: the gas coin handle, a BCS pure value, or an object
//! id that the builder resolves against the network.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CustodyError, CustodyResult};
use crate::types::{ObjectId, SuiAddress};

/// One argument of a Move call
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum CallArgument {
    #[serde(rename = "object")]
    ObjectRef(String),
    #[serde(rename = "u64")]
    U64(String),
    #[serde(rename = "string")]
    Str(String),
    #[serde(rename = "address")]
    Address(String),
    #[serde(rename = "bool")]
    Bool(bool),
    /// The transaction's own gas coin
    #[serde(rename = "gas")]
    GasCoin,
}

impl CallArgument {
    /// Wire tag of this argument
    pub fn kind(&self) -> &'static str {
        match self {
            CallArgument::ObjectRef(_) => "object",
            CallArgument::U64(_) => "u64",
            CallArgument::Str(_) => "string",
            CallArgument::Address(_) => "address",
            CallArgument::Bool(_) => "bool",
            CallArgument::GasCoin => "gas",
        }
    }

    /// Decode one `{"kind": ..., "value": ...}` object.
    pub fn from_json(value: &Value) -> CustodyResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CustodyError::invalid_argument("Argument must be a JSON object"))?;
        let kind = obj
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CustodyError::invalid_argument("Argument is missing its kind"))?;
        let payload = obj.get("value");

        match kind {
            "gas" => Ok(CallArgument::GasCoin),
            "object" => Ok(CallArgument::ObjectRef(required_text(kind, payload)?)),
            "u64" => Ok(CallArgument::U64(required_text(kind, payload)?)),
            "string" => Ok(CallArgument::Str(required_text(kind, payload)?)),
            "address" => Ok(CallArgument::Address(required_text(kind, payload)?)),
            "bool" => match payload {
                Some(Value::Bool(b)) => Ok(CallArgument::Bool(*b)),
                Some(Value::String(s)) if s == "true" => Ok(CallArgument::Bool(true)),
                Some(Value::String(s)) if s == "false" => Ok(CallArgument::Bool(false)),
                _ => Err(CustodyError::invalid_argument("bool argument requires a boolean value")),
            },
            other => Err(CustodyError::unsupported_argument_kind(other)),
        }
    }

    /// Decode a JSON array of arguments, preserving order.
    pub fn list_from_json(json: &str) -> CustodyResult<Vec<Self>> {
        let value: Value = serde_json::from_str(json)?;
        let items = value
            .as_array()
            .ok_or_else(|| CustodyError::invalid_argument("Arguments must be a JSON array"))?;
        items.iter().map(Self::from_json).collect()
    }
}

impl<'de> Deserialize<'de> for CallArgument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Value fields must be present and non-empty. Numbers are accepted for
/// textual kinds and kept in their decimal form.
fn required_text(kind: &str, payload: Option<&Value>) -> CustodyResult<String> {
    let text = match payload {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => {
            return Err(CustodyError::invalid_argument(format!("{} argument requires a value", kind)))
        }
        Some(other) => {
            return Err(CustodyError::invalid_argument(format!(
                "{} argument has a non-text value: {}",
                kind, other
            )))
        }
    };
    if text.is_empty() {
        return Err(CustodyError::invalid_argument(format!("{} argument value is empty", kind)));
    }
    Ok(text)
}

/// An argument after encoding, before input resolution
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedArgument {
    /// Refers to the transaction's gas coin handle
    GasCoin,
    /// BCS bytes of a pure value
    Pure(Vec<u8>),
    /// Object to resolve to an on-chain input at build time
    Object(ObjectId),
}

/// Encode a call argument. Pure function of its input.
pub fn encode(arg: &CallArgument) -> CustodyResult<EncodedArgument> {
    match arg {
        CallArgument::GasCoin => Ok(EncodedArgument::GasCoin),
        CallArgument::ObjectRef(id) => {
            let object_id = SuiAddress::from_hex_literal(id).map_err(|e| {
                CustodyError::invalid_reference(format!("Invalid object id '{}'", id)).with_details(e.message)
            })?;
            Ok(EncodedArgument::Object(object_id))
        }
        CallArgument::U64(value) => Ok(EncodedArgument::Pure(bcs::to_bytes(&parse_u64(value)?)?)),
        CallArgument::Str(value) => Ok(EncodedArgument::Pure(bcs::to_bytes(value)?)),
        CallArgument::Address(value) => {
            let address: SuiAddress = value.parse().map_err(|e: CustodyError| {
                CustodyError::invalid_address(format!("Invalid address '{}'", value)).with_details(e.message)
            })?;
            Ok(EncodedArgument::Pure(address.0.to_vec()))
        }
        CallArgument::Bool(value) => Ok(EncodedArgument::Pure(vec![u8::from(*value)])),
    }
}

/// Base-10 unsigned 64-bit integer, digits only
fn parse_u64(value: &str) -> CustodyResult<u64> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(CustodyError::invalid_numeric(format!("Not a base-10 integer: '{}'", value)));
    }
    value
        .parse::<u64>()
        .map_err(|_| CustodyError::invalid_numeric(format!("Value overflows u64: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn pure(arg: CallArgument) -> Vec<u8> {
        match encode(&arg).unwrap() {
            EncodedArgument::Pure(bytes) => bytes,
            other => panic!("expected pure value, got {:?}", other),
        }
    }

    #[test]
    fn test_u64_roundtrip() {
        let bytes = pure(CallArgument::U64("100".into()));
        assert_eq!(bcs::from_bytes::<u64>(&bytes).unwrap(), 100);
    }

    #[test]
    fn test_u64_boundaries() {
        let bytes = pure(CallArgument::U64("18446744073709551615".into()));
        assert_eq!(bcs::from_bytes::<u64>(&bytes).unwrap(), u64::MAX);

        let err = encode(&CallArgument::U64("18446744073709551616".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidNumeric);
    }

    #[test]
    fn test_u64_rejects_non_numeric() {
        for bad in ["", "-1", "+5", "1.0", "0x10", "ten"] {
            let err = encode(&CallArgument::U64(bad.into())).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidNumeric, "{:?}", bad);
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let bytes = pure(CallArgument::Str("héllo".into()));
        assert_eq!(bytes[0] as usize, "héllo".len());
        assert_eq!(bcs::from_bytes::<String>(&bytes).unwrap(), "héllo");
    }

    #[test]
    fn test_address_roundtrip() {
        let hex = format!("0x{}", "1f".repeat(32));
        let bytes = pure(CallArgument::Address(hex));
        assert_eq!(bcs::from_bytes::<[u8; 32]>(&bytes).unwrap(), [0x1f; 32]);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = encode(&CallArgument::Address("0x1234".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
        let err = encode(&CallArgument::Address(format!("0x{}", "g".repeat(64)))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_bool_roundtrip() {
        assert!(bcs::from_bytes::<bool>(&pure(CallArgument::Bool(true))).unwrap());
        assert!(!bcs::from_bytes::<bool>(&pure(CallArgument::Bool(false))).unwrap());
    }

    #[test]
    fn test_object_and_gas() {
        assert_eq!(
            encode(&CallArgument::ObjectRef("0x6".into())).unwrap(),
            EncodedArgument::Object(SuiAddress::CLOCK)
        );
        assert_eq!(encode(&CallArgument::GasCoin).unwrap(), EncodedArgument::GasCoin);

        let err = encode(&CallArgument::ObjectRef("not-an-id".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidReference);
    }

    #[test]
    fn test_from_json_variants() {
        let args = CallArgument::list_from_json(
            r#"[{"kind":"gas"},{"kind":"u64","value":100},{"kind":"bool","value":true},{"kind":"string","value":"hi"}]"#,
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                CallArgument::GasCoin,
                CallArgument::U64("100".into()),
                CallArgument::Bool(true),
                CallArgument::Str("hi".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_kind_names_tag() {
        let err = CallArgument::from_json(&json!({"kind": "vector", "value": []})).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedArgumentKind);
        assert!(err.message.contains("vector"));
    }

    #[test]
    fn test_missing_value() {
        let err = CallArgument::from_json(&json!({"kind": "object"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
        let err = CallArgument::from_json(&json!({"kind": "address", "value": ""})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(CallArgument::U64("7".into())).unwrap();
        assert_eq!(json, json!({"kind": "u64", "value": "7"}));
        assert_eq!(serde_json::to_value(CallArgument::GasCoin).unwrap(), json!({"kind": "gas"}));

        let back: CallArgument = serde_json::from_value(json!({"kind": "u64", "value": "7"})).unwrap();
        assert_eq!(back, CallArgument::U64("7".into()));
    }
}
