//! Unified error types for the custody signer
//!
//! Every failure surfaced to a caller is a [`CustodyError`]: a category
//! code, a human-readable message, optional details carrying the
//! underlying cause, and the submission stage that failed (if any).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::orchestrator::Stage;

/// Main error type for all custody signer operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl CustodyError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            stage: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Record the stage that failed. An already recorded stage is kept,
    /// so the innermost stage wins.
    pub fn at_stage(mut self, stage: Stage) -> Self {
        if self.stage.is_none() {
            self.stage = Some(stage);
        }
        self
    }

    /// Re-categorize `cause` under `code`, keeping the cause as details.
    pub fn wrap(code: ErrorCode, message: impl Into<String>, cause: &CustodyError) -> Self {
        Self::new(code, message).with_details(cause.to_string())
    }

    // Convenience constructors
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, msg)
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidReference, msg)
    }

    pub fn invalid_numeric(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidNumeric, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn unsupported_argument_kind(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self::new(
            ErrorCode::UnsupportedArgumentKind,
            format!("Unsupported argument kind: {}", kind),
        )
        .with_details(kind)
    }

    pub fn invalid_type_tag(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTypeTag, msg)
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAmount, msg)
    }

    pub fn network_resolution(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkResolution, msg)
    }

    pub fn signer(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Signer, msg)
    }

    pub fn malformed_signature(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedSignature, msg)
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Submission, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Parse, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Client input errors; never worth retrying.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidArgument
                | ErrorCode::InvalidReference
                | ErrorCode::InvalidNumeric
                | ErrorCode::InvalidAddress
                | ErrorCode::UnsupportedArgumentKind
                | ErrorCode::InvalidTypeTag
        )
    }

    /// Whether a caller may rerun the whole flow from `Build`.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::NetworkResolution | ErrorCode::Network)
    }
}

impl fmt::Display for CustodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(stage) = self.stage {
            write!(f, " at {}", stage)?;
        }
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for CustodyError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Call argument errors
    InvalidArgument,
    InvalidReference,
    InvalidNumeric,
    InvalidAddress,
    UnsupportedArgumentKind,
    InvalidTypeTag,

    // Transfer errors
    InvalidAmount,

    // External round trips
    NetworkResolution,
    Signer,
    Submission,
    Network,

    // Invariant violations
    MalformedSignature,

    // Setup and decoding
    Config,
    Parse,
    Internal,
}

/// Result type alias for custody signer operations
pub type CustodyResult<T> = Result<T, CustodyError>;

// Conversions from common error types

impl From<serde_json::Error> for CustodyError {
    fn from(e: serde_json::Error) -> Self {
        CustodyError::new(ErrorCode::Parse, format!("JSON error: {}", e))
    }
}

impl From<hex::FromHexError> for CustodyError {
    fn from(e: hex::FromHexError) -> Self {
        CustodyError::new(ErrorCode::Parse, format!("Hex error: {}", e))
    }
}

impl From<base64::DecodeError> for CustodyError {
    fn from(e: base64::DecodeError) -> Self {
        CustodyError::new(ErrorCode::Parse, format!("Base64 error: {}", e))
    }
}

impl From<bcs::Error> for CustodyError {
    fn from(e: bcs::Error) -> Self {
        CustodyError::new(ErrorCode::Internal, format!("BCS error: {}", e))
    }
}

impl From<reqwest::Error> for CustodyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CustodyError::new(ErrorCode::Network, "Request timed out")
        } else if e.is_connect() {
            CustodyError::new(ErrorCode::Network, "Connection failed")
        } else {
            CustodyError::new(ErrorCode::Network, e.to_string())
        }
    }
}
