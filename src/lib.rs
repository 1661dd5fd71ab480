//! Sui Custody Signer
//!
//! Builds Sui transactions for a wallet whose Ed25519 key lives in a remote
//! custody service, computes the intent signing digest, assembles the
//! serialized signature from the returned `r`/`s` components and submits
//! the result to a fullnode.
//!
//! # Architecture
//!
//! - **tx**: argument encoding, transaction building, digest, signature envelope
//! - **signer**: the custody service interface and its implementations
//! - **network**: the fullnode interface and its JSON-RPC client
//! - **orchestrator**: the identity, build, sign and submit sequence
//! - **config**: environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sui_custody_signer::{config::ServiceConfig, network::SuiRpcClient, signer::TurnkeySigner};
//! use sui_custody_signer::orchestrator::SubmissionOrchestrator;
//!
//! let config = ServiceConfig::from_env()?;
//! let orchestrator = SubmissionOrchestrator::new(
//!     Arc::new(SuiRpcClient::new(&config.rpc_url, config.timeout)?),
//!     Arc::new(TurnkeySigner::new(&config.turnkey, config.timeout)?),
//!     config.private_key_id,
//!     config.gas,
//! );
//! let receipt = orchestrator.transfer("0x...", "1.5")?;
//! println!("{} {}", receipt.digest, receipt.status);
//! ```

pub mod amount;
pub mod config;
pub mod error;
pub mod network;
pub mod orchestrator;
pub mod serde_bytes;
pub mod signer;
pub mod tx;
pub mod types;
pub mod utils;

pub use error::{CustodyError, CustodyResult, ErrorCode};
pub use orchestrator::{Outcome, Stage, SubmissionOrchestrator, SubmissionReceipt};
pub use types::*;
