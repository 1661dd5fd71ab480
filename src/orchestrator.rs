//! Submission Orchestrator
//!
//! Drives one submission through
//! `IdentityFetch -> Build -> Digest -> RemoteSign -> Assemble -> Submit`.
//! Steps run strictly in sequence, each exactly once. Nothing is retried
//! here: once a digest has gone to the signer the flow either completes or
//! fails, and the caller decides whether to start over from a fresh build.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::amount::{mist_to_sui, require_transfer_amount, sui_to_mist};
use crate::config::GasConfig;
use crate::error::{CustodyError, CustodyResult, ErrorCode};
use crate::network::{owned_balance, NetworkClient, SUI_COIN_TYPE};
use crate::signer::{HashFunction, SignerDirectory};
use crate::tx::{
    assemble, digest, BuildSpec, MoveCallSpec, RawSignatureComponents, SerializedSignature, SigningDigest,
    TransactionBuilder, UnsignedTransaction,
};
use crate::types::{SuiAddress, WalletIdentity, WalletInfo};

const MODULE: &str = "orchestrator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    IdentityFetch,
    Build,
    Digest,
    RemoteSign,
    Assemble,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::IdentityFetch => "identity_fetch",
            Stage::Build => "build",
            Stage::Digest => "digest",
            Stage::RemoteSign => "remote_sign",
            Stage::Assemble => "assemble",
            Stage::Submit => "submit",
        };
        write!(f, "{}", name)
    }
}

/// Terminal outcome of an accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Confirmed,
    /// Executed but reverted on chain
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub digest: String,
    pub outcome: Outcome,
    /// On-chain status string, verbatim
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub effects: Value,
}

impl SubmissionReceipt {
    pub fn is_confirmed(&self) -> bool {
        self.outcome == Outcome::Confirmed
    }
}

pub struct SubmissionOrchestrator {
    network: Arc<dyn NetworkClient>,
    signer: Arc<dyn SignerDirectory>,
    key_id: String,
    gas: GasConfig,
}

impl SubmissionOrchestrator {
    pub fn new(
        network: Arc<dyn NetworkClient>,
        signer: Arc<dyn SignerDirectory>,
        key_id: impl Into<String>,
        gas: GasConfig,
    ) -> Self {
        Self {
            network,
            signer,
            key_id: key_id.into(),
            gas,
        }
    }

    /// Fetch the wallet identity from the signer directory. Not cached.
    pub fn identity(&self) -> CustodyResult<WalletIdentity> {
        run_stage(Stage::IdentityFetch, || {
            let public_key_hex = self
                .signer
                .public_key_hex(&self.key_id)
                .map_err(|e| signer_error("Failed to fetch wallet public key", e))?;
            WalletIdentity::from_public_key_hex(&public_key_hex)
        })
    }

    /// Identity plus the SUI balance summed over every coin page
    pub fn wallet_info(&self) -> CustodyResult<WalletInfo> {
        let identity = self.identity()?;
        let balance = owned_balance(self.network.as_ref(), &identity.address, SUI_COIN_TYPE)?;

        Ok(WalletInfo {
            address: identity.address,
            public_key_hex: hex::encode(identity.public_key),
            balance_mist: balance.to_string(),
            balance_sui: mist_to_sui(balance),
        })
    }

    /// Send `amount_sui` (decimal SUI) to `recipient`
    pub fn transfer(&self, recipient: &str, amount_sui: &str) -> CustodyResult<SubmissionReceipt> {
        let recipient: SuiAddress = recipient.trim().parse()?;
        self.transfer_mist(recipient, sui_to_mist(amount_sui)?)
    }

    pub fn transfer_mist(&self, recipient: SuiAddress, amount_mist: u64) -> CustodyResult<SubmissionReceipt> {
        let amount_mist = require_transfer_amount(amount_mist)?;
        self.submit(&BuildSpec::Transfer { recipient, amount_mist })
    }

    pub fn move_call(&self, spec: MoveCallSpec) -> CustodyResult<SubmissionReceipt> {
        self.submit(&BuildSpec::MoveCall(spec))
    }

    /// Run the full flow for `spec`
    pub fn submit(&self, spec: &BuildSpec) -> CustodyResult<SubmissionReceipt> {
        let identity = self.identity()?;

        let tx = run_stage(Stage::Build, || {
            TransactionBuilder::new(self.network.as_ref(), self.gas).build(&identity, spec)
        })?;
        let signing_digest = run_stage(Stage::Digest, || Ok(digest(&tx)))?;
        let raw = run_stage(Stage::RemoteSign, || self.remote_sign(&identity, &signing_digest))?;
        let signature = run_stage(Stage::Assemble, || {
            let signature = assemble(&raw, &identity.public_key)?;
            signature.verify(&signing_digest)?;
            Ok(signature)
        })?;
        let receipt = run_stage(Stage::Submit, || self.execute(&tx, &signature))?;

        crate::log_info!(
            MODULE,
            "Submission finished",
            sender = identity.address,
            digest = receipt.digest,
            status = receipt.status,
        );
        Ok(receipt)
    }

    fn remote_sign(
        &self,
        identity: &WalletIdentity,
        signing_digest: &SigningDigest,
    ) -> CustodyResult<RawSignatureComponents> {
        self.signer
            .sign_digest(
                &identity.address.to_hex(),
                &signing_digest.to_hex(),
                HashFunction::NotApplicable,
            )
            .map_err(|e| signer_error("Remote signing failed", e))
    }

    fn execute(&self, tx: &UnsignedTransaction, signature: &SerializedSignature) -> CustodyResult<SubmissionReceipt> {
        let response = self
            .network
            .execute(tx.as_bytes(), signature)
            .map_err(|e| CustodyError::wrap(ErrorCode::Submission, "Network rejected the submission", &e))?;

        let expected = tx.transaction_digest();
        if response.digest != expected {
            crate::log_warn!(
                MODULE,
                "Network reported a different transaction digest",
                digest = response.digest,
                local_digest = expected,
            );
        }

        let outcome = if response.status.is_success() {
            Outcome::Confirmed
        } else {
            Outcome::Rejected
        };
        Ok(SubmissionReceipt {
            digest: response.digest,
            outcome,
            status: response.status.as_str().to_string(),
            error: response.status.error().map(str::to_string),
            effects: response.raw_effects,
        })
    }
}

fn signer_error(message: &str, cause: CustodyError) -> CustodyError {
    match cause.code {
        ErrorCode::Signer => cause,
        _ => CustodyError::wrap(ErrorCode::Signer, message, &cause),
    }
}

/// Run one step, tagging a failure with its stage
fn run_stage<T>(stage: Stage, step: impl FnOnce() -> CustodyResult<T>) -> CustodyResult<T> {
    crate::log_debug!(MODULE, "Stage started", stage = stage);
    step().map_err(|e| {
        let e = e.at_stage(stage);
        crate::log_error!(MODULE, "Stage failed", stage = stage, code = format!("{:?}", e.code), error = e.message);
        e
    })
}
