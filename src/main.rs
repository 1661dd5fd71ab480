//! `sui-custody` command line
//!
//! Owns the process-wide fullnode and custody clients and injects them into
//! the orchestrator. Every command prints a JSON envelope on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use sui_custody_signer::config::ServiceConfig;
use sui_custody_signer::network::SuiRpcClient;
use sui_custody_signer::orchestrator::SubmissionOrchestrator;
use sui_custody_signer::signer::TurnkeySigner;
use sui_custody_signer::tx::{digest, CallArgument, MoveCallSpec, UnsignedTransaction};
use sui_custody_signer::utils::logging;
use sui_custody_signer::{ApiResponse, CustodyError, WalletIdentity};

#[derive(Parser, Debug)]
#[clap(name = "sui-custody", version, about = "Build, sign and submit Sui transactions with a custodied key.")]
struct Cli {
    /// Log every stage to stderr
    #[clap(long, global = true)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the Sui address of an Ed25519 public key (offline)
    Address {
        #[clap(long)]
        public_key: String,
    },

    /// Compute the signing digest of base64 transaction bytes (offline)
    Digest {
        #[clap(long)]
        tx_bytes: String,
    },

    /// Show the custody wallet's address and SUI balance
    Wallet,

    /// Send SUI from the custody wallet
    Transfer {
        /// Recipient address, 0x followed by 64 hex digits
        #[clap(long)]
        to: String,
        /// Amount in SUI, e.g. 1.5
        #[clap(long)]
        amount: String,
    },

    /// Call a Move function from the custody wallet
    MoveCall {
        /// <package>::<module>::<function>
        #[clap(long)]
        target: String,
        #[clap(long = "type-arg")]
        type_args: Vec<String>,
        /// JSON array of {"kind": ..., "value": ...}
        #[clap(long, conflicts_with = "args_file")]
        args: Option<String>,
        #[clap(long)]
        args_file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.debug {
        logging::set_debug(true);
    }

    let response = match run(cli.command) {
        Ok(data) => ApiResponse::ok(data),
        Err(err) => ApiResponse::err(into_custody_error(err)),
    };
    println!("{}", response.to_json());

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(command: Commands) -> Result<Value> {
    match command {
        Commands::Address { public_key } => {
            let identity = WalletIdentity::from_public_key_hex(&public_key)?;
            Ok(serde_json::to_value(identity)?)
        }
        Commands::Digest { tx_bytes } => {
            let tx = UnsignedTransaction::from_base64(&tx_bytes)?;
            Ok(json!({
                "signingDigest": digest(&tx).to_hex(),
                "transactionDigest": tx.transaction_digest(),
            }))
        }
        Commands::Wallet => Ok(serde_json::to_value(orchestrator()?.wallet_info()?)?),
        Commands::Transfer { to, amount } => Ok(serde_json::to_value(orchestrator()?.transfer(&to, &amount)?)?),
        Commands::MoveCall {
            target,
            type_args,
            args,
            args_file,
        } => {
            let raw = match (args, args_file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading arguments from {}", path.display()))?,
                (None, None) => "[]".to_string(),
            };
            let spec = MoveCallSpec::new(target, type_args, CallArgument::list_from_json(&raw)?);
            Ok(serde_json::to_value(orchestrator()?.move_call(spec)?)?)
        }
    }
}

/// One fullnode client and one custody client per process
fn orchestrator() -> Result<SubmissionOrchestrator> {
    let config = ServiceConfig::from_env()?;
    if config.debug {
        logging::set_debug(true);
    }

    let network = SuiRpcClient::new(&config.rpc_url, config.timeout)?;
    let signer = TurnkeySigner::new(&config.turnkey, config.timeout)?;

    sui_custody_signer::log_debug!(
        "main",
        "Clients ready",
        network = config.network,
        rpc_url = config.rpc_url,
    );

    Ok(SubmissionOrchestrator::new(
        Arc::new(network),
        Arc::new(signer),
        config.private_key_id,
        config.gas,
    ))
}

fn into_custody_error(err: anyhow::Error) -> CustodyError {
    match err.downcast::<CustodyError>() {
        Ok(custody) => custody,
        Err(other) => CustodyError::internal(format!("{:#}", other)),
    }
}
