//! Service configuration
//!
//! Read once by the entry point from the environment. `from_lookup` takes
//! any variable source so configuration can be tested without touching the
//! process environment.

use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::{CustodyError, CustodyResult};

pub const DEFAULT_TURNKEY_BASE_URL: &str = "https://api.turnkey.com";
pub const DEFAULT_MAX_GAS_BUDGET: u64 = 50_000_000_000;
pub const DEFAULT_MAX_GAS_OBJECTS: usize = 256;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuiNetwork {
    Mainnet,
    #[default]
    Testnet,
    Devnet,
    Localnet,
}

impl SuiNetwork {
    pub fn fullnode_url(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "https://fullnode.mainnet.sui.io:443",
            SuiNetwork::Testnet => "https://fullnode.testnet.sui.io:443",
            SuiNetwork::Devnet => "https://fullnode.devnet.sui.io:443",
            SuiNetwork::Localnet => "http://127.0.0.1:9000",
        }
    }
}

impl FromStr for SuiNetwork {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(SuiNetwork::Mainnet),
            "testnet" => Ok(SuiNetwork::Testnet),
            "devnet" => Ok(SuiNetwork::Devnet),
            "localnet" => Ok(SuiNetwork::Localnet),
            other => Err(CustodyError::config(format!("Unknown SUI_NETWORK '{}'", other))),
        }
    }
}

impl fmt::Display for SuiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SuiNetwork::Mainnet => "mainnet",
            SuiNetwork::Testnet => "testnet",
            SuiNetwork::Devnet => "devnet",
            SuiNetwork::Localnet => "localnet",
        };
        write!(f, "{}", name)
    }
}

/// Gas limits used while building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasConfig {
    /// Budget of the estimation dry run, and the upper bound of any budget
    pub max_gas_budget: u64,
    /// Most coins attached as gas payment
    pub max_gas_objects: usize,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_gas_budget: DEFAULT_MAX_GAS_BUDGET,
            max_gas_objects: DEFAULT_MAX_GAS_OBJECTS,
        }
    }
}

/// Custody API credentials. The private key never leaves its secret wrapper
/// except to build the request-stamping key.
#[derive(Debug)]
pub struct TurnkeyConfig {
    pub base_url: String,
    pub api_public_key: String,
    pub api_private_key: SecretString,
    pub organization_id: String,
}

#[derive(Debug)]
pub struct ServiceConfig {
    pub turnkey: TurnkeyConfig,
    /// Identity reference of the wallet key inside the custody service
    pub private_key_id: String,
    pub network: SuiNetwork,
    pub rpc_url: String,
    pub gas: GasConfig,
    pub timeout: Duration,
    pub debug: bool,
}

impl ServiceConfig {
    pub fn from_env() -> CustodyResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> CustodyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &str| {
            optional(name).ok_or_else(|| CustodyError::config(format!("{} is not set", name)))
        };

        let base_url = optional("TURNKEY_API_BASE_URL").unwrap_or_else(|| DEFAULT_TURNKEY_BASE_URL.to_string());
        validate_endpoint("TURNKEY_API_BASE_URL", &base_url)?;

        let network = match optional("SUI_NETWORK") {
            Some(name) => name.parse()?,
            None => SuiNetwork::default(),
        };
        let rpc_url = optional("SUI_RPC_URL").unwrap_or_else(|| network.fullnode_url().to_string());
        validate_endpoint("SUI_RPC_URL", &rpc_url)?;

        let gas = GasConfig {
            max_gas_budget: parse_number(&optional, "SUI_MAX_GAS_BUDGET", DEFAULT_MAX_GAS_BUDGET)?,
            max_gas_objects: parse_number(&optional, "SUI_MAX_GAS_OBJECTS", DEFAULT_MAX_GAS_OBJECTS)?,
        };
        if gas.max_gas_budget == 0 || gas.max_gas_objects == 0 {
            return Err(CustodyError::config("Gas limits must be positive"));
        }

        let timeout_secs: u64 = parse_number(&optional, "SUI_CUSTODY_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(CustodyError::config("SUI_CUSTODY_TIMEOUT_SECS must be positive"));
        }

        let debug = matches!(optional("SUI_CUSTODY_DEBUG").as_deref(), Some("1") | Some("true"));

        Ok(Self {
            turnkey: TurnkeyConfig {
                base_url,
                api_public_key: required("TURNKEY_API_PUBLIC_KEY")?,
                api_private_key: SecretString::from(required("TURNKEY_API_PRIVATE_KEY")?),
                organization_id: required("TURNKEY_ORGANIZATION_ID")?,
            },
            private_key_id: required("TURNKEY_SUI_PRIVATE_KEY_ID")?,
            network,
            rpc_url,
            gas,
            timeout: Duration::from_secs(timeout_secs),
            debug,
        })
    }
}

fn parse_number<T, F>(optional: &F, name: &str, default: T) -> CustodyResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| CustodyError::config(format!("{} must be a non-negative integer, got '{}'", name, raw))),
        None => Ok(default),
    }
}

/// HTTPS is required for remote hosts; plain HTTP only for loopback.
pub fn validate_endpoint(name: &str, raw: &str) -> CustodyResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| CustodyError::config(format!("{} is not a valid URL", name)).with_details(e.to_string()))?;

    if !url.username().is_empty() || url.password().is_some() {
        return Err(CustodyError::config(format!("{} must not embed credentials", name)));
    }

    match url.scheme() {
        "https" => {}
        "http" => {
            let loopback = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
            if !loopback {
                return Err(CustodyError::config(format!("{} must use HTTPS for remote hosts", name)));
            }
        }
        other => {
            return Err(CustodyError::config(format!("{} has unsupported scheme '{}'", name, other)));
        }
    }

    if url.host_str().is_none() {
        return Err(CustodyError::config(format!("{} has no host", name)));
    }
    Ok(url)
}
