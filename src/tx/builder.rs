//! Transaction Builder
//!
//! Turns a [`BuildSpec`] into network-ready BCS bytes. Inputs are resolved
//! against the network in a single pass (object versions, gas price, gas
//! budget via dry run, gas payment); nothing is retried.

use base64::{engine::general_purpose::STANDARD, Engine};
use blake2::Digest;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::arguments::{encode, CallArgument, EncodedArgument};
use super::bcs_types::*;
use super::type_tag::{is_valid_identifier, TypeTag};
use crate::amount::require_transfer_amount;
use crate::config::GasConfig;
use crate::error::{CustodyError, CustodyResult, ErrorCode};
use crate::network::{Coin, ExecutionStatus, NetworkClient, Owner, SUI_COIN_TYPE};
use crate::types::{Blake2b256, ObjectId, SuiAddress, WalletIdentity};

/// Gas units reserved on top of the dry-run computation cost
pub const GAS_SAFE_OVERHEAD: u64 = 1000;

/// Canonical transaction bytes. Never mutated once built.
#[derive(Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    bytes: Vec<u8>,
}

impl UnsignedTransaction {
    pub fn from_data(data: &TransactionData) -> CustodyResult<Self> {
        Ok(Self { bytes: data.to_bcs_bytes()? })
    }

    /// Wrap bytes produced elsewhere; they must decode as transaction data.
    pub fn from_bytes(bytes: Vec<u8>) -> CustodyResult<Self> {
        TransactionData::from_bcs_bytes(&bytes).map_err(|e| {
            CustodyError::parse_error("Bytes are not valid transaction data").with_details(e.to_string())
        })?;
        Ok(Self { bytes })
    }

    pub fn from_base64(encoded: &str) -> CustodyResult<Self> {
        Self::from_bytes(STANDARD.decode(encoded.trim())?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn decode(&self) -> CustodyResult<TransactionData> {
        Ok(TransactionData::from_bcs_bytes(&self.bytes)?)
    }

    /// The digest the network reports for this transaction (base58 of
    /// `blake2b_256("TransactionData::" || bytes)`).
    pub fn transaction_digest(&self) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update(b"TransactionData::");
        hasher.update(&self.bytes);
        let hash: [u8; 32] = hasher.finalize().into();
        bs58::encode(hash).into_string()
    }
}

impl std::fmt::Debug for UnsignedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UnsignedTransaction({} bytes)", self.bytes.len())
    }
}

/// A single Move call: `<package>::<module>::<function>`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCallSpec {
    pub target: String,
    #[serde(default)]
    pub type_arguments: Vec<String>,
    #[serde(default, rename = "args")]
    pub arguments: Vec<CallArgument>,
}

impl MoveCallSpec {
    pub fn new(target: impl Into<String>, type_arguments: Vec<String>, arguments: Vec<CallArgument>) -> Self {
        Self {
            target: target.into(),
            type_arguments,
            arguments,
        }
    }

    /// Split and validate the target
    pub fn parse_target(&self) -> CustodyResult<(ObjectId, String, String)> {
        let parts: Vec<&str> = self.target.split("::").collect();
        if parts.len() != 3 {
            return Err(CustodyError::invalid_argument(format!(
                "Target must be <package>::<module>::<function>, got '{}'",
                self.target
            )));
        }
        let package = SuiAddress::from_hex_literal(parts[0]).map_err(|e| {
            CustodyError::invalid_argument(format!("Invalid package id in target '{}'", self.target))
                .with_details(e.message)
        })?;
        for ident in &parts[1..] {
            if !is_valid_identifier(ident) {
                return Err(CustodyError::invalid_argument(format!(
                    "Invalid Move identifier '{}' in target",
                    ident
                )));
            }
        }
        Ok((package, parts[1].to_string(), parts[2].to_string()))
    }

    /// Type arguments in declaration order
    pub fn parse_type_arguments(&self) -> CustodyResult<Vec<TypeTag>> {
        self.type_arguments
            .iter()
            .map(|s| {
                s.parse::<TypeTag>().map_err(|e| {
                    CustodyError::invalid_type_tag(format!("Invalid type argument '{}'", s)).with_details(e.to_string())
                })
            })
            .collect()
    }
}

/// What to build
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildSpec {
    /// Split `amount_mist` off the gas coin and send it to `recipient`
    Transfer { recipient: SuiAddress, amount_mist: u64 },
    MoveCall(MoveCallSpec),
}

/// Accumulates inputs and commands of one programmable transaction.
/// Object inputs are deduplicated by id.
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
    object_inputs: HashMap<ObjectId, u16>,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_input(&mut self, arg: CallArg) -> CustodyResult<Argument> {
        let idx = u16::try_from(self.inputs.len())
            .map_err(|_| CustodyError::invalid_argument("Too many transaction inputs"))?;
        self.inputs.push(arg);
        Ok(Argument::Input(idx))
    }

    pub fn pure_bytes(&mut self, bytes: Vec<u8>) -> CustodyResult<Argument> {
        self.push_input(CallArg::Pure(bytes))
    }

    pub fn pure<T: Serialize>(&mut self, value: &T) -> CustodyResult<Argument> {
        self.pure_bytes(bcs::to_bytes(value)?)
    }

    pub fn object(&mut self, arg: ObjectArg) -> CustodyResult<Argument> {
        let id = arg.id();
        if let Some(&idx) = self.object_inputs.get(&id) {
            return Ok(Argument::Input(idx));
        }
        let input = self.push_input(CallArg::Object(arg))?;
        if let Argument::Input(idx) = input {
            self.object_inputs.insert(id, idx);
        }
        Ok(input)
    }

    pub fn command(&mut self, command: Command) -> CustodyResult<Argument> {
        let idx = u16::try_from(self.commands.len())
            .map_err(|_| CustodyError::invalid_argument("Too many transaction commands"))?;
        self.commands.push(command);
        Ok(Argument::Result(idx))
    }

    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<Argument>) -> CustodyResult<Argument> {
        self.command(Command::SplitCoins(coin, amounts))
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Argument) -> CustodyResult<Argument> {
        self.command(Command::TransferObjects(objects, recipient))
    }

    pub fn move_call(
        &mut self,
        package: ObjectId,
        module: String,
        function: String,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<Argument>,
    ) -> CustodyResult<Argument> {
        self.command(Command::MoveCall(Box::new(ProgrammableMoveCall {
            package,
            module,
            function,
            type_arguments,
            arguments,
        })))
    }

    pub fn object_ids(&self) -> HashSet<ObjectId> {
        self.object_inputs.keys().copied().collect()
    }

    pub fn finish(self) -> ProgrammableTransaction {
        ProgrammableTransaction {
            inputs: self.inputs,
            commands: self.commands,
        }
    }
}

/// Resolves a [`BuildSpec`] against the network into canonical bytes
pub struct TransactionBuilder<'a> {
    network: &'a dyn NetworkClient,
    gas: GasConfig,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(network: &'a dyn NetworkClient, gas: GasConfig) -> Self {
        Self { network, gas }
    }

    /// Build the transaction for `sender`. Identical specs against unchanged
    /// on-chain state produce identical bytes.
    pub fn build(&self, sender: &WalletIdentity, spec: &BuildSpec) -> CustodyResult<UnsignedTransaction> {
        let sender = sender.address;
        let (pt, object_ids) = self.programmable(spec)?;

        let price = self
            .network
            .reference_gas_price()
            .map_err(|e| CustodyError::wrap(ErrorCode::NetworkResolution, "Failed to fetch reference gas price", &e))?;

        let budget = self.estimate_budget(sender, &pt, price, spec)?;
        let payment = self.select_gas_payment(sender, &object_ids, budget, spec)?;

        crate::log_debug!(
            "tx::builder",
            "Resolved gas",
            gas_price = price,
            gas_budget = budget,
            gas_objects = payment.len(),
        );

        let data = TransactionData::new_programmable(
            sender,
            pt,
            GasData {
                payment: payment.iter().map(Coin::object_ref).collect(),
                owner: sender,
                price,
                budget,
            },
        );
        UnsignedTransaction::from_data(&data)
    }

    /// Inputs and commands. Arguments are encoded before any network round
    /// trip so bad input fails fast.
    pub fn programmable(&self, spec: &BuildSpec) -> CustodyResult<(ProgrammableTransaction, HashSet<ObjectId>)> {
        let mut ptb = ProgrammableTransactionBuilder::new();

        match spec {
            BuildSpec::Transfer { recipient, amount_mist } => {
                let amount = ptb.pure(&require_transfer_amount(*amount_mist)?)?;
                let coin = ptb.split_coins(Argument::GasCoin, vec![amount])?;
                let Argument::Result(split_idx) = coin else {
                    return Err(CustodyError::internal("SplitCoins did not yield a command result"));
                };
                let recipient = ptb.pure(recipient)?;
                ptb.transfer_objects(vec![Argument::NestedResult(split_idx, 0)], recipient)?;
            }
            BuildSpec::MoveCall(call) => {
                let (package, module, function) = call.parse_target()?;
                let type_arguments = call.parse_type_arguments()?;
                let encoded = call.arguments.iter().map(encode).collect::<CustodyResult<Vec<_>>>()?;

                let mut arguments = Vec::with_capacity(encoded.len());
                for arg in encoded {
                    let argument = match arg {
                        EncodedArgument::GasCoin => Argument::GasCoin,
                        EncodedArgument::Pure(bytes) => ptb.pure_bytes(bytes)?,
                        EncodedArgument::Object(id) => ptb.object(self.resolve_object(&id)?)?,
                    };
                    arguments.push(argument);
                }
                ptb.move_call(package, module, function, type_arguments, arguments)?;
            }
        }

        let object_ids = ptb.object_ids();
        Ok((ptb.finish(), object_ids))
    }

    /// Object id to a versioned input. Shared objects are taken mutably
    /// except the clock and randomness objects, which the network only
    /// accepts by immutable reference.
    fn resolve_object(&self, id: &ObjectId) -> CustodyResult<ObjectArg> {
        let info = self.network.get_object(id).map_err(|e| {
            CustodyError::wrap(ErrorCode::NetworkResolution, format!("Failed to resolve object {}", id), &e)
        })?;

        Ok(match info.owner {
            Owner::AddressOwner(_) | Owner::Immutable => ObjectArg::ImmOrOwnedObject(info.object_ref),
            Owner::ObjectOwner(parent) => {
                return Err(CustodyError::network_resolution(format!(
                    "Object {} is owned by object {} and cannot be passed as a call input",
                    id, parent
                )))
            }
            Owner::Shared { initial_shared_version } => ObjectArg::SharedObject {
                id: *id,
                initial_shared_version,
                mutable: *id != SuiAddress::CLOCK && *id != SuiAddress::RANDOM,
            },
        })
    }

    /// Dry-run with the maximum budget and no payment, then budget the
    /// computation cost plus overhead, adding net storage when positive.
    fn estimate_budget(
        &self,
        sender: SuiAddress,
        pt: &ProgrammableTransaction,
        price: u64,
        spec: &BuildSpec,
    ) -> CustodyResult<u64> {
        let probe = TransactionData::new_programmable(
            sender,
            pt.clone(),
            GasData {
                payment: vec![],
                owner: sender,
                price,
                budget: self.gas.max_gas_budget,
            },
        );
        let probe_bytes = probe.to_bcs_bytes()?;

        let result = self
            .network
            .dry_run(&probe_bytes)
            .map_err(|e| CustodyError::wrap(ErrorCode::NetworkResolution, "Dry run request failed", &e))?;

        if let ExecutionStatus::Failure { error } = &result.status {
            if matches!(spec, BuildSpec::Transfer { .. }) && error.contains("InsufficientCoinBalance") {
                return Err(CustodyError::invalid_amount("Amount exceeds available balance").with_details(error.clone()));
            }
            return Err(CustodyError::network_resolution(
                "Dry run failed, could not automatically determine a budget",
            )
            .with_details(error.clone()));
        }

        let gas = result.gas_used;
        let overhead = GAS_SAFE_OVERHEAD.saturating_mul(price);
        let base = gas.computation_cost.saturating_add(overhead);
        let with_storage = (base as i128) + (gas.storage_cost as i128) - (gas.storage_rebate as i128);
        let budget = if with_storage > base as i128 {
            u64::try_from(with_storage).unwrap_or(u64::MAX)
        } else {
            base
        };
        Ok(budget.min(self.gas.max_gas_budget))
    }

    /// SUI coins of the sender not already used as inputs
    fn select_gas_payment(
        &self,
        sender: SuiAddress,
        object_ids: &HashSet<ObjectId>,
        budget: u64,
        spec: &BuildSpec,
    ) -> CustodyResult<Vec<Coin>> {
        let page = self
            .network
            .get_coins(&sender, SUI_COIN_TYPE, None, None)
            .map_err(|e| CustodyError::wrap(ErrorCode::NetworkResolution, "Failed to fetch gas coins", &e))?;

        let payment: Vec<Coin> = page
            .data
            .into_iter()
            .filter(|coin| !object_ids.contains(&coin.coin_object_id))
            .take(self.gas.max_gas_objects)
            .collect();

        if payment.is_empty() {
            return Err(CustodyError::network_resolution("No valid gas coins found for the transaction"));
        }

        let available: u128 = payment.iter().map(|c| c.balance as u128).sum();
        if let BuildSpec::Transfer { amount_mist, .. } = spec {
            if (*amount_mist as u128) + (budget as u128) > available {
                return Err(CustodyError::invalid_amount("Amount exceeds available balance").with_details(format!(
                    "amount {} + gas budget {} > balance {} MIST",
                    amount_mist, budget, available
                )));
            }
        }
        if (budget as u128) > available {
            return Err(CustodyError::network_resolution("Insufficient gas")
                .with_details(format!("gas budget {} > balance {} MIST", budget, available)));
        }

        Ok(payment)
    }
}
