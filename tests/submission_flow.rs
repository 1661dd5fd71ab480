use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::json;
use sui_custody_signer::config::GasConfig;
use sui_custody_signer::network::{
    Coin, CoinPage, DryRunResult, ExecutionResponse, ExecutionStatus, GasCostSummary, NetworkClient, ObjectInfo,
    Owner,
};
use sui_custody_signer::signer::{HashFunction, LocalKeySigner, SignerDirectory};
use sui_custody_signer::tx::{
    digest_bytes, CallArgument, Command, MoveCallSpec, RawSignatureComponents, SerializedSignature,
    UnsignedTransaction,
};
use sui_custody_signer::{
    CustodyError, CustodyResult, ErrorCode, ObjectDigest, ObjectId, ObjectRef, Outcome, Stage, SubmissionOrchestrator,
    SuiAddress,
};

const KEY_ID: &str = "wallet-key";

/// Fullnode stand-in that checks what it is asked to execute
struct MemoryNetwork {
    coin_pages: Vec<Vec<Coin>>,
    objects: Vec<(ObjectId, ObjectInfo)>,
    execution_status: ExecutionStatus,
    fail_transport: bool,
    executed: Mutex<Vec<(Vec<u8>, SerializedSignature)>>,
}

impl MemoryNetwork {
    fn with_balance(balance: u64) -> Self {
        Self {
            coin_pages: vec![vec![coin(1, balance)]],
            objects: Vec::new(),
            execution_status: ExecutionStatus::Success,
            fail_transport: false,
            executed: Mutex::new(Vec::new()),
        }
    }

    fn executed_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

fn coin(fill: u8, balance: u64) -> Coin {
    Coin {
        coin_object_id: SuiAddress::new([fill; 32]),
        version: 1,
        digest: ObjectDigest([fill; 32]),
        balance,
        coin_type: "0x2::sui::SUI".to_string(),
    }
}

impl NetworkClient for MemoryNetwork {
    fn reference_gas_price(&self) -> CustodyResult<u64> {
        Ok(750)
    }

    fn get_coins(&self, _: &SuiAddress, _: &str, cursor: Option<&str>, _: Option<usize>) -> CustodyResult<CoinPage> {
        let page: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
        let has_next_page = page + 1 < self.coin_pages.len();
        Ok(CoinPage {
            data: self.coin_pages.get(page).cloned().unwrap_or_default(),
            next_cursor: has_next_page.then(|| (page + 1).to_string()),
            has_next_page,
        })
    }

    fn get_object(&self, object_id: &ObjectId) -> CustodyResult<ObjectInfo> {
        self.objects
            .iter()
            .find(|(id, _)| id == object_id)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| CustodyError::network("object not found"))
    }

    fn dry_run(&self, _: &[u8]) -> CustodyResult<DryRunResult> {
        Ok(DryRunResult {
            status: ExecutionStatus::Success,
            gas_used: GasCostSummary {
                computation_cost: 750_000,
                storage_cost: 988_000,
                storage_rebate: 978_120,
                non_refundable_storage_fee: 9_880,
            },
        })
    }

    fn execute(&self, tx_bytes: &[u8], signature: &SerializedSignature) -> CustodyResult<ExecutionResponse> {
        if self.fail_transport {
            return Err(CustodyError::network("connection reset"));
        }
        let tx = UnsignedTransaction::from_bytes(tx_bytes.to_vec())?;
        signature.verify(&digest_bytes(tx_bytes))?;
        assert_eq!(
            SuiAddress::from_public_key(&signature.public_key()),
            tx.decode()?.sender(),
            "signature key must own the sender address"
        );

        self.executed.lock().unwrap().push((tx_bytes.to_vec(), signature.clone()));
        Ok(ExecutionResponse {
            digest: tx.transaction_digest(),
            status: self.execution_status.clone(),
            raw_effects: json!({"status": self.execution_status}),
        })
    }
}

/// Counts signing requests and can tamper with the result
struct CountingSigner {
    inner: LocalKeySigner,
    sign_calls: AtomicUsize,
    swap_components: bool,
    refuse: bool,
}

impl CountingSigner {
    fn new() -> Self {
        Self {
            inner: LocalKeySigner::from_seed(KEY_ID, [42; 32]),
            sign_calls: AtomicUsize::new(0),
            swap_components: false,
            refuse: false,
        }
    }
}

impl SignerDirectory for CountingSigner {
    fn public_key_hex(&self, key_id: &str) -> CustodyResult<String> {
        self.inner.public_key_hex(key_id)
    }

    fn sign_digest(
        &self,
        sign_with: &str,
        digest_hex: &str,
        hash_function: HashFunction,
    ) -> CustodyResult<RawSignatureComponents> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(CustodyError::signer("blocked by policy"));
        }
        let raw = self.inner.sign_digest(sign_with, digest_hex, hash_function)?;
        if self.swap_components {
            return Ok(RawSignatureComponents::new(raw.s, raw.r));
        }
        Ok(raw)
    }
}

fn orchestrator(network: Arc<MemoryNetwork>, signer: Arc<CountingSigner>) -> SubmissionOrchestrator {
    SubmissionOrchestrator::new(network, signer, KEY_ID, GasConfig::default())
}

fn recipient() -> String {
    format!("0x{}", "5a".repeat(32))
}

#[test]
fn transfer_is_signed_and_confirmed() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let signer = Arc::new(CountingSigner::new());
    let receipt = orchestrator(network.clone(), signer.clone())
        .transfer(&recipient(), "1.5")
        .unwrap();

    assert_eq!(receipt.outcome, Outcome::Confirmed);
    assert_eq!(receipt.status, "success");
    assert!(receipt.error.is_none());
    assert_eq!(signer.sign_calls.load(Ordering::SeqCst), 1);

    let executed = network.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    let (bytes, _) = &executed[0];
    let tx = UnsignedTransaction::from_bytes(bytes.clone()).unwrap();
    assert_eq!(receipt.digest, tx.transaction_digest());

    let data = tx.decode().unwrap();
    assert_eq!(data.sender(), signer.inner.address());
    assert_eq!(data.gas_data().price, 750);
    // computation + 1000 * price + (storage - rebate)
    assert_eq!(data.gas_data().budget, 750_000 + 750_000 + 9_880);
    assert_eq!(data.programmable().commands.len(), 2);
}

#[test]
fn reverted_execution_is_rejected_not_error() {
    let mut network = MemoryNetwork::with_balance(5_000_000_000);
    network.execution_status = ExecutionStatus::Failure {
        error: "MoveAbort(MoveLocation { module: pool }, 3) in command 0".into(),
    };
    let receipt = orchestrator(Arc::new(network), Arc::new(CountingSigner::new()))
        .transfer(&recipient(), "0.25")
        .unwrap();

    assert_eq!(receipt.outcome, Outcome::Rejected);
    assert_eq!(receipt.status, "failure");
    assert_eq!(
        receipt.error.as_deref(),
        Some("MoveAbort(MoveLocation { module: pool }, 3) in command 0")
    );
    assert!(!receipt.is_confirmed());
}

#[test]
fn sub_mist_amount_never_reaches_the_signer() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let signer = Arc::new(CountingSigner::new());
    let err = orchestrator(network.clone(), signer.clone())
        .transfer(&recipient(), "0.0000000001")
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidAmount);
    assert_eq!(signer.sign_calls.load(Ordering::SeqCst), 0);
    assert_eq!(network.executed_count(), 0);
}

#[test]
fn bad_recipient_is_invalid_address() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let err = orchestrator(network, Arc::new(CountingSigner::new()))
        .transfer("0x1234", "1")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidAddress);
}

#[test]
fn signer_refusal_stops_before_submit() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let mut signer = CountingSigner::new();
    signer.refuse = true;
    let signer = Arc::new(signer);

    let err = orchestrator(network.clone(), signer.clone())
        .transfer(&recipient(), "1")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Signer);
    assert_eq!(err.stage, Some(Stage::RemoteSign));
    assert_eq!(signer.sign_calls.load(Ordering::SeqCst), 1);
    assert_eq!(network.executed_count(), 0);
}

#[test]
fn swapped_components_are_caught_locally() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let mut signer = CountingSigner::new();
    signer.swap_components = true;

    let err = orchestrator(network.clone(), Arc::new(signer))
        .transfer(&recipient(), "1")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedSignature);
    assert_eq!(err.stage, Some(Stage::Assemble));
    assert_eq!(network.executed_count(), 0);
}

#[test]
fn unknown_key_fails_identity_fetch() {
    let network = Arc::new(MemoryNetwork::with_balance(5_000_000_000));
    let orchestrator = SubmissionOrchestrator::new(network, Arc::new(CountingSigner::new()), "other", GasConfig::default());
    let err = orchestrator.wallet_info().unwrap_err();
    assert_eq!(err.code, ErrorCode::Signer);
    assert_eq!(err.stage, Some(Stage::IdentityFetch));
}

#[test]
fn transport_failure_is_submission_error() {
    let mut network = MemoryNetwork::with_balance(5_000_000_000);
    network.fail_transport = true;
    let err = orchestrator(Arc::new(network), Arc::new(CountingSigner::new()))
        .transfer(&recipient(), "1")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Submission);
    assert_eq!(err.stage, Some(Stage::Submit));
    assert!(err.details.unwrap().contains("connection reset"));
}

#[test]
fn insufficient_balance_is_invalid_amount() {
    let network = Arc::new(MemoryNetwork::with_balance(1_000_000_000));
    let err = orchestrator(network, Arc::new(CountingSigner::new()))
        .transfer(&recipient(), "1")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidAmount);
    assert_eq!(err.stage, Some(Stage::Build));
}

#[test]
fn move_call_with_shared_object() {
    let pool = SuiAddress::new([0x90; 32]);
    let mut network = MemoryNetwork::with_balance(5_000_000_000);
    network.objects.push((
        pool,
        ObjectInfo {
            object_ref: ObjectRef::new(pool, 12, ObjectDigest([0x91; 32])),
            owner: Owner::Shared { initial_shared_version: 4 },
        },
    ));
    let network = Arc::new(network);

    let spec = MoveCallSpec::new(
        "0xdee9::clob::deposit",
        vec!["0x2::sui::SUI".into()],
        vec![
            CallArgument::ObjectRef(pool.to_hex()),
            CallArgument::GasCoin,
            CallArgument::U64("100".into()),
            CallArgument::Str("memo".into()),
            CallArgument::Bool(true),
        ],
    );
    let receipt = orchestrator(network.clone(), Arc::new(CountingSigner::new()))
        .move_call(spec)
        .unwrap();
    assert!(receipt.is_confirmed());

    let executed = network.executed.lock().unwrap();
    let data = UnsignedTransaction::from_bytes(executed[0].0.clone()).unwrap().decode().unwrap();
    let pt = data.programmable();
    assert_eq!(pt.inputs.len(), 4);
    assert!(matches!(&pt.commands[..], [Command::MoveCall(_)]));
}

#[test]
fn unsupported_kind_fails_before_any_call() {
    let err = CallArgument::list_from_json(r#"[{"kind":"vector","value":[1,2]}]"#).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedArgumentKind);
    assert!(err.is_invalid_argument());
}

#[test]
fn wallet_info_sums_every_page() {
    let mut network = MemoryNetwork::with_balance(0);
    network.coin_pages = vec![
        vec![coin(1, u64::MAX), coin(2, 5)],
        vec![coin(3, 10)],
        vec![coin(4, 1_000_000_000)],
    ];
    let signer = Arc::new(CountingSigner::new());
    let info = orchestrator(Arc::new(network), signer.clone()).wallet_info().unwrap();

    let expected = u64::MAX as u128 + 5 + 10 + 1_000_000_000;
    assert_eq!(info.balance_mist, expected.to_string());
    assert_eq!(info.address, signer.inner.address());
    assert_eq!(info.public_key_hex, hex::encode(signer.inner.public_key()));
}

#[test]
fn concurrent_submissions_are_independent() {
    let network = Arc::new(MemoryNetwork::with_balance(50_000_000_000));
    let signer = Arc::new(CountingSigner::new());
    let orchestrator = Arc::new(orchestrator(network.clone(), signer.clone()));

    let handles: Vec<_> = (1..=4)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            thread::spawn(move || orchestrator.transfer(&recipient(), &i.to_string()))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().unwrap().is_confirmed());
    }

    assert_eq!(signer.sign_calls.load(Ordering::SeqCst), 4);
    assert_eq!(network.executed_count(), 4);
}
