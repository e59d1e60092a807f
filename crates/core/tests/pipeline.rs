//! End-to-end pipeline behavior against in-process fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    ChainDataSource, ContractRuntime, FetchError, InvocationError, Orchestrator, PipelineError,
    RequestLedger, RequestStatus, RuntimeRegistry, StorageError,
};
use relay_storage::MemoryLedger;

const CONTRACT: &str = "abc123";

// ──────────────────────────────────────────────
// Fakes
// ──────────────────────────────────────────────

struct FakeSource {
    reply: Mutex<Result<String, FetchError>>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn payload(payload: &str) -> Arc<Self> {
        Arc::new(FakeSource {
            reply: Mutex::new(Ok(payload.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(err: FetchError) -> Arc<Self> {
        Arc::new(FakeSource {
            reply: Mutex::new(Err(err)),
            calls: AtomicUsize::new(0),
        })
    }

    fn set_payload(&self, payload: &str) {
        *self.reply.lock().unwrap() = Ok(payload.to_string());
    }
}

#[async_trait]
impl ChainDataSource for FakeSource {
    async fn fetch_latest(&self, _contract: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }
}

struct FakeRuntime {
    reply: Mutex<Result<String, InvocationError>>,
    envelopes: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeRuntime {
    fn replying(reply: &str) -> Arc<Self> {
        Self::build(Ok(reply.to_string()), Duration::ZERO)
    }

    fn erroring(err: InvocationError) -> Arc<Self> {
        Self::build(Err(err), Duration::ZERO)
    }

    fn slow(reply: &str, delay: Duration) -> Arc<Self> {
        Self::build(Ok(reply.to_string()), delay)
    }

    fn build(reply: Result<String, InvocationError>, delay: Duration) -> Arc<Self> {
        Arc::new(FakeRuntime {
            reply: Mutex::new(reply),
            envelopes: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = Ok(reply.to_string());
    }

    fn calls(&self) -> usize {
        self.envelopes.lock().unwrap().len()
    }
}

#[async_trait]
impl ContractRuntime for FakeRuntime {
    async fn call(&self, envelope: &str) -> Result<String, InvocationError> {
        self.envelopes.lock().unwrap().push(envelope.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.lock().unwrap().clone()
    }

    fn runtime_id(&self) -> &str {
        "fake"
    }
}

struct Harness {
    orchestrator: Arc<Orchestrator>,
    source: Arc<FakeSource>,
    runtime: Arc<FakeRuntime>,
    ledger: Arc<MemoryLedger>,
}

fn harness(source: Arc<FakeSource>, runtime: Arc<FakeRuntime>) -> Harness {
    harness_with_ledger(source, runtime, Arc::new(MemoryLedger::new()))
}

fn harness_with_ledger(
    source: Arc<FakeSource>,
    runtime: Arc<FakeRuntime>,
    ledger: Arc<MemoryLedger>,
) -> Harness {
    let mut runtimes = RuntimeRegistry::new();
    runtimes.insert(CONTRACT, runtime.clone());
    let orchestrator = Orchestrator::new(
        source.clone(),
        ledger.clone(),
        runtimes,
        Duration::from_secs(5),
    );
    Harness {
        orchestrator: Arc::new(orchestrator),
        source,
        runtime,
        ledger,
    }
}

// ──────────────────────────────────────────────
// Happy path and dedupe
// ──────────────────────────────────────────────

#[tokio::test]
async fn first_mint_succeeds_and_is_recorded() {
    let payload = r#"{"mint_sample_nft": {"to": "alice"}}"#;
    let h = harness(FakeSource::payload(payload), FakeRuntime::replying("success"));

    let report = h.orchestrator.invoke(CONTRACT).await.unwrap();

    assert_eq!(report.request_id, "abc123-mint");
    assert_eq!(report.operation, "mint_sample_nft");
    assert_eq!(report.status, RequestStatus::Succeeded);
    assert!(!report.skipped);
    assert!(report.outcome.success);
    assert_eq!(report.outcome.message, "mint_sample_nft executed successfully");
    assert_eq!(
        h.ledger.get_status("abc123-mint").await.unwrap(),
        RequestStatus::Succeeded
    );
    // The runtime sees the payload exactly as it was stored on chain.
    assert_eq!(h.runtime.envelopes.lock().unwrap().as_slice(), [payload]);
}

#[tokio::test]
async fn repeat_after_success_is_skipped() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );

    h.orchestrator.invoke(CONTRACT).await.unwrap();
    let second = h.orchestrator.invoke(CONTRACT).await.unwrap();

    assert!(second.skipped);
    assert_eq!(second.status, RequestStatus::Succeeded);
    assert!(second.outcome.success);
    assert_eq!(h.runtime.calls(), 1);
}

#[tokio::test]
async fn mint_variants_share_one_request_id() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );
    h.orchestrator.invoke(CONTRACT).await.unwrap();

    h.source.set_payload(r#"{"mint_sample_ft": {"amount": 5}}"#);
    let report = h.orchestrator.invoke(CONTRACT).await.unwrap();

    assert_eq!(report.request_id, "abc123-mint");
    assert!(report.skipped);
    assert_eq!(h.runtime.calls(), 1);
}

#[tokio::test]
async fn transfer_after_mint_is_a_new_request() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );
    h.orchestrator.invoke(CONTRACT).await.unwrap();

    h.source.set_payload(r#"{"transfer_sample_nft": {"to": "bob"}}"#);
    let report = h.orchestrator.invoke(CONTRACT).await.unwrap();

    assert_eq!(report.request_id, "abc123-transfer");
    assert!(!report.skipped);
    assert_eq!(h.runtime.calls(), 2);
}

// ──────────────────────────────────────────────
// Failures
// ──────────────────────────────────────────────

#[tokio::test]
async fn failed_outcome_is_recorded_and_retried() {
    let h = harness(
        FakeSource::payload(r#"{"transfer_sample_nft": {"to": "bob"}}"#),
        FakeRuntime::replying(r#"{"status": false, "message": "NFT not owned by sender"}"#),
    );

    let first = h.orchestrator.invoke(CONTRACT).await.unwrap();
    assert_eq!(first.status, RequestStatus::Failed);
    assert!(!first.outcome.success);
    assert_eq!(first.outcome.message, "NFT not owned by sender");
    assert_eq!(
        h.orchestrator.query_status("abc123-transfer").await.unwrap(),
        RequestStatus::Failed
    );

    h.runtime.set_reply("success");
    let second = h.orchestrator.invoke(CONTRACT).await.unwrap();
    assert!(!second.skipped);
    assert_eq!(second.status, RequestStatus::Succeeded);
    assert_eq!(h.runtime.calls(), 2);
}

#[tokio::test]
async fn runtime_error_records_failed() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_ft": {}}"#),
        FakeRuntime::erroring(InvocationError::Unreachable {
            message: "connection refused".into(),
        }),
    );

    let err = h.orchestrator.invoke(CONTRACT).await.unwrap_err();
    match &err {
        PipelineError::Invocation { request_id, source } => {
            assert_eq!(request_id, "abc123-mint");
            assert!(matches!(source, InvocationError::Unreachable { .. }));
        }
        other => panic!("expected Invocation error, got {:?}", other),
    }
    assert_eq!(err.stage(), "invoke");
    assert_eq!(
        h.ledger.get_status("abc123-mint").await.unwrap(),
        RequestStatus::Failed
    );
}

#[tokio::test]
async fn unparseable_reply_records_failed() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("ok"),
    );

    let err = h.orchestrator.invoke(CONTRACT).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Invocation {
            source: InvocationError::UnparseableResponse { .. },
            ..
        }
    ));
    assert_eq!(
        h.ledger.get_status("abc123-mint").await.unwrap(),
        RequestStatus::Failed
    );
}

#[tokio::test]
async fn fetch_failure_leaves_ledger_untouched() {
    let h = harness(
        FakeSource::failing(FetchError::Unreachable {
            address: "http://127.0.0.1:1".into(),
            message: "connection refused".into(),
        }),
        FakeRuntime::replying("success"),
    );

    let err = h.orchestrator.invoke(CONTRACT).await.unwrap_err();
    assert_eq!(err.stage(), "fetch");
    assert!(err.is_pre_ledger());
    assert!(h.ledger.records().await.is_empty());
    assert_eq!(h.runtime.calls(), 0);
}

#[tokio::test]
async fn ambiguous_payload_is_rejected_before_the_ledger() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}, "transfer_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );

    let err = h.orchestrator.invoke(CONTRACT).await.unwrap_err();
    assert_eq!(err.stage(), "decode");
    assert!(h.ledger.records().await.is_empty());
    assert_eq!(h.runtime.calls(), 0);
}

#[tokio::test]
async fn unsupported_operation_is_rejected_before_the_ledger() {
    let h = harness(
        FakeSource::payload(r#"{"burn_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );

    let err = h.orchestrator.invoke(CONTRACT).await.unwrap_err();
    match err {
        PipelineError::UnsupportedOperation { name } => assert_eq!(name, "burn_sample_nft"),
        other => panic!("expected UnsupportedOperation, got {:?}", other),
    }
    assert!(h.ledger.records().await.is_empty());
    assert_eq!(h.runtime.calls(), 0);
}

#[tokio::test]
async fn unknown_contract_never_reaches_the_node() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );

    let err = h.orchestrator.invoke("not-configured").await.unwrap_err();
    assert!(matches!(err, PipelineError::UnknownContract { .. }));
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

// ──────────────────────────────────────────────
// Ledger interplay
// ──────────────────────────────────────────────

#[tokio::test]
async fn leftover_pending_is_reattempted() {
    // A crash between "Pending" and the outcome leaves this behind.
    let ledger = Arc::new(MemoryLedger::new());
    ledger
        .insert("abc123-mint", RequestStatus::Pending)
        .await
        .unwrap();
    let h = harness_with_ledger(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
        ledger,
    );

    let report = h.orchestrator.invoke(CONTRACT).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.status, RequestStatus::Succeeded);
    assert_eq!(h.runtime.calls(), 1);
}

#[tokio::test]
async fn query_status_of_unknown_id_is_not_found() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );
    assert!(matches!(
        h.orchestrator.query_status("nope-mint").await,
        Err(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
async fn invoke_with_uses_the_given_runtime() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::replying("success"),
    );
    let other = FakeRuntime::replying("success");

    let report = h
        .orchestrator
        .invoke_with("unregistered", other.clone())
        .await
        .unwrap();
    assert_eq!(report.request_id, "unregistered-mint");
    assert_eq!(other.calls(), 1);
    assert_eq!(h.runtime.calls(), 0);
}

// ──────────────────────────────────────────────
// Concurrency
// ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_call_the_runtime_once() {
    let h = harness(
        FakeSource::payload(r#"{"mint_sample_nft": {}}"#),
        FakeRuntime::slow("success", Duration::from_millis(50)),
    );

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(
            async move { orchestrator.invoke(CONTRACT).await },
        ));
    }

    let mut skipped = 0;
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, RequestStatus::Succeeded);
        if report.skipped {
            skipped += 1;
        }
    }

    assert_eq!(h.runtime.calls(), 1);
    assert_eq!(skipped, 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_against_a_failing_runtime_each_run() {
    let h = harness(
        FakeSource::payload(r#"{"transfer_sample_nft": {"to": "bob"}}"#),
        FakeRuntime::slow(
            r#"{"status": false, "message": "NFT not owned by sender"}"#,
            Duration::from_millis(20),
        ),
    );

    let mut handles = Vec::new();
    for _ in 0..5 {
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(
            async move { orchestrator.invoke(CONTRACT).await },
        ));
    }

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, RequestStatus::Failed);
        assert!(!report.skipped);
    }

    // Waiters behind a failed attempt run their own attempt in turn.
    assert_eq!(h.runtime.calls(), 5);
    assert_eq!(
        h.ledger.get_status("abc123-transfer").await.unwrap(),
        RequestStatus::Failed
    );
}
