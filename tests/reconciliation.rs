use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use credstate::{
    core::{
        outcome::{DisplayStatus, VerificationOutcome, VerificationResult},
        record::{CredentialRef, LocalVerificationTag, RecordUpdate, StoredCredentialRecord},
    },
    reconcile::{Reconciler, ReconcilerBuilder},
    store::{MemoryStore, MetadataStore, StoreError},
    token::{Operation, SignedToken, TokenError, TokenIssuer},
    verification::VerificationClient,
};
use tokio::time::Instant;

const HOLDER: &str = "0x1234567890abcdef";
const PROGRAM: &str = "program-1";

#[derive(Debug, Default)]
struct StubTokenIssuer {
    fail: bool,
    delay: Duration,
    minted: AtomicUsize,
}

#[async_trait]
impl TokenIssuer for StubTokenIssuer {
    async fn mint(
        &self,
        _subject_id: &str,
        operation: Operation,
        expiry_secs: u64,
    ) -> Result<SignedToken, TokenError> {
        tokio::time::sleep(self.delay).await;
        assert_eq!(operation, Operation::Verification);
        if self.fail {
            return Err(TokenError::MissingConfig("private key"));
        }
        self.minted.fetch_add(1, Ordering::SeqCst);
        Ok(SignedToken {
            token: "stub.token.sig".into(),
            algorithm: "ES256".into(),
            key_id: "kid-1".into(),
            expires_at: Utc::now() + chrono::Duration::seconds(expiry_secs as i64),
        })
    }
}

#[derive(Debug)]
struct StubVerifier {
    outcome: VerificationOutcome,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubVerifier {
    fn new(outcome: VerificationOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(outcome: VerificationOutcome, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(outcome)
        }
    }
}

#[async_trait]
impl VerificationClient for StubVerifier {
    async fn verify(
        &self,
        holder_id: &str,
        token: &SignedToken,
        program_id: &str,
    ) -> VerificationResult {
        assert_eq!(holder_id, HOLDER);
        assert_eq!(token.token, "stub.token.sig");
        assert_eq!(program_id, PROGRAM);
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        VerificationResult::new(self.outcome)
    }
}

#[derive(Debug)]
struct FailingStore;

#[async_trait]
impl MetadataStore for FailingStore {
    async fn get(&self, _holder_id: &str) -> Result<Option<StoredCredentialRecord>, StoreError> {
        Err(anyhow::anyhow!("connection refused").into())
    }

    async fn upsert(
        &self,
        _holder_id: &str,
        _update: RecordUpdate,
    ) -> Result<StoredCredentialRecord, StoreError> {
        Err(anyhow::anyhow!("connection refused").into())
    }
}

#[derive(Debug)]
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl MetadataStore for SlowStore {
    async fn get(&self, holder_id: &str) -> Result<Option<StoredCredentialRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(holder_id).await
    }

    async fn upsert(
        &self,
        holder_id: &str,
        update: RecordUpdate,
    ) -> Result<StoredCredentialRecord, StoreError> {
        self.inner.upsert(holder_id, update).await
    }
}

fn issued_record() -> StoredCredentialRecord {
    let now = Utc::now();
    StoredCredentialRecord {
        holder_id: HOLDER.into(),
        credential_ref: CredentialRef::new("creator-1700000000000-abcdef"),
        created_at: now,
        updated_at: now,
        verification_tag: LocalVerificationTag::Pending,
        username: Some("maker".into()),
        display_name: Some("Ada".into()),
        profile: None,
    }
}

fn store(with_record: bool) -> MemoryStore {
    if with_record {
        MemoryStore::with_records([issued_record()])
    } else {
        MemoryStore::default()
    }
}

fn builder(store: impl MetadataStore + Send + Sync + 'static) -> ReconcilerBuilder {
    Reconciler::builder()
        .with_store(Arc::new(store))
        .with_token_issuer(Arc::new(StubTokenIssuer::default()))
        .with_program_id(PROGRAM)
}

fn reconciler(store: impl MetadataStore + Send + Sync + 'static, verifier: StubVerifier) -> Reconciler {
    builder(store)
        .with_verification_client(Arc::new(verifier))
        .build()
        .unwrap()
}

#[tokio::test]
async fn every_combination_follows_precedence() {
    let expected = |record: bool, outcome| match (record, outcome) {
        (true, VerificationOutcome::Compliant) => DisplayStatus::Verified,
        (true, VerificationOutcome::Expired) => DisplayStatus::Expired,
        (true, _) => DisplayStatus::Issued,
        (false, VerificationOutcome::Error) => DisplayStatus::Error,
        (false, _) => DisplayStatus::NotIssued,
    };

    for with_record in [true, false] {
        for outcome in VerificationOutcome::ALL {
            let result = reconciler(store(with_record), StubVerifier::new(outcome))
                .reconcile(HOLDER)
                .await;

            assert_eq!(
                result.display,
                expected(with_record, outcome),
                "record: {with_record}, outcome: {outcome}"
            );
            assert_eq!(result.verification.outcome, outcome);
            assert_eq!(result.record.is_some(), with_record);
        }
    }
}

#[tokio::test]
async fn issued_record_and_compliant_is_verified() {
    let result = reconciler(store(true), StubVerifier::new(VerificationOutcome::Compliant))
        .reconcile(HOLDER)
        .await;

    assert_eq!(result.display, DisplayStatus::Verified);
    assert_eq!(
        result.record.unwrap().credential_ref.unwrap().as_str(),
        "creator-1700000000000-abcdef"
    );
}

#[tokio::test]
async fn record_survives_a_live_outage() {
    let result = reconciler(store(true), StubVerifier::new(VerificationOutcome::Error))
        .reconcile(HOLDER)
        .await;

    assert_eq!(result.display, DisplayStatus::Issued);
    assert!(result.record.is_some());
}

#[tokio::test]
async fn live_answer_is_kept_without_a_record() {
    let result = reconciler(store(false), StubVerifier::new(VerificationOutcome::Compliant))
        .reconcile(HOLDER)
        .await;

    assert_eq!(result.display, DisplayStatus::NotIssued);
    assert!(result.verification.has_credential());
}

#[tokio::test]
async fn local_verified_tag_does_not_override_live_outcome() {
    let mut record = issued_record();
    record.verification_tag = LocalVerificationTag::Verified;

    let result = reconciler(
        MemoryStore::with_records([record]),
        StubVerifier::new(VerificationOutcome::NonCompliant),
    )
    .reconcile(HOLDER)
    .await;

    assert_eq!(result.display, DisplayStatus::Issued);
}

#[tokio::test]
async fn failed_store_read_counts_as_no_record() {
    let verifier = StubVerifier::new(VerificationOutcome::Revoked);
    let result = reconciler(FailingStore, verifier).reconcile(HOLDER).await;

    assert!(result.record.is_none());
    assert_eq!(result.verification.outcome, VerificationOutcome::Revoked);
    assert_eq!(result.display, DisplayStatus::NotIssued);
}

#[tokio::test]
async fn both_sources_failing_is_an_error() {
    let result = reconciler(FailingStore, StubVerifier::new(VerificationOutcome::Error))
        .reconcile(HOLDER)
        .await;

    assert_eq!(result.display, DisplayStatus::Error);
}

#[tokio::test]
async fn missing_client_reports_error_outcome() {
    let reconciler = builder(store(true)).build().unwrap();

    let result = reconciler.reconcile(HOLDER).await;
    assert_eq!(result.verification.outcome, VerificationOutcome::Error);
    assert_eq!(result.display, DisplayStatus::Issued);

    let reconciler = builder(store(false)).build().unwrap();
    assert_eq!(reconciler.reconcile(HOLDER).await.display, DisplayStatus::Error);
}

#[tokio::test]
async fn token_failure_skips_the_live_call() {
    let verifier = Arc::new(StubVerifier::new(VerificationOutcome::Compliant));
    let reconciler = Reconciler::builder()
        .with_store(Arc::new(store(true)))
        .with_token_issuer(Arc::new(StubTokenIssuer {
            fail: true,
            ..Default::default()
        }))
        .with_verification_client(verifier.clone())
        .with_program_id(PROGRAM)
        .build()
        .unwrap();

    let result = reconciler.reconcile(HOLDER).await;

    assert_eq!(result.verification.outcome, VerificationOutcome::Error);
    assert!(result
        .verification
        .message
        .unwrap()
        .contains("failed to generate verification token"));
    assert_eq!(result.display, DisplayStatus::Issued);
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn blank_holder_is_an_error() {
    let verifier = Arc::new(StubVerifier::new(VerificationOutcome::Compliant));
    let reconciler = builder(store(true))
        .with_verification_client(verifier.clone())
        .build()
        .unwrap();

    let result = reconciler.reconcile("   ").await;

    assert_eq!(result.display, DisplayStatus::Error);
    assert!(result.record.is_none());
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_live_check_times_out() {
    let reconciler = builder(store(true))
        .with_verification_client(Arc::new(StubVerifier::slow(
            VerificationOutcome::Compliant,
            Duration::from_secs(60),
        )))
        .with_timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    let started = Instant::now();
    let result = reconciler.reconcile(HOLDER).await;

    assert_eq!(result.verification.outcome, VerificationOutcome::Error);
    assert_eq!(result.display, DisplayStatus::Issued);
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn timeout_covers_token_minting() {
    let reconciler = Reconciler::builder()
        .with_store(Arc::new(store(false)))
        .with_token_issuer(Arc::new(StubTokenIssuer {
            delay: Duration::from_secs(30),
            ..Default::default()
        }))
        .with_verification_client(Arc::new(StubVerifier::new(VerificationOutcome::Compliant)))
        .with_program_id(PROGRAM)
        .with_timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let result = reconciler.reconcile(HOLDER).await;
    assert_eq!(result.display, DisplayStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn sources_are_read_concurrently() {
    let store = SlowStore {
        inner: store(true),
        delay: Duration::from_millis(100),
    };
    let reconciler = reconciler(
        store,
        StubVerifier::slow(VerificationOutcome::Compliant, Duration::from_millis(150)),
    );

    let started = Instant::now();
    let result = reconciler.reconcile(HOLDER).await;
    let elapsed = started.elapsed();

    assert_eq!(result.display, DisplayStatus::Verified);
    assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
}

#[tokio::test]
async fn builder_requires_collaborators() {
    let err = Reconciler::builder()
        .with_token_issuer(Arc::new(StubTokenIssuer::default()))
        .with_program_id(PROGRAM)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("metadata store is required"));

    let err = Reconciler::builder()
        .with_store(Arc::new(MemoryStore::default()))
        .with_program_id(PROGRAM)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("token issuer is required"));

    let err = Reconciler::builder()
        .with_store(Arc::new(MemoryStore::default()))
        .with_token_issuer(Arc::new(StubTokenIssuer::default()))
        .with_program_id(" ")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("program id is required"));
}
