// tests/pipeline_dedup.rs
//
// Duplicate suppression and the fatal pre-side-effect failures: a bad
// target address or an unknown idea must leave the store untouched.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use signal_inbox::config::PipelineConfig;
use signal_inbox::error::IngestError;
use signal_inbox::pipeline::{InboundEmail, Pipeline};
use signal_inbox::signal::CandidateSignal;
use signal_inbox::store::{InsertOutcome, MemorySignalStore, SignalStore};
use signal_inbox::summarize::MockSummarizer;
use signal_inbox::target::{IdeaContext, MemoryIdeaDirectory};

/// Wraps the in-memory store and counts every call, so tests can assert
/// "no persistence calls happened at all".
struct CountingStore {
    inner: MemorySignalStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemorySignalStore::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SignalStore for CountingStore {
    async fn exists(&self, idea_id: i64, canonical_url: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(idea_id, canonical_url).await
    }

    async fn insert(&self, idea_id: i64, signal: &CandidateSignal) -> Result<InsertOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(idea_id, signal).await
    }
}

fn pipeline_with(store: Arc<dyn SignalStore>) -> Pipeline {
    let directory = Arc::new(MemoryIdeaDirectory::with_ideas([IdeaContext {
        id: 7,
        name: "Idea 7".into(),
        category: "b2b".into(),
        mission: String::new(),
    }]));
    Pipeline::new(
        directory,
        Arc::new(MockSummarizer::failing()),
        store,
        PipelineConfig::default(),
    )
}

fn email_with_url(text: &str) -> InboundEmail {
    InboundEmail {
        from: "sender@example.com".into(),
        subject: "Same source".into(),
        text: text.into(),
        html: None,
        to: "idea-7@in.example.com".into(),
        attachments: vec![],
    }
}

#[tokio::test]
async fn second_message_with_same_idea_and_url_is_skipped() {
    let store = Arc::new(MemorySignalStore::new());
    let pipeline = pipeline_with(store.clone());

    let first = pipeline
        .process(email_with_url("Look at https://x.com/a today."))
        .await
        .expect("first run");
    assert_eq!(first.saved_count, 1);
    assert_eq!(first.skipped_count, 0);

    let second = pipeline
        .process(email_with_url("Different words, same link https://x.com/a."))
        .await
        .expect("second run");
    assert!(second.success, "a duplicate skip is not an error");
    assert_eq!(second.saved_count, 0);
    assert_eq!(second.skipped_count, 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn invalid_target_is_validation_error_with_no_store_calls() {
    let store = Arc::new(CountingStore::new());
    let pipeline = pipeline_with(store.clone());

    let mut msg = email_with_url("anything");
    msg.to = "random@domain.com".into();

    let err = pipeline.process(msg).await.expect_err("must fail");
    assert!(matches!(err, IngestError::Validation(_)));
    assert_eq!(store.call_count(), 0, "no persistence calls on validation failure");
}

#[tokio::test]
async fn unknown_idea_is_lookup_error_with_no_store_calls() {
    let store = Arc::new(CountingStore::new());
    let pipeline = pipeline_with(store.clone());

    let mut msg = email_with_url("anything");
    msg.to = "idea-404@in.example.com".into();

    let err = pipeline.process(msg).await.expect_err("must fail");
    assert!(matches!(err, IngestError::Lookup(_)));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn failing_store_is_reported_per_item_not_as_run_failure() {
    struct BrokenStore;

    #[async_trait::async_trait]
    impl SignalStore for BrokenStore {
        async fn exists(&self, _idea_id: i64, _canonical_url: &str) -> Result<bool> {
            Ok(false)
        }
        async fn insert(
            &self,
            _idea_id: i64,
            _signal: &CandidateSignal,
        ) -> Result<InsertOutcome> {
            anyhow::bail!("connection reset")
        }
    }

    let pipeline = pipeline_with(Arc::new(BrokenStore));
    let report = pipeline
        .process(email_with_url("Look at https://x.com/a today."))
        .await
        .expect("run still completes");
    assert!(!report.success);
    assert_eq!(report.saved_count, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].canonical_url, "https://x.com/a");
    assert!(report.errors[0].error.contains("connection reset"));
}
