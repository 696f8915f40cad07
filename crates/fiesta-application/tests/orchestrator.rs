use async_trait::async_trait;
use fiesta_application::orchestrator::IMAGE_READY_TEXT;
use fiesta_application::{PaneStatus, RequestOrchestrator, TurnState};
use fiesta_core::config::{OverlapPolicy, TurnConfig};
use fiesta_core::{
    FiestaError, ImagePayload, Model, ModelCatalog, ModelKind, Prompt, Provider, Result, Sender,
    StaticCredentials, StoreEvent,
};
use fiesta_interaction::{
    AdapterRegistry, Generation, InstantPacer, PresentationPacer, ProviderAdapter, WordPacer,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Test adapters
// ============================================================================

/// Replies with a fixed result, optionally after a delay on the first call.
struct MockAdapter {
    kind: ModelKind,
    reply: Result<Generation>,
    first_call_delay: Duration,
    calls: AtomicUsize,
    prompts: std::sync::Mutex<Vec<Prompt>>,
}

impl MockAdapter {
    fn new(kind: ModelKind, reply: Result<Generation>) -> Self {
        Self {
            kind,
            reply,
            first_call_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn text(reply: &str) -> Self {
        Self::new(ModelKind::Text, Ok(Generation::Text(reply.to_string())))
    }

    fn image() -> Self {
        Self::new(ModelKind::Image, Ok(Generation::Image(ImagePayload::png("iVBOR"))))
    }

    fn failing(kind: ModelKind) -> Self {
        Self::new(kind, Err(FiestaError::status(503, "unavailable")))
    }

    fn slow_first_call(mut self, delay: Duration) -> Self {
        self.first_call_delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    async fn generate(&self, prompt: &Prompt, _credential: &str) -> Result<Generation> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 && !self.first_call_delay.is_zero() {
            tokio::time::sleep(self.first_call_delay).await;
        }
        self.reply.clone()
    }
}

struct PanickingAdapter;

#[async_trait]
impl ProviderAdapter for PanickingAdapter {
    fn name(&self) -> &str {
        "panicking"
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Text
    }

    async fn generate(&self, _prompt: &Prompt, _credential: &str) -> Result<Generation> {
        panic!("adapter bug");
    }
}

// ============================================================================
// Fixture
// ============================================================================

fn catalog() -> ModelCatalog {
    ModelCatalog::new(vec![
        Model::new("text-model-A", "Text A", ModelKind::Text, Provider::Google),
        Model::new("image-model-B", "Image B", ModelKind::Image, Provider::OpenRouter),
        Model::new("text-model-C", "Text C", ModelKind::Text, Provider::Google),
        Model::new("code-model", "Code", ModelKind::Code, Provider::Google),
        Model::new("spare-1", "Spare 1", ModelKind::Text, Provider::Google),
        Model::new("spare-2", "Spare 2", ModelKind::Text, Provider::Google),
        Model::new("spare-3", "Spare 3", ModelKind::Text, Provider::Google),
    ])
}

fn both_keys() -> StaticCredentials {
    StaticCredentials::new()
        .with(Provider::Google, "g-key")
        .with(Provider::OpenRouter, "or-key")
}

struct Fixture {
    adapters: Vec<(&'static str, Arc<dyn ProviderAdapter>)>,
    credentials: StaticCredentials,
    pacer: Arc<dyn PresentationPacer>,
    turns: TurnConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            adapters: Vec::new(),
            credentials: both_keys(),
            pacer: Arc::new(InstantPacer),
            turns: TurnConfig {
                default_panes: Vec::new(),
                ..TurnConfig::default()
            },
        }
    }

    fn pane(mut self, id: &'static str, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push((id, adapter));
        self.turns.default_panes.push(id.to_string());
        self
    }

    fn credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    fn pacer(mut self, pacer: Arc<dyn PresentationPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    fn overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.turns.overlap = overlap;
        self
    }

    fn build(self) -> RequestOrchestrator {
        let registry = self
            .adapters
            .into_iter()
            .fold(AdapterRegistry::new(), |registry, (id, adapter)| {
                registry.with(id, adapter)
            });
        RequestOrchestrator::new(catalog(), registry, Arc::new(self.credentials), self.pacer)
            .with_turn_config(&self.turns)
    }
}

// ============================================================================
// End-to-end turns
// ============================================================================

#[tokio::test]
async fn test_text_and_image_turn_settles_with_results() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("Hi! How can I help?")))
        .pane("image-model-B", Arc::new(MockAdapter::image()))
        .build();

    let report = orchestrator.submit(Prompt::new("Hello")).await.unwrap();

    assert!(report.all_succeeded());
    let log = orchestrator.store().snapshot().await;
    assert_eq!(log.len(), 3);

    assert_eq!(log[0].sender, Sender::User);
    assert_eq!(log[0].text, "Hello");
    assert!(log[0].id.is_none());

    assert_eq!(log[1].sender, Sender::pane("text-model-A"));
    assert_eq!(log[1].text, "Hi! How can I help?");

    assert_eq!(log[2].sender, Sender::pane("image-model-B"));
    assert_eq!(log[2].text, IMAGE_READY_TEXT);
    assert_eq!(log[2].image, Some(ImagePayload::png("iVBOR")));

    assert!(!orchestrator.is_busy());
    assert_eq!(orchestrator.state(), TurnState::Settled);
}

#[tokio::test]
async fn test_placeholders_follow_user_message_before_any_patch() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("a")))
        .pane("image-model-B", Arc::new(MockAdapter::image()))
        .build();
    let mut events = orchestrator.store().subscribe();

    orchestrator.submit(Prompt::new("Hello")).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen[0], StoreEvent::Appended { index: 0, id: None }));
    assert!(matches!(seen[1], StoreEvent::Appended { index: 1, id: Some(_) }));
    assert!(matches!(seen[2], StoreEvent::Appended { index: 2, id: Some(_) }));
    assert!(seen[3..].iter().all(|e| matches!(e, StoreEvent::Patched { .. })));
}

#[tokio::test]
async fn test_missing_credential_leaves_log_untouched() {
    let text = Arc::new(MockAdapter::text("unused"));
    let image = Arc::new(MockAdapter::image());
    let orchestrator = Fixture::new()
        .pane("text-model-A", text.clone())
        .pane("image-model-B", image.clone())
        .credentials(StaticCredentials::new().with(Provider::Google, "g-key"))
        .build();
    let mut busy = orchestrator.subscribe_busy();

    let err = orchestrator.submit(Prompt::new("Hello")).await.unwrap_err();

    assert_eq!(
        err,
        FiestaError::MissingCredential {
            providers: vec![Provider::OpenRouter]
        }
    );
    assert!(orchestrator.store().is_empty().await);
    assert!(!busy.has_changed().unwrap());
    assert_eq!(orchestrator.state(), TurnState::Idle);
    assert_eq!(text.calls(), 0);
    assert_eq!(image.calls(), 0);
}

#[tokio::test]
async fn test_all_missing_providers_reported_together() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("x")))
        .pane("image-model-B", Arc::new(MockAdapter::image()))
        .credentials(StaticCredentials::new().with(Provider::Google, "   "))
        .build();

    let err = orchestrator.submit(Prompt::new("Hello")).await.unwrap_err();

    assert_eq!(
        err,
        FiestaError::MissingCredential {
            providers: vec![Provider::Google, Provider::OpenRouter]
        }
    );
    assert_eq!(err.to_string(), "Missing API key for Gemini, OpenRouter");
}

#[tokio::test]
async fn test_empty_prompt_and_no_panes_are_rejected() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("x")))
        .build();
    assert_eq!(
        orchestrator.submit(Prompt::new("   ")).await.unwrap_err(),
        FiestaError::EmptyPrompt
    );

    let idle = Fixture::new().build();
    assert_eq!(
        idle.submit(Prompt::new("Hello")).await.unwrap_err(),
        FiestaError::NoActivePanes
    );

    // An image alone is enough to submit.
    let report = orchestrator
        .submit(Prompt::new("").with_image(ImagePayload::png("QUJD")))
        .await
        .unwrap();
    assert!(report.all_succeeded());
}

// ============================================================================
// Fault isolation
// ============================================================================

#[tokio::test]
async fn test_failing_pane_does_not_affect_others() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("from A")))
        .pane("image-model-B", Arc::new(MockAdapter::failing(ModelKind::Image)))
        .pane("text-model-C", Arc::new(MockAdapter::text("from C")))
        .build();

    let report = orchestrator.submit(Prompt::new("Hello")).await.unwrap();

    assert_eq!(
        report.outcome("text-model-A").unwrap().status,
        PaneStatus::Succeeded
    );
    assert_eq!(
        report.outcome("text-model-C").unwrap().status,
        PaneStatus::Succeeded
    );
    assert_eq!(
        report.outcome("image-model-B").unwrap().status,
        PaneStatus::Failed("HTTP error! status: 503".to_string())
    );

    let log = orchestrator.store().snapshot().await;
    assert_eq!(log[1].text, "from A");
    assert_eq!(log[2].text, "Error: HTTP error! status: 503");
    assert!(log[2].image.is_none());
    assert_eq!(log[3].text, "from C");
    assert!(!orchestrator.is_busy());
    assert_eq!(orchestrator.state(), TurnState::Settled);
}

#[tokio::test]
async fn test_panicking_pane_is_reported_as_failure() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(PanickingAdapter))
        .pane("text-model-C", Arc::new(MockAdapter::text("fine")))
        .build();

    let report = orchestrator.submit(Prompt::new("Hello")).await.unwrap();

    assert!(matches!(
        report.outcome("text-model-A").unwrap().status,
        PaneStatus::Failed(_)
    ));
    let log = orchestrator.store().snapshot().await;
    assert!(log[1].text.starts_with("Error: "));
    assert_eq!(log[2].text, "fine");
    assert!(!orchestrator.is_busy());
}

// ============================================================================
// Code pane
// ============================================================================

#[tokio::test]
async fn test_code_pane_writes_slot_not_log() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("text")))
        .pane(
            "code-model",
            Arc::new(MockAdapter::new(
                ModelKind::Code,
                Ok(Generation::Code("fn main() {}".to_string())),
            )),
        )
        .build();
    let mut slot = orchestrator.code_slot().subscribe();

    orchestrator.submit(Prompt::new("hello world")).await.unwrap();

    let log = orchestrator.store().snapshot().await;
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|m| m.sender != Sender::pane("code-model")));
    assert!(slot.has_changed().unwrap());
    assert_eq!(*slot.borrow_and_update(), "fn main() {}");
}

#[tokio::test]
async fn test_code_pane_failure_goes_to_slot() {
    let orchestrator = Fixture::new()
        .pane("code-model", Arc::new(MockAdapter::failing(ModelKind::Code)))
        .build();

    let report = orchestrator.submit(Prompt::new("x")).await.unwrap();

    assert!(!report.all_succeeded());
    assert_eq!(
        orchestrator.code_slot().get(),
        "Error: HTTP error! status: 503"
    );
    assert_eq!(orchestrator.store().len().await, 1);
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_text_reply_is_streamed_word_by_word() {
    let reply = "one two three four";
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text(reply)))
        .pacer(Arc::new(WordPacer::default()))
        .build();
    let store = orchestrator.store();
    let mut events = store.subscribe();

    orchestrator.submit(Prompt::new("count")).await.unwrap();

    let mut patches = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StoreEvent::Patched { .. }) {
            patches += 1;
        }
    }
    // One patch per word plus the final exact text.
    assert_eq!(patches, 5);
    assert_eq!(store.snapshot().await[1].text, reply);
}

#[tokio::test]
async fn test_web_search_flag_reaches_adapters() {
    let adapter = Arc::new(MockAdapter::text("ok"));
    let orchestrator = Fixture::new().pane("text-model-A", adapter.clone()).build();

    orchestrator.submit(Prompt::new("plain")).await.unwrap();
    orchestrator.set_web_search(true);
    orchestrator.submit(Prompt::new("searched")).await.unwrap();

    let prompts = adapter.prompts.lock().unwrap();
    assert!(!prompts[0].web_search);
    assert!(prompts[1].web_search);
}

// ============================================================================
// Pane lifecycle
// ============================================================================

#[tokio::test]
async fn test_removing_pane_prunes_its_history() {
    let orchestrator = Fixture::new()
        .pane("text-model-A", Arc::new(MockAdapter::text("from A")))
        .pane("text-model-C", Arc::new(MockAdapter::text("from C")))
        .build();
    orchestrator.submit(Prompt::new("first")).await.unwrap();
    orchestrator.submit(Prompt::new("second")).await.unwrap();
    let before = orchestrator.store().snapshot().await;

    assert!(orchestrator.remove_pane("text-model-A").await);

    let after = orchestrator.store().snapshot().await;
    let expected: Vec<_> = before
        .into_iter()
        .filter(|m| m.sender != Sender::pane("text-model-A"))
        .collect();
    assert_eq!(after, expected);
    assert_eq!(after.len(), 4);
    assert_eq!(orchestrator.panes().await, vec!["text-model-C"]);
    assert!(!orchestrator.remove_pane("text-model-A").await);
}

#[tokio::test]
async fn test_pane_set_limits() {
    let orchestrator = Fixture::new().build();

    for id in ["text-model-A", "image-model-B", "text-model-C", "code-model", "spare-1"] {
        assert!(orchestrator.add_pane(id).await.unwrap());
    }
    assert!(!orchestrator.add_pane("text-model-A").await.unwrap());
    assert_eq!(
        orchestrator.add_pane("spare-2").await.unwrap_err(),
        FiestaError::PaneLimit { max: 5 }
    );
    assert!(orchestrator.add_pane("unknown").await.unwrap_err().is_not_found());
    assert_eq!(orchestrator.panes().await.len(), 5);
}

// ============================================================================
// Overlapping turns
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_new_turn_cancels_previous_and_drops_its_patches() {
    let adapter = Arc::new(MockAdapter::text("fresh reply").slow_first_call(Duration::from_secs(60)));
    let orchestrator = Arc::new(
        Fixture::new()
            .pane("text-model-A", adapter.clone())
            .overlap(OverlapPolicy::CancelPrevious)
            .build(),
    );
    let mut busy = orchestrator.subscribe_busy();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(Prompt::new("first")).await }
    });
    busy.wait_for(|busy| *busy).await.unwrap();

    let second = orchestrator.submit(Prompt::new("second")).await.unwrap();
    let first = first.await.unwrap().unwrap();

    assert!(first.was_cancelled());
    assert!(second.all_succeeded());
    assert_eq!(adapter.calls(), 2);

    let log = orchestrator.store().snapshot().await;
    let texts: Vec<_> = log.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "", "second", "fresh reply"]);
    assert!(!orchestrator.is_busy());
    assert_eq!(orchestrator.state(), TurnState::Settled);
}

#[tokio::test(start_paused = true)]
async fn test_reject_policy_refuses_overlapping_turn() {
    let adapter = Arc::new(MockAdapter::text("done").slow_first_call(Duration::from_secs(5)));
    let orchestrator = Arc::new(
        Fixture::new()
            .pane("text-model-A", adapter.clone())
            .overlap(OverlapPolicy::Reject)
            .build(),
    );
    let mut busy = orchestrator.subscribe_busy();

    let first = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(Prompt::new("first")).await }
    });
    busy.wait_for(|busy| *busy).await.unwrap();

    assert_eq!(
        orchestrator.submit(Prompt::new("second")).await.unwrap_err(),
        FiestaError::TurnInProgress
    );
    assert_eq!(orchestrator.store().len().await, 2);

    let first = first.await.unwrap().unwrap();
    assert!(first.all_succeeded());
    assert!(!orchestrator.is_busy());

    // Once settled, the next turn goes through.
    assert!(orchestrator.submit(Prompt::new("third")).await.unwrap().all_succeeded());
}

#[tokio::test(start_paused = true)]
async fn test_explicit_cancel_settles_turn() {
    let adapter = Arc::new(MockAdapter::text("late").slow_first_call(Duration::from_secs(60)));
    let orchestrator = Arc::new(Fixture::new().pane("text-model-A", adapter).build());
    let mut busy = orchestrator.subscribe_busy();

    let turn = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.submit(Prompt::new("hi")).await }
    });
    busy.wait_for(|busy| *busy).await.unwrap();

    assert!(orchestrator.cancel().await);
    let report = turn.await.unwrap().unwrap();

    assert_eq!(
        report.outcome("text-model-A").unwrap().status,
        PaneStatus::Cancelled
    );
    assert_eq!(orchestrator.store().snapshot().await[1].text, "");
    assert!(!orchestrator.is_busy());
}
