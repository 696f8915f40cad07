//! Request orchestration for one user turn.
//!
//! A turn fans the prompt out to every active pane, one task per pane, and
//! waits on a barrier until all of them have settled. Each turn carries its
//! own cancellation token; what happens when a turn is submitted while
//! another is running is decided by [`OverlapPolicy`].

use crate::turn::{PaneOutcome, PaneStatus, TurnReport, TurnState};
use fiesta_core::config::{FiestaConfig, OverlapPolicy, TurnConfig};
use fiesta_core::{
    CodeSlot, ConversationStore, CredentialProvider, FiestaError, Message, MessageId,
    MessagePatch, Model, ModelCatalog, PaneSet, Prompt, Provider, Result,
};
use fiesta_interaction::{
    AdapterRegistry, Generation, PresentationPacer, ProviderAdapter, RetryingTransport,
    pacer_from_config,
};
use futures::StreamExt;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Text written to an image pane once its image has arrived.
pub const IMAGE_READY_TEXT: &str = "Image generated successfully.";

/// The turn currently owning the busy flag.
struct ActiveTurn {
    id: String,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ActiveTurn {
    fn is_settled(&self) -> bool {
        self.tracker.is_closed() && self.tracker.is_empty()
    }
}

/// Everything a pane needs to run, resolved before anything is dispatched.
struct PaneJob {
    model: Model,
    adapter: Arc<dyn ProviderAdapter>,
    credential: String,
}

/// Coordinates turns across the active panes.
///
/// The conversation store and the code slot are shared with renderers,
/// which read them and subscribe to their changes but never write.
pub struct RequestOrchestrator {
    catalog: ModelCatalog,
    registry: AdapterRegistry,
    credentials: Arc<dyn CredentialProvider>,
    pacer: Arc<dyn PresentationPacer>,
    store: Arc<ConversationStore>,
    code_slot: CodeSlot,
    panes: RwLock<PaneSet>,
    web_search: AtomicBool,
    overlap: OverlapPolicy,
    active: Mutex<Option<ActiveTurn>>,
    busy: watch::Sender<bool>,
    state: watch::Sender<TurnState>,
}

impl RequestOrchestrator {
    pub fn new(
        catalog: ModelCatalog,
        registry: AdapterRegistry,
        credentials: Arc<dyn CredentialProvider>,
        pacer: Arc<dyn PresentationPacer>,
    ) -> Self {
        Self {
            catalog,
            registry,
            credentials,
            pacer,
            store: Arc::new(ConversationStore::new()),
            code_slot: CodeSlot::new(),
            panes: RwLock::new(PaneSet::new()),
            web_search: AtomicBool::new(false),
            overlap: OverlapPolicy::default(),
            active: Mutex::new(None),
            busy: watch::Sender::new(false),
            state: watch::Sender::new(TurnState::Idle),
        }
    }

    /// Wires the built-in catalog to the real providers.
    pub fn from_config(
        config: &FiestaConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let catalog = ModelCatalog::builtin();
        let transport = Arc::new(RetryingTransport::from_policy(config.retry.clone())?);
        let registry = AdapterRegistry::from_catalog(&catalog, transport, &config.endpoints);
        let pacer = pacer_from_config(&config.pacing);

        Ok(Self::new(catalog, registry, credentials, pacer).with_turn_config(&config.turns))
    }

    /// Applies the overlap policy and pane limit, then opens the default
    /// panes. Unknown default panes are skipped.
    pub fn with_turn_config(mut self, config: &TurnConfig) -> Self {
        self.overlap = config.overlap;
        let mut panes = PaneSet::with_limit(config.max_panes);
        for pane_id in &config.default_panes {
            if !self.catalog.contains(pane_id) {
                tracing::warn!("[Orchestrator] Unknown default pane '{}', skipping", pane_id);
                continue;
            }
            if let Err(e) = panes.add(pane_id.clone()) {
                tracing::warn!("[Orchestrator] Default pane '{}' not opened: {}", pane_id, e);
            }
        }
        *self.panes.get_mut() = panes;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn store(&self) -> Arc<ConversationStore> {
        self.store.clone()
    }

    pub fn code_slot(&self) -> CodeSlot {
        self.code_slot.clone()
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap
    }

    // ============================================================================
    // Panes
    // ============================================================================

    /// Opens a pane for `model_id`. Returns `Ok(false)` if it was already open.
    pub async fn add_pane(&self, model_id: &str) -> Result<bool> {
        if !self.catalog.contains(model_id) {
            return Err(FiestaError::not_found("model", model_id));
        }
        let added = self.panes.write().await.add(model_id)?;
        if added {
            tracing::info!("[Orchestrator] Opened pane '{}'", model_id);
        }
        Ok(added)
    }

    /// Closes a pane and prunes every message it sent.
    ///
    /// A turn still running for the pane keeps going, but its patches find
    /// no placeholder and are dropped.
    pub async fn remove_pane(&self, pane_id: &str) -> bool {
        let mut panes = self.panes.write().await;
        let removed = panes.remove(pane_id);
        let pruned = self.store.prune_sender(pane_id).await;
        drop(panes);
        tracing::info!(
            "[Orchestrator] Closed pane '{}' (pruned {} messages)",
            pane_id,
            pruned
        );
        removed
    }

    /// Active pane ids in display order.
    pub async fn panes(&self) -> Vec<String> {
        self.panes.read().await.ids().to_vec()
    }

    // ============================================================================
    // Session flags
    // ============================================================================

    pub fn set_web_search(&self, enabled: bool) {
        self.web_search.store(enabled, Ordering::Relaxed);
    }

    pub fn web_search(&self) -> bool {
        self.web_search.load(Ordering::Relaxed)
    }

    /// Whether a turn is in flight.
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn state(&self) -> TurnState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TurnState> {
        self.state.subscribe()
    }

    /// Cancels the running turn, if any. Its `submit` still returns a report.
    pub async fn cancel(&self) -> bool {
        match self.active.lock().await.as_ref() {
            Some(turn) if !turn.token.is_cancelled() => {
                tracing::info!("[Orchestrator] Cancelling turn {}", turn.id);
                turn.token.cancel();
                true
            }
            _ => false,
        }
    }

    // ============================================================================
    // Turns
    // ============================================================================

    /// Runs one turn to completion.
    ///
    /// Validation failures (empty prompt, no panes, missing credentials)
    /// return before anything is written or sent. Pane failures never fail
    /// the turn; they are written into the pane and listed in the report.
    pub async fn submit(&self, mut prompt: Prompt) -> Result<TurnReport> {
        if prompt.is_empty() {
            return Err(FiestaError::EmptyPrompt);
        }
        prompt.web_search |= self.web_search();
        let jobs = self.resolve_jobs().await?;

        let turn_id = Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let prompt = Arc::new(prompt);

        let launched = {
            let mut active = self.active.lock().await;
            if let Some(previous) = active.take() {
                if !previous.is_settled() {
                    match self.overlap {
                        OverlapPolicy::Reject => {
                            tracing::info!(
                                "[Orchestrator] Rejecting submission, turn {} still running",
                                previous.id
                            );
                            *active = Some(previous);
                            return Err(FiestaError::TurnInProgress);
                        }
                        OverlapPolicy::CancelPrevious => {
                            tracing::info!(
                                "[Orchestrator] Turn {} supersedes turn {}",
                                turn_id,
                                previous.id
                            );
                            previous.token.cancel();
                            previous.tracker.wait().await;
                        }
                    }
                }
            }

            let (jobs, placeholders) = self.open_turn(&prompt, jobs).await?;
            *active = Some(ActiveTurn {
                id: turn_id.clone(),
                token: token.clone(),
                tracker: tracker.clone(),
            });
            self.busy.send_replace(true);
            self.state.send_replace(TurnState::Dispatching);

            tracing::info!(
                "[Orchestrator] Turn {} dispatched to {} panes",
                turn_id,
                jobs.len()
            );
            let launched: Vec<_> = jobs
                .into_iter()
                .zip(placeholders)
                .map(|(job, placeholder)| {
                    let task = PaneTask {
                        pane_id: job.model.id.clone(),
                        adapter: job.adapter,
                        credential: job.credential,
                        prompt: prompt.clone(),
                        placeholder: placeholder.clone(),
                        store: self.store.clone(),
                        code_slot: self.code_slot.clone(),
                        pacer: self.pacer.clone(),
                    };
                    let handle = tracker.spawn(task.run(token.clone()));
                    (job.model.id, job.model.kind, placeholder, handle)
                })
                .collect();
            tracker.close();
            self.state.send_replace(TurnState::AwaitingAll);
            launched
        };

        let (meta, handles): (Vec<_>, Vec<_>) = launched
            .into_iter()
            .map(|(pane_id, kind, placeholder, handle)| ((pane_id, kind, placeholder), handle))
            .unzip();
        let results = join_all(handles).await;

        let mut outcomes = Vec::with_capacity(meta.len());
        for ((pane_id, kind, placeholder), result) in meta.into_iter().zip(results) {
            let status = match result {
                Ok(status) => status,
                Err(_) if token.is_cancelled() => PaneStatus::Cancelled,
                Err(join_error) => {
                    tracing::error!(
                        "[Orchestrator] Pane '{}' task aborted: {}",
                        pane_id,
                        join_error
                    );
                    let err = FiestaError::internal(format!("pane task failed: {join_error}"));
                    write_failure(&self.store, &self.code_slot, placeholder.as_ref(), &err).await;
                    PaneStatus::Failed(err.to_string())
                }
            };
            outcomes.push(PaneOutcome {
                pane_id,
                kind,
                status,
            });
        }

        {
            let mut active = self.active.lock().await;
            if active.as_ref().is_some_and(|turn| turn.id == turn_id) {
                *active = None;
                self.state.send_replace(TurnState::Settled);
                self.busy.send_replace(false);
            }
        }

        let report = TurnReport { turn_id, outcomes };
        tracing::info!(
            "[Orchestrator] Turn {} settled ({} failed{})",
            report.turn_id,
            report.failures().count(),
            if report.was_cancelled() { ", cancelled" } else { "" }
        );
        Ok(report)
    }

    /// Looks up model, adapter and credential for every active pane.
    ///
    /// All providers lacking a credential are reported together.
    /// Appends the user message and one placeholder per job.
    ///
    /// Jobs for panes closed since they were resolved are dropped. The pane
    /// set stays read-locked until every placeholder is in the log, so a
    /// concurrent `remove_pane` prunes either nothing or everything.
    async fn open_turn(
        &self,
        prompt: &Prompt,
        mut jobs: Vec<PaneJob>,
    ) -> Result<(Vec<PaneJob>, Vec<Option<MessageId>>)> {
        let panes = self.panes.read().await;
        jobs.retain(|job| panes.contains(&job.model.id));
        if jobs.is_empty() {
            return Err(FiestaError::NoActivePanes);
        }

        self.store.append(Message::user(prompt)).await;
        let mut placeholders = Vec::with_capacity(jobs.len());
        for job in &jobs {
            let placeholder = if job.model.writes_to_log() {
                let id = MessageId::generate(&job.model.id);
                self.store
                    .append(Message::placeholder(id.clone(), &job.model.id))
                    .await;
                Some(id)
            } else {
                None
            };
            placeholders.push(placeholder);
        }
        Ok((jobs, placeholders))
    }

    async fn resolve_jobs(&self) -> Result<Vec<PaneJob>> {
        let pane_ids = self.panes().await;
        if pane_ids.is_empty() {
            return Err(FiestaError::NoActivePanes);
        }

        let mut jobs = Vec::with_capacity(pane_ids.len());
        let mut missing: Vec<Provider> = Vec::new();
        for pane_id in pane_ids {
            let model = self
                .catalog
                .get(&pane_id)
                .cloned()
                .ok_or_else(|| FiestaError::not_found("model", &pane_id))?;
            let adapter = self
                .registry
                .get(&pane_id)
                .ok_or_else(|| FiestaError::not_found("adapter", &pane_id))?;

            match self
                .credentials
                .credential(model.provider)
                .filter(|key| !key.trim().is_empty())
            {
                Some(credential) => jobs.push(PaneJob {
                    model,
                    adapter,
                    credential,
                }),
                None if !missing.contains(&model.provider) => missing.push(model.provider),
                None => {}
            }
        }

        if !missing.is_empty() {
            missing.sort();
            let err = FiestaError::MissingCredential { providers: missing };
            tracing::warn!("[Orchestrator] Turn not dispatched: {}", err);
            return Err(err);
        }
        Ok(jobs)
    }
}

/// One pane's share of a turn.
struct PaneTask {
    pane_id: String,
    adapter: Arc<dyn ProviderAdapter>,
    credential: String,
    prompt: Arc<Prompt>,
    placeholder: Option<MessageId>,
    store: Arc<ConversationStore>,
    code_slot: CodeSlot,
    pacer: Arc<dyn PresentationPacer>,
}

impl PaneTask {
    async fn run(self, token: CancellationToken) -> PaneStatus {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.execute() => Some(result),
        };

        match result {
            None => {
                tracing::debug!("[Orchestrator] Pane '{}' cancelled", self.pane_id);
                PaneStatus::Cancelled
            }
            Some(Ok(())) => {
                tracing::debug!("[Orchestrator] Pane '{}' done", self.pane_id);
                PaneStatus::Succeeded
            }
            Some(Err(err)) => {
                tracing::warn!(
                    "[Orchestrator] Pane '{}' ({}) failed: {}",
                    self.pane_id,
                    self.adapter.name(),
                    err
                );
                write_failure(
                    &self.store,
                    &self.code_slot,
                    self.placeholder.as_ref(),
                    &err,
                )
                .await;
                PaneStatus::Failed(err.to_string())
            }
        }
    }

    async fn execute(&self) -> Result<()> {
        let generation = self
            .adapter
            .generate(&self.prompt, &self.credential)
            .await?;

        match generation {
            Generation::Text(text) => {
                let id = self.placeholder()?;
                let mut prefixes = self.pacer.pace(text.clone());
                let mut exact = false;
                while let Some(prefix) = prefixes.next().await {
                    exact = prefix == text;
                    self.store.patch(id, MessagePatch::text(prefix)).await;
                }
                // Word pacing leaves a trailing space on the last prefix.
                if !exact {
                    self.store.patch(id, MessagePatch::text(text)).await;
                }
            }
            Generation::Image(image) => {
                let id = self.placeholder()?;
                self.store
                    .patch(id, MessagePatch::text(IMAGE_READY_TEXT).with_image(image))
                    .await;
            }
            Generation::Code(code) => self.code_slot.set(code),
        }
        Ok(())
    }

    fn placeholder(&self) -> Result<&MessageId> {
        self.placeholder.as_ref().ok_or_else(|| {
            FiestaError::internal(format!("pane '{}' has no placeholder", self.pane_id))
        })
    }
}

/// Makes a pane failure visible: in the placeholder for log panes, in the
/// code slot otherwise.
async fn write_failure(
    store: &ConversationStore,
    code_slot: &CodeSlot,
    placeholder: Option<&MessageId>,
    err: &FiestaError,
) {
    match placeholder {
        Some(id) => {
            store.patch(id, MessagePatch::error(err)).await;
        }
        None => code_slot.set(format!("Error: {err}")),
    }
}
