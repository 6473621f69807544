//! The single owner of engine state.
//!
//! `EngineState` is mutated only from the host's event loop. Blocking work is
//! handed to the host through [`EngineHost::start_turn`]; its results come
//! back as [`TurnEvent`]s and are applied only while they still belong to the
//! pending request of the active session.

use chat_provider::{ChatProvider, ModelInfo, RequestId, Throughput};
use session_store::KeyValueStore;
use tracing::{debug, error, info, warn};

use crate::augment::{outbound_turns, AugmentationConfig, MarkerPolicy};
use crate::error::EngineError;
use crate::keys::SessionId;
use crate::pipeline::{TurnEvent, TurnJob};
use crate::preferences::{Preferences, Theme};
use crate::registry::{Clock, Confirmed, SessionRegistry, SessionSummary};
use crate::reveal::{Generation, RevealStep, Revealer, DEFAULT_CHUNK_CHARS};
use crate::turn::Turn;

const NO_MODELS_NOTICE: &str = "No models found. Is the model server running?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub augmentation: AugmentationConfig,
    pub reveal_chunk_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            augmentation: AugmentationConfig::default(),
            reveal_chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing notification raised while applying events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Side effects the engine asks of its host.
pub trait EngineHost {
    /// Runs `job` off the event loop and feeds its events back in order.
    fn start_turn(&mut self, job: TurnJob);
    /// Delivers `generation` to [`EngineState::on_reveal_step`] after the reveal tick.
    fn schedule_reveal_step(&mut self, generation: Generation);
    fn notify(&mut self, notice: Notice);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingReply,
    Revealing { generation: Generation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRequest {
    request_id: RequestId,
    session_id: SessionId,
    phase: Phase,
}

pub struct EngineState {
    store: Box<dyn KeyValueStore>,
    registry: SessionRegistry,
    preferences: Preferences,
    config: EngineConfig,
    revealer: Revealer,
    pending: Option<PendingRequest>,
    next_request_id: RequestId,
    models: Vec<ModelInfo>,
    throughput: Option<Throughput>,
}

impl EngineState {
    /// Loads preferences and sessions; the most recent session becomes active.
    pub fn new(
        store: Box<dyn KeyValueStore>,
        clock: Box<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let preferences = Preferences::load(store.as_ref());
        let registry = SessionRegistry::open(store.as_ref(), clock)?;

        Ok(Self {
            store,
            registry,
            preferences,
            config,
            revealer: Revealer::new(config.reveal_chunk_chars),
            pending: None,
            next_request_id: 1,
            models: Vec::new(),
            throughput: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Releases the store, e.g. to reopen the engine over the same data.
    #[must_use]
    pub fn into_store(self) -> Box<dyn KeyValueStore> {
        self.store
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    #[must_use]
    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.registry.list_sessions()
    }

    #[must_use]
    pub fn active_session_id(&self) -> SessionId {
        self.registry.active_id()
    }

    #[must_use]
    pub fn active_turns(&self) -> &[Turn] {
        self.registry.active_turns()
    }

    /// Committed turns of any session, for export.
    #[must_use]
    pub fn transcript(&self, id: SessionId) -> Vec<Turn> {
        self.registry.transcript(self.store.as_ref(), id)
    }

    #[must_use]
    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Throughput of the last reply, cleared on submit and session changes.
    #[must_use]
    pub fn throughput(&self) -> Option<Throughput> {
        self.throughput
    }

    /// Reply text disclosed so far, while a reveal is running.
    #[must_use]
    pub fn revealing_text(&self) -> Option<&str> {
        self.revealer.visible_text()
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn pending_request_id(&self) -> Option<RequestId> {
        self.pending.map(|pending| pending.request_id)
    }

    #[must_use]
    pub fn search_enabled(&self) -> bool {
        self.config.augmentation.enabled
    }

    pub fn set_search_enabled(&mut self, enabled: bool) {
        self.config.augmentation.enabled = enabled;
    }

    #[must_use]
    pub fn marker_policy(&self) -> MarkerPolicy {
        self.config.augmentation.marker_policy
    }

    /// Fetches the model list and picks the effective model.
    ///
    /// An empty list or a listing failure clears the selection and raises a notice.
    pub fn refresh_models(&mut self, chat: &dyn ChatProvider, host: &mut dyn EngineHost) -> Option<&str> {
        match chat.list_models() {
            Ok(models) if !models.is_empty() => {
                self.preferences.select_from_listing(self.store.as_ref(), &models);
                debug!(models = models.len(), selected = ?self.preferences.selected_model(), "models listed");
                self.models = models;
            }
            Ok(_) => {
                warn!("model server offered no models");
                self.models.clear();
                self.preferences.clear_selection();
                host.notify(Notice::warning(NO_MODELS_NOTICE));
            }
            Err(failure) => {
                warn!(error = %failure, "model listing failed");
                self.models.clear();
                self.preferences.clear_selection();
                host.notify(Notice::warning(format!("{NO_MODELS_NOTICE} ({failure})")));
            }
        }
        self.preferences.selected_model()
    }

    /// Selects and persists `model`, which must appear in the latest listing.
    pub fn set_selected_model(&mut self, model: &str) -> Result<(), EngineError> {
        let model = model.trim();
        if !self.models.iter().any(|offered| offered.model == model) {
            return Err(EngineError::UnknownModel(model.to_string()));
        }
        self.preferences.set_selected_model(self.store.as_mut(), model)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), EngineError> {
        self.preferences.set_theme(self.store.as_mut(), theme)
    }

    pub fn set_username(&mut self, name: &str) -> Result<(), EngineError> {
        self.preferences.set_username(self.store.as_mut(), name)
    }

    pub fn set_user_avatar(&mut self, data_url: Option<String>) -> Result<(), EngineError> {
        self.preferences.set_user_avatar(self.store.as_mut(), data_url)
    }

    pub fn set_bot_avatar(&mut self, data_url: Option<String>) -> Result<(), EngineError> {
        self.preferences.set_bot_avatar(self.store.as_mut(), data_url)
    }

    pub fn set_show_username(&mut self, show: bool) -> Result<(), EngineError> {
        self.preferences.set_show_username(self.store.as_mut(), show)
    }

    pub fn set_show_avatars(&mut self, show: bool) -> Result<(), EngineError> {
        self.preferences.set_show_avatars(self.store.as_mut(), show)
    }

    pub fn set_sidebar_open(&mut self, open: bool) -> Result<(), EngineError> {
        self.preferences.set_sidebar_open(self.store.as_mut(), open)
    }

    /// Records the user's prompt in the active session and starts a request.
    ///
    /// Validation failures are returned before any state changes.
    pub fn submit(&mut self, prompt: &str, host: &mut dyn EngineHost) -> Result<RequestId, EngineError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EngineError::EmptyPrompt);
        }
        let Some(model) = self.preferences.selected_model().map(str::to_string) else {
            return Err(EngineError::NoModelSelected);
        };
        if self.pending.is_some() {
            return Err(EngineError::RequestPending);
        }

        let session_id = self.registry.active_id();
        self.registry
            .append_turn(self.store.as_mut(), session_id, Turn::user(prompt))?;
        self.throughput = None;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending = Some(PendingRequest {
            request_id,
            session_id,
            phase: Phase::AwaitingReply,
        });

        let augmentation = self.config.augmentation;
        let job = TurnJob {
            request_id,
            session_id,
            model,
            turns: outbound_turns(self.registry.active_turns(), augmentation.marker_policy),
            latest_user_text: prompt.to_string(),
            augmentation,
        };
        info!(request_id, session = %session_id, model = %job.model, "submitting prompt");
        host.start_turn(job);
        Ok(request_id)
    }

    /// Applies a worker result, discarding it when it no longer applies.
    pub fn on_turn_event(&mut self, event: TurnEvent, host: &mut dyn EngineHost) {
        let request_id = event.request_id();
        let Some(pending) = self.awaiting(request_id) else {
            debug!(request_id, "discarding stale turn event");
            return;
        };

        match event {
            TurnEvent::Augmented { marker, .. } => {
                self.append_or_notify(pending.session_id, marker, host);
            }
            TurnEvent::AugmentationFailed { message, .. } => {
                warn!(request_id, error = %message, "augmentation degraded to plain request");
                host.notify(Notice::warning(format!(
                    "Web search failed ({message}); sent without search results."
                )));
            }
            TurnEvent::Completed { completion, .. } => {
                self.throughput = completion.throughput;
                let generation = self.revealer.reveal(completion.reply_text);
                self.pending = Some(PendingRequest {
                    phase: Phase::Revealing { generation },
                    ..pending
                });
                host.schedule_reveal_step(generation);
            }
            TurnEvent::Failed { failure, .. } => {
                self.pending = None;
                warn!(request_id, error = %failure, "completion failed");
                let hint = if failure.retryable {
                    "The server looks busy or unreachable; try again shortly."
                } else {
                    "Resubmit or pick a different model."
                };
                host.notify(Notice::error(format!("Request failed: {failure}. {hint}")));
            }
        }
    }

    /// Delivers a scheduled reveal step. Completion commits the assistant turn.
    pub fn on_reveal_step(&mut self, generation: Generation, host: &mut dyn EngineHost) -> RevealStep {
        let step = self.revealer.step(generation);
        match &step {
            RevealStep::Stale => debug!(generation, "ignoring stale reveal step"),
            RevealStep::Partial(_) => host.schedule_reveal_step(generation),
            RevealStep::Complete(text) => {
                match self.pending {
                    Some(pending) if pending.phase == (Phase::Revealing { generation }) => {
                        self.pending = None;
                        self.append_or_notify(pending.session_id, Turn::assistant(text.clone()), host);
                    }
                    _ => debug!(generation, "reveal finished without a pending request"),
                }
            }
        }
        step
    }

    /// Starts a fresh, persisted session and makes it active.
    pub fn new_chat(&mut self) -> Result<SessionId, EngineError> {
        self.abandon_pending("new chat");
        self.throughput = None;
        self.registry.create_session(self.store.as_mut())
    }

    /// Activates `id`. Unknown or unreadable sessions load as empty.
    ///
    /// Reloading the active session is a no-op so a pending reply still lands.
    pub fn load_session(&mut self, id: SessionId) {
        if id == self.registry.active_id() {
            debug!(session = %id, "session already active");
            return;
        }
        self.abandon_pending("session switch");
        self.throughput = None;
        self.registry.load_session(self.store.as_ref(), id);
    }

    pub fn delete_session(&mut self, id: SessionId, confirmed: Confirmed) -> Result<(), EngineError> {
        if id == self.registry.active_id() {
            self.abandon_pending("active session deleted");
            self.throughput = None;
        }
        self.registry.delete_session(self.store.as_mut(), id, confirmed)
    }

    /// Deletes every session; preference entries are kept.
    pub fn delete_all(&mut self, confirmed: Confirmed) -> Result<usize, EngineError> {
        self.abandon_pending("all sessions deleted");
        self.throughput = None;
        self.registry.delete_all(self.store.as_mut(), confirmed)
    }

    fn awaiting(&self, request_id: RequestId) -> Option<PendingRequest> {
        self.pending.filter(|pending| {
            pending.request_id == request_id
                && pending.phase == Phase::AwaitingReply
                && pending.session_id == self.registry.active_id()
        })
    }

    fn abandon_pending(&mut self, reason: &str) {
        if let Some(pending) = self.pending.take() {
            debug!(request_id = pending.request_id, reason, "abandoning pending request");
        }
        self.revealer.cancel();
    }

    fn append_or_notify(&mut self, session_id: SessionId, turn: Turn, host: &mut dyn EngineHost) {
        if let Err(append_error) = self.registry.append_turn(self.store.as_mut(), session_id, turn) {
            error!(session = %session_id, error = %append_error, "failed to save turn");
            host.notify(Notice::error(format!("Could not save the conversation: {append_error}")));
        }
    }
}
