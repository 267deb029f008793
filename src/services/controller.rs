//! Query Session Controller
//!
//! Owns the state of one interactive session: the current query, its
//! streaming channel, the accumulated reasoning trace, the final result or
//! error, and the cached history list.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle -> Submitting -> Streaming -> Completed | Failed
//!   ^                                    |
//!   +------------- new_session ----------+
//! Viewing (history record loaded, no channel)
//! ```
//!
//! All transitions happen through `&mut self`, either on a user action or
//! when the event pump delivers a channel event. Events carry the generation
//! of the channel that produced them; anything not from the current
//! generation is ignored.

use std::sync::Arc;

use meka_core::{
    AskRequest, HistoryRecord, PipelineSnapshot, PipelineStateTracker, QueryResult, SessionEvent,
    TraceEvent,
};
use tokio::sync::mpsc;

use crate::models::session::{QueryOptions, SessionId, SessionPhase, ViewState};
use crate::models::settings::AppConfig;
use crate::services::history::{ApiClient, AskBackend, HistoryStore};
use crate::services::session_channel::{
    ChannelEvent, ChannelHandle, SessionChannel, WebSocketConnector,
};
use crate::utils::error::{AppError, AppResult};

/// Capacity of the channel event queue
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Interactive query session state machine.
pub struct QuerySessionController {
    channel: SessionChannel,
    history_store: Arc<dyn HistoryStore>,
    ask_backend: Option<Arc<dyn AskBackend>>,

    session_id: SessionId,
    phase: SessionPhase,
    generation: u64,
    active: Option<ChannelHandle>,
    events_tx: mpsc::Sender<ChannelEvent>,
    events_rx: mpsc::Receiver<ChannelEvent>,

    tracker: PipelineStateTracker,
    active_query: Option<String>,
    preview_answer: Option<String>,
    result: Option<QueryResult>,
    error: Option<String>,
    history: Vec<HistoryRecord>,
    web_search: bool,
}

impl QuerySessionController {
    pub fn new(channel: SessionChannel, history_store: Arc<dyn HistoryStore>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Self {
            channel,
            history_store,
            ask_backend: None,
            session_id: SessionId::generate(),
            phase: SessionPhase::Idle,
            generation: 0,
            active: None,
            events_tx,
            events_rx,
            tracker: PipelineStateTracker::new(),
            active_query: None,
            preview_answer: None,
            result: None,
            error: None,
            history: Vec::new(),
            web_search: false,
        }
    }

    /// Controller wired to the WebSocket and HTTP endpoints in `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let api = Arc::new(ApiClient::from_app_config(config)?);
        let channel = SessionChannel::new(Arc::new(WebSocketConnector), config.clone());
        Ok(Self::new(channel, api.clone())
            .with_ask_backend(api)
            .with_web_search(config.web_search_default))
    }

    pub fn with_ask_backend(mut self, backend: Arc<dyn AskBackend>) -> Self {
        self.ask_backend = Some(backend);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn web_search(&self) -> bool {
        self.web_search
    }

    pub fn set_web_search(&mut self, enabled: bool) {
        self.web_search = enabled;
    }

    /// Stage views derived from the trace seen so far.
    ///
    /// Outside of loading no stage is `Active`; stages that never reported
    /// stay `Pending`.
    pub fn stages(&self) -> PipelineSnapshot {
        self.tracker.snapshot(self.phase.is_loading())
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            phase: self.phase,
            session_id: self.session_id.clone(),
            active_query: self.active_query.clone(),
            loading: self.phase.is_loading(),
            preview_answer: self.preview_answer.clone(),
            reasoning_trace: self.tracker.raw_trace(),
            stages: self.stages(),
            result: self.result.clone(),
            error: self.error.clone(),
            history: self.history.clone(),
            web_search: self.web_search,
        }
    }

    // ========================================================================
    // Query lifecycle
    // ========================================================================

    /// Start a streaming query. Any open channel is closed first.
    pub fn submit(&mut self, query: &str) -> AppResult<()> {
        let query = Self::validate_query(query)?;
        self.begin(query);

        let options = QueryOptions {
            web_search: self.web_search,
        };
        match self.channel.open(
            self.generation,
            &self.session_id,
            query,
            options,
            self.events_tx.clone(),
        ) {
            Ok(handle) => {
                tracing::info!(
                    "[Controller] Submitted query on session {} (generation {})",
                    self.session_id,
                    self.generation
                );
                self.active = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Controller] Could not open channel: {}", e);
                self.phase = SessionPhase::Failed;
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Run a query through the non-streaming `POST /ask` endpoint.
    pub async fn submit_blocking(&mut self, query: &str) -> AppResult<()> {
        let backend = self
            .ask_backend
            .clone()
            .ok_or_else(|| AppError::config("No /ask backend configured"))?;
        let query = Self::validate_query(query)?;
        self.begin(query);

        let request = AskRequest {
            question: query.to_string(),
            web_search: self.web_search,
            thread_id: self.session_id.to_string(),
        };
        match backend.ask(request).await {
            Ok(result) => {
                self.tracker = PipelineStateTracker::from_events(
                    result.reasoning_trace.iter().map(TraceEvent::new),
                );
                self.result = Some(result);
                self.phase = SessionPhase::Completed;
                tracing::info!("[Controller] Blocking query completed");
                self.refresh_history().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Controller] Blocking query failed: {}", e);
                self.error = Some(e.user_message());
                self.phase = SessionPhase::Failed;
                Err(e)
            }
        }
    }

    /// Drop all query state, start a fresh session id and close any channel.
    pub fn new_session(&mut self) {
        self.close_active();
        self.generation += 1;
        self.session_id = SessionId::generate();
        self.clear_query_state();
        self.active_query = None;
        self.phase = SessionPhase::Idle;
        tracing::debug!("[Controller] New session {}", self.session_id);
    }

    /// Wait for the next event of the current channel and apply it.
    ///
    /// Returns `None` once no query is in flight. Stale events are consumed
    /// and skipped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        while self.phase.is_loading() {
            let delivered = self.events_rx.recv().await?;
            let event = delivered.event.clone();
            if self.handle_event(delivered).await {
                return Some(event);
            }
        }
        None
    }

    /// Pump events until the current query completes or fails.
    pub async fn run_to_completion(&mut self) -> SessionPhase {
        while self.next_event().await.is_some() {}
        self.phase
    }

    /// Apply one channel event. Returns whether it changed state.
    pub async fn handle_event(&mut self, delivered: ChannelEvent) -> bool {
        if delivered.generation != self.generation || !self.phase.is_loading() {
            tracing::warn!(
                "[Controller] Ignoring stale {} event (generation {}, current {}, phase {})",
                delivered.event.kind(),
                delivered.generation,
                self.generation,
                self.phase
            );
            return false;
        }

        match delivered.event {
            SessionEvent::Trace { trace } => {
                tracing::debug!("[Controller] Trace: {}", trace.raw_text);
                self.tracker.push(trace);
                self.phase = SessionPhase::Streaming;
            }
            SessionEvent::Answer { text } => {
                self.preview_answer = Some(text);
                self.phase = SessionPhase::Streaming;
            }
            SessionEvent::Done { result } => {
                tracing::info!("[Controller] Query completed on session {}", self.session_id);
                self.result = result;
                self.phase = SessionPhase::Completed;
                self.close_active();
                self.refresh_history().await;
            }
            SessionEvent::Error { message } => {
                tracing::warn!("[Controller] Query failed: {}", message);
                self.error = Some(message);
                self.phase = SessionPhase::Failed;
                self.close_active();
            }
        }
        true
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Replace the cached history list with a fresh fetch.
    pub async fn refresh_history(&mut self) -> &[HistoryRecord] {
        self.history = self.history_store.list().await;
        tracing::debug!("[Controller] History refreshed: {} records", self.history.len());
        &self.history
    }

    /// Display a cached history record without opening a channel.
    pub fn select_history(&mut self, query_id: &str) -> AppResult<()> {
        let record = self
            .history
            .iter()
            .find(|r| r.query_id == query_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("history record {}", query_id)))?;

        self.close_active();
        self.generation += 1;
        self.clear_query_state();
        self.tracker = PipelineStateTracker::from_events(
            record.trace_lines().iter().map(TraceEvent::new),
        );
        self.active_query = Some(record.query_text);
        self.result = Some(record.result);
        self.phase = SessionPhase::Viewing;
        tracing::debug!("[Controller] Viewing history record {}", query_id);
        Ok(())
    }

    /// Delete a record on the backend, then drop it from the cache.
    ///
    /// On failure the cached list is left as it was.
    pub async fn delete_history(&mut self, query_id: &str) -> AppResult<()> {
        self.history_store.remove(query_id).await?;
        self.history.retain(|r| r.query_id != query_id);
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn validate_query(query: &str) -> AppResult<&str> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Query must not be empty"));
        }
        Ok(trimmed)
    }

    fn begin(&mut self, query: &str) {
        self.close_active();
        self.generation += 1;
        self.clear_query_state();
        self.active_query = Some(query.to_string());
        self.phase = SessionPhase::Submitting;
    }

    fn clear_query_state(&mut self) {
        self.tracker.clear();
        self.preview_answer = None;
        self.result = None;
        self.error = None;
    }

    fn close_active(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.close();
        }
    }
}
