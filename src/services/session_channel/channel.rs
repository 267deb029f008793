//! Session Channel
//!
//! One streaming connection per query. The channel runs on its own task,
//! turns frames into `SessionEvent`s and forwards them, tagged with a
//! generation number, to the listener queue. It never touches controller
//! state.
//!
//! Guarantees:
//! - events arrive in frame order
//! - at most one terminal event (`done` or `error`), after which the task ends
//! - connection failures, idle timeouts and a close before any terminal frame
//!   all surface as a synthetic `error`
//! - after `close()` the task stops at its next await point; an event already
//!   being sent may still land, so listeners drop events whose generation is
//!   no longer current

use std::sync::Arc;
use std::time::Duration;

use meka_core::{FrameAdapter, JsonFrameAdapter, QueryRequest, SessionEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::transport::{FrameConnection, StreamConnector};
use crate::models::session::{QueryOptions, SessionId};
use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Timeouts applied by every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&AppConfig> for ChannelConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        }
    }
}

/// An event delivered to the listener, tagged with the channel generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub generation: u64,
    pub event: SessionEvent,
}

/// Owner handle for an open channel. Dropping it closes the channel.
#[derive(Debug)]
pub struct ChannelHandle {
    generation: u64,
    session_id: SessionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Close the channel and stop its task. One in-flight event may still be
    /// delivered with this handle's generation.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!(
                "[SessionChannel] Closing channel {} (generation {})",
                self.session_id,
                self.generation
            );
            self.cancel.cancel();
        }
    }

    /// Whether the channel was closed or its task has finished.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.task.is_finished()
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Factory for streaming sessions against one backend endpoint.
#[derive(Clone)]
pub struct SessionChannel {
    connector: Arc<dyn StreamConnector>,
    adapter: Arc<dyn FrameAdapter>,
    endpoint: AppConfig,
    config: ChannelConfig,
}

impl SessionChannel {
    pub fn new(connector: Arc<dyn StreamConnector>, endpoint: AppConfig) -> Self {
        let config = ChannelConfig::from(&endpoint);
        Self {
            connector,
            adapter: Arc::new(JsonFrameAdapter),
            endpoint,
            config,
        }
    }

    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Open a channel for `session_id` and send the query once connected.
    ///
    /// Returns immediately; connection progress and failures are reported
    /// through `listener`. Only an unusable endpoint fails synchronously.
    pub fn open(
        &self,
        generation: u64,
        session_id: &SessionId,
        query_text: &str,
        options: QueryOptions,
        listener: mpsc::Sender<ChannelEvent>,
    ) -> AppResult<ChannelHandle> {
        let url = self.endpoint.stream_url(session_id.as_str())?;
        let cancel = CancellationToken::new();

        let task = ChannelTask {
            url,
            request: QueryRequest {
                query: query_text.to_string(),
                web_search: options.web_search,
            },
            connector: self.connector.clone(),
            adapter: self.adapter.clone(),
            config: self.config,
            emitter: Emitter {
                generation,
                listener,
                cancel: cancel.clone(),
                terminated: false,
            },
        };

        tracing::info!(
            "[SessionChannel] Opening {} channel {} (generation {}, adapter {})",
            self.connector.name(),
            session_id,
            generation,
            self.adapter.protocol_name()
        );

        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = task_cancel.cancelled() => {
                    tracing::debug!("[SessionChannel] Generation {} cancelled", generation);
                }
                _ = task.run() => {}
            }
        });

        Ok(ChannelHandle {
            generation,
            session_id: session_id.clone(),
            cancel,
            task: join,
        })
    }
}

// ============================================================================
// Channel task
// ============================================================================

struct Emitter {
    generation: u64,
    listener: mpsc::Sender<ChannelEvent>,
    cancel: CancellationToken,
    terminated: bool,
}

impl Emitter {
    /// Deliver one event. Returns `false` when the channel must stop.
    async fn emit(&mut self, event: SessionEvent) -> bool {
        if self.terminated || self.cancel.is_cancelled() {
            return false;
        }
        let terminal = event.is_terminal();
        tracing::debug!(
            "[SessionChannel] Generation {} -> {}",
            self.generation,
            event.kind()
        );
        let delivered = self
            .listener
            .send(ChannelEvent {
                generation: self.generation,
                event,
            })
            .await
            .is_ok();
        if !delivered {
            tracing::warn!("[SessionChannel] Listener dropped; closing channel");
            self.cancel.cancel();
        }
        self.terminated = terminal;
        delivered && !terminal
    }

    /// Report a transport failure as the single terminal event.
    async fn fail(&mut self, err: AppError) {
        tracing::warn!("[SessionChannel] Generation {} failed: {}", self.generation, err);
        self.emit(SessionEvent::error(err.user_message())).await;
    }
}

struct ChannelTask {
    url: Url,
    request: QueryRequest,
    connector: Arc<dyn StreamConnector>,
    adapter: Arc<dyn FrameAdapter>,
    config: ChannelConfig,
    emitter: Emitter,
}

impl ChannelTask {
    async fn run(mut self) {
        let mut conn = match self.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                self.emitter.fail(e).await;
                return;
            }
        };

        self.pump(conn.as_mut()).await;
        conn.close().await;
        tracing::info!(
            "[SessionChannel] Generation {} closed",
            self.emitter.generation
        );
    }

    async fn connect(&self) -> AppResult<Box<dyn FrameConnection>> {
        let connect = self.connector.connect(&self.url);
        let mut conn = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(result) => result?,
            Err(_) => return Err(AppError::Timeout(self.config.connect_timeout.as_secs())),
        };

        let payload = serde_json::to_string(&self.request)?;
        if let Err(e) = conn.send_text(payload).await {
            conn.close().await;
            return Err(e);
        }
        tracing::info!("[SessionChannel] Connected to {}", self.url);
        Ok(conn)
    }

    async fn pump(&mut self, conn: &mut dyn FrameConnection) {
        loop {
            let frame = match tokio::time::timeout(self.config.idle_timeout, conn.next_frame()).await
            {
                Err(_) => {
                    let secs = self.config.idle_timeout.as_secs();
                    self.emitter.fail(AppError::Timeout(secs)).await;
                    return;
                }
                Ok(None) => {
                    self.emitter
                        .fail(AppError::connection("stream closed before completion"))
                        .await;
                    return;
                }
                Ok(Some(Err(e))) => {
                    self.emitter.fail(e).await;
                    return;
                }
                Ok(Some(Ok(text))) => text,
            };

            match self.adapter.adapt(&frame) {
                Ok(Some(event)) => {
                    if !self.emitter.emit(event).await {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[SessionChannel] Dropping malformed frame: {}", e);
                }
            }
        }
    }
}
