//! Streaming Transport
//!
//! Trait seam between the session channel and the socket it reads from, plus
//! the WebSocket implementation used in production.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::utils::error::AppResult;

/// One open bidirectional text connection.
#[async_trait]
pub trait FrameConnection: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> AppResult<()>;

    /// Next inbound text frame. `None` once the peer has closed the stream.
    async fn next_frame(&mut self) -> Option<AppResult<String>>;

    /// Close the connection, ignoring errors.
    async fn close(&mut self);
}

/// Opens connections for a session channel.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Transport name for logging
    fn name(&self) -> &'static str;

    async fn connect(&self, url: &Url) -> AppResult<Box<dyn FrameConnection>>;
}

// ============================================================================
// WebSocket
// ============================================================================

/// `ws://` / `wss://` connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl StreamConnector for WebSocketConnector {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn connect(&self, url: &Url) -> AppResult<Box<dyn FrameConnection>> {
        let (ws, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(
            "[SessionChannel] WebSocket handshake with {} returned {}",
            url,
            response.status()
        );
        Ok(Box::new(WebSocketConnection { ws }))
    }
}

struct WebSocketConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameConnection for WebSocketConnection {
    async fn send_text(&mut self, text: String) -> AppResult<()> {
        self.ws.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<AppResult<String>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::warn!("[SessionChannel] Ignoring non-UTF-8 binary frame");
                    }
                },
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.ws.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!("[SessionChannel] Server closed connection: {:?}", frame);
                    return None;
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

// ============================================================================
// Scripted transport (tests)
// ============================================================================

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::utils::error::AppError;

    /// One step of a scripted server.
    #[derive(Debug, Clone)]
    pub enum Step {
        /// Deliver a text frame
        Frame(String),
        /// Sleep before the next step
        Delay(Duration),
        /// Fail the read with a transport error
        Fail(String),
        /// Never produce another frame
        Hang,
    }

    /// What the next `connect` call does.
    #[derive(Debug, Clone)]
    pub enum Outcome {
        Script(Vec<Step>),
        Refuse(String),
        /// Never complete the handshake
        Stall,
    }

    /// Connector that replays pre-recorded outcomes in order.
    #[derive(Default)]
    pub struct ScriptedConnector {
        outcomes: Mutex<VecDeque<Outcome>>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub urls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedConnector {
        pub fn new(outcomes: Vec<Outcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        pub fn frames<I, S>(frames: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::new(vec![Outcome::Script(
                frames.into_iter().map(|f| Step::Frame(f.into())).collect(),
            )])
        }

        pub fn sent_messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn connected_urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StreamConnector for ScriptedConnector {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn connect(&self, url: &Url) -> AppResult<Box<dyn FrameConnection>> {
            self.urls.lock().unwrap().push(url.to_string());
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Outcome::Refuse("no scripted outcome".to_string()));
            match outcome {
                Outcome::Script(steps) => Ok(Box::new(ScriptedConnection {
                    steps: steps.into(),
                    sent: self.sent.clone(),
                })),
                Outcome::Refuse(msg) => Err(AppError::connection(msg)),
                Outcome::Stall => std::future::pending().await,
            }
        }
    }

    struct ScriptedConnection {
        steps: VecDeque<Step>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl FrameConnection for ScriptedConnection {
        async fn send_text(&mut self, text: String) -> AppResult<()> {
            self.sent.lock().unwrap().push(text);
            Ok(())
        }

        async fn next_frame(&mut self) -> Option<AppResult<String>> {
            loop {
                match self.steps.pop_front()? {
                    Step::Frame(text) => return Some(Ok(text)),
                    Step::Delay(d) => tokio::time::sleep(d).await,
                    Step::Fail(msg) => return Some(Err(AppError::connection(msg))),
                    Step::Hang => std::future::pending::<()>().await,
                }
            }
        }

        async fn close(&mut self) {}
    }
}
