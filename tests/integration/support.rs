//! Shared helpers: a scripted WebSocket backend on a loopback port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use meka_client::AppConfig;

/// One scripted server action after the query message arrives.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send a JSON text frame
    Frame(String),
    /// Send a ping and wait for the client's pong
    Ping,
    /// Send a close frame
    Close,
    /// Do nothing for a while
    Hold(Duration),
}

/// What one connection saw.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub path: String,
    pub query: Option<serde_json::Value>,
    pub pong_received: bool,
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub connections: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Serve one script per incoming connection, in order.
    pub async fn start(scripts: Vec<Vec<Reply>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(Mutex::new(Vec::new()));
        let recorded = connections.clone();

        tokio::spawn(async move {
            for script in scripts {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let path = Arc::new(Mutex::new(String::new()));
                    let path_slot = path.clone();
                    let callback = move |req: &Request, resp: Response| {
                        *path_slot.lock().unwrap() = req.uri().path().to_string();
                        Ok::<Response, ErrorResponse>(resp)
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };

                    let index = {
                        let mut all = recorded.lock().unwrap();
                        all.push(Recorded {
                            path: path.lock().unwrap().clone(),
                            ..Default::default()
                        });
                        all.len() - 1
                    };

                    if let Some(Ok(Message::Text(text))) = ws.next().await {
                        recorded.lock().unwrap()[index].query = serde_json::from_str(&text).ok();
                    }

                    for reply in script {
                        match reply {
                            Reply::Frame(text) => {
                                if ws.send(Message::Text(text)).await.is_err() {
                                    return;
                                }
                            }
                            Reply::Ping => {
                                if ws.send(Message::Ping(vec![7])).await.is_err() {
                                    return;
                                }
                                while let Some(Ok(msg)) = ws.next().await {
                                    if let Message::Pong(_) = msg {
                                        recorded.lock().unwrap()[index].pong_received = true;
                                        break;
                                    }
                                }
                            }
                            Reply::Close => {
                                let _ = ws.close(None).await;
                                return;
                            }
                            Reply::Hold(d) => tokio::time::sleep(d).await,
                        }
                    }

                    // Drain until the client goes away.
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });

        Self { addr, connections }
    }

    pub fn config(&self) -> AppConfig {
        AppConfig {
            server_host: "127.0.0.1".to_string(),
            server_port: self.addr.port(),
            ..Default::default()
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.connections.lock().unwrap().clone()
    }
}

pub fn trace(text: &str) -> Reply {
    Reply::Frame(serde_json::json!({ "event": "trace", "trace": text }).to_string())
}

pub fn done(final_answer: &str) -> Reply {
    Reply::Frame(
        serde_json::json!({
            "event": "done",
            "full_result": {
                "final_answer": final_answer,
                "validation": "GROUNDED",
                "reranked_docs": [
                    { "page_content": "...", "metadata": { "source": "kb/x.md", "score": 0.8 } }
                ]
            }
        })
        .to_string(),
    )
}

pub fn error(message: &str) -> Reply {
    Reply::Frame(serde_json::json!({ "event": "error", "error": message }).to_string())
}

/// The five agent traces in pipeline order.
pub fn full_trace() -> Vec<Reply> {
    vec![
        trace("Planner: decomposed into 2 sub-queries"),
        trace("Retriever: fetched 12 documents"),
        trace("Reranker: kept top 5"),
        trace("Summarizer: drafted answer"),
        trace("Validator: GROUNDED"),
    ]
}
