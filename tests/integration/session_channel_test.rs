//! Session Channel Integration Tests
//!
//! Runs the WebSocket session channel against a scripted loopback server:
//! - endpoint path and initiating message
//! - ordered delivery and single terminal event
//! - ping handling, server close and idle timeout

use std::sync::Arc;
use std::time::Duration;

use meka_client::services::session_channel::{ChannelConfig, ChannelEvent, SessionChannel};
use meka_client::services::WebSocketConnector;
use meka_client::utils::error::CONNECTION_FAILED_MESSAGE;
use meka_client::{AppConfig, QueryOptions, SessionId};
use meka_core::SessionEvent;
use tokio::sync::mpsc;

use super::support::{done, error, full_trace, trace, MockServer, Reply};

// ============================================================================
// Helpers
// ============================================================================

fn open_channel(
    config: AppConfig,
    channel_config: Option<ChannelConfig>,
    session: &str,
    web_search: bool,
) -> (
    meka_client::services::ChannelHandle,
    mpsc::Receiver<ChannelEvent>,
) {
    let mut channel = SessionChannel::new(Arc::new(WebSocketConnector), config);
    if let Some(c) = channel_config {
        channel = channel.with_config(c);
    }
    let (tx, rx) = mpsc::channel(64);
    let handle = channel
        .open(
            1,
            &SessionId::from(session),
            "What is X?",
            QueryOptions { web_search },
            tx,
        )
        .unwrap();
    (handle, rx)
}

async fn collect(mut rx: mpsc::Receiver<ChannelEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Some(ev) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("channel did not finish")
    {
        assert_eq!(ev.generation, 1);
        events.push(ev.event);
    }
    events
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_channel_streams_full_run() {
    let mut script = full_trace();
    script.push(done("X is ..."));
    let server = MockServer::start(vec![script]).await;

    let (_handle, rx) = open_channel(server.config(), None, "k3j9x2", true);
    let events = collect(rx).await;

    assert_eq!(events.len(), 6);
    assert!(events[..5]
        .iter()
        .all(|e| matches!(e, SessionEvent::Trace { .. })));
    match &events[5] {
        SessionEvent::Done { result: Some(result) } => {
            assert_eq!(result.final_answer, "X is ...");
            assert_eq!(result.validation_label.as_deref(), Some("GROUNDED"));
            assert_eq!(result.reranked_docs[0].metadata.source.as_deref(), Some("kb/x.md"));
        }
        other => panic!("Expected Done with result, got {:?}", other),
    }

    let recorded = server.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, "/ws/ask/k3j9x2");
    let query = recorded[0].query.as_ref().unwrap();
    assert_eq!(query["query"], "What is X?");
    assert_eq!(query["web_search"], true);
}

#[tokio::test]
async fn test_channel_stops_after_error() {
    let server = MockServer::start(vec![vec![
        error("timeout"),
        done("should never arrive"),
        trace("Planner: late"),
    ]])
    .await;

    let (_handle, rx) = open_channel(server.config(), None, "s1", false);
    let events = collect(rx).await;

    assert_eq!(events, vec![SessionEvent::error("timeout")]);
}

#[tokio::test]
async fn test_channel_answers_ping() {
    let server = MockServer::start(vec![vec![Reply::Ping, done("ok")]]).await;

    let (_handle, rx) = open_channel(server.config(), None, "s1", false);
    let events = collect(rx).await;

    assert!(matches!(events.last(), Some(SessionEvent::Done { .. })));
    assert!(server.recorded()[0].pong_received);
}

#[tokio::test]
async fn test_server_close_before_done_is_connection_error() {
    let server = MockServer::start(vec![vec![
        trace("Planner: decomposed"),
        Reply::Close,
    ]])
    .await;

    let (_handle, rx) = open_channel(server.config(), None, "s1", false);
    let events = collect(rx).await;

    assert_eq!(
        events,
        vec![
            SessionEvent::trace("Planner: decomposed"),
            SessionEvent::error(CONNECTION_FAILED_MESSAGE),
        ]
    );
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    // Bind and release a port so nothing is listening on it.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = AppConfig {
        server_port: port,
        ..Default::default()
    };
    let (_handle, rx) = open_channel(config, None, "s1", false);
    let events = collect(rx).await;

    assert_eq!(events, vec![SessionEvent::error(CONNECTION_FAILED_MESSAGE)]);
}

#[tokio::test]
async fn test_idle_stream_times_out() {
    let server = MockServer::start(vec![vec![
        trace("Planner: decomposed"),
        Reply::Hold(Duration::from_secs(5)),
        done("too late"),
    ]])
    .await;

    let channel_config = ChannelConfig {
        connect_timeout: Duration::from_secs(2),
        idle_timeout: Duration::from_millis(500),
    };
    let (_handle, rx) = open_channel(server.config(), Some(channel_config), "s1", false);
    let events = collect(rx).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[1], SessionEvent::error(CONNECTION_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_close_ends_channel() {
    let server = MockServer::start(vec![vec![
        trace("Planner: decomposed"),
        Reply::Hold(Duration::from_millis(300)),
        done("X is ..."),
    ]])
    .await;

    let (handle, mut rx) = open_channel(server.config(), None, "s1", false);
    let first = rx.recv().await.unwrap();
    assert_eq!(first.event, SessionEvent::trace("Planner: decomposed"));

    handle.close();
    assert!(handle.is_closed());

    // The queue closes once the task stops; `collect` checks every straggler
    // still carries generation 1.
    let rest = collect(rx).await;
    assert!(rest.len() <= 1);
}
