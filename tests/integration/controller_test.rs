//! Controller Integration Tests
//!
//! Drives `QuerySessionController` end to end over a real WebSocket
//! connection, with an in-memory history store standing in for the backend's
//! `/history` endpoints.

use std::sync::Arc;
use std::time::Duration;

use meka_client::services::{MemoryHistoryStore, SessionChannel, WebSocketConnector};
use meka_client::{QuerySessionController, SessionPhase};
use meka_core::{HistoryRecord, PipelineStage, QueryResult, RecordTimestamp, StageStatus};

use super::support::{done, error, full_trace, trace, MockServer, Reply};

// ============================================================================
// Helpers
// ============================================================================

fn controller(server: &MockServer, store: Arc<MemoryHistoryStore>) -> QuerySessionController {
    let channel = SessionChannel::new(Arc::new(WebSocketConnector), server.config());
    QuerySessionController::new(channel, store)
}

fn history_record(id: &str, query: &str, timestamp: &str) -> HistoryRecord {
    HistoryRecord {
        query_id: id.to_string(),
        query_text: query.to_string(),
        timestamp: Some(RecordTimestamp::Text(timestamp.to_string())),
        status: Some("completed".to_string()),
        reasoning_trace: None,
        result: QueryResult {
            final_answer: format!("answer to {}", query),
            ..Default::default()
        },
    }
}

async fn run(ctrl: &mut QuerySessionController) -> SessionPhase {
    tokio::time::timeout(Duration::from_secs(10), ctrl.run_to_completion())
        .await
        .expect("query did not finish")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_successful_query_completes_all_stages() {
    let mut script = full_trace();
    script.push(done("X is ..."));
    let server = MockServer::start(vec![script]).await;

    // The backend persists the record before sending `done`.
    let store = Arc::new(MemoryHistoryStore::with_records(vec![history_record(
        "q-older",
        "Earlier question",
        "2024-05-01T09:00:00",
    )]));
    store.insert(history_record("q-new", "What is X?", "2024-05-02T09:00:00"));

    let mut ctrl = controller(&server, store.clone());
    ctrl.submit("What is X?").unwrap();
    assert_eq!(run(&mut ctrl).await, SessionPhase::Completed);

    let view = ctrl.view();
    assert!(view.stages.all_done());
    assert_eq!(view.display_answer(), Some("X is ..."));
    assert_eq!(view.reasoning_trace.len(), 5);
    assert_eq!(
        view.stages.detail(PipelineStage::Verification),
        Some("Validator: GROUNDED")
    );

    assert_eq!(store.fetch_count(), 1);
    assert_eq!(view.history.len(), 2);
    assert_eq!(view.history[0].query_text, "What is X?");

    let recorded = server.recorded();
    assert_eq!(recorded[0].path, format!("/ws/ask/{}", ctrl.session_id()));
    assert_eq!(recorded[0].query.as_ref().unwrap()["web_search"], false);
}

#[tokio::test]
async fn test_backend_error_fails_without_history_refresh() {
    let server = MockServer::start(vec![vec![error("timeout")]]).await;
    let store = Arc::new(MemoryHistoryStore::new());

    let mut ctrl = controller(&server, store.clone());
    ctrl.submit("What is X?").unwrap();
    assert_eq!(run(&mut ctrl).await, SessionPhase::Failed);

    let view = ctrl.view();
    assert_eq!(view.error.as_deref(), Some("timeout"));
    assert!(!view.loading);
    assert_eq!(store.fetch_count(), 0);
    assert!(PipelineStage::ALL
        .iter()
        .all(|s| view.stages.status(*s) == StageStatus::Pending));
}

#[tokio::test]
async fn test_partial_stream_then_close_keeps_observed_stages() {
    let server = MockServer::start(vec![vec![
        trace("Planner: decomposed"),
        trace("Retriever: fetched 3 documents"),
        Reply::Close,
    ]])
    .await;

    let mut ctrl = controller(&server, Arc::new(MemoryHistoryStore::new()));
    ctrl.submit("What is X?").unwrap();
    assert_eq!(run(&mut ctrl).await, SessionPhase::Failed);

    let stages = ctrl.stages();
    assert_eq!(stages.status(PipelineStage::Planning), StageStatus::Done);
    assert_eq!(stages.status(PipelineStage::Retrieval), StageStatus::Done);
    assert_eq!(stages.status(PipelineStage::Reranking), StageStatus::Pending);
    assert_eq!(ctrl.error(), Some("Connection failed."));
}

#[tokio::test]
async fn test_resubmit_while_streaming_replaces_channel() {
    let server = MockServer::start(vec![
        vec![
            trace("Planner: first query"),
            Reply::Hold(Duration::from_secs(2)),
            done("first answer"),
        ],
        vec![trace("Planner: second query"), done("second answer")],
    ])
    .await;

    let mut ctrl = controller(&server, Arc::new(MemoryHistoryStore::new()));
    ctrl.submit("first").unwrap();
    ctrl.next_event().await.unwrap();
    assert_eq!(ctrl.phase(), SessionPhase::Streaming);

    ctrl.submit("second").unwrap();
    assert_eq!(run(&mut ctrl).await, SessionPhase::Completed);

    let view = ctrl.view();
    assert_eq!(view.display_answer(), Some("second answer"));
    assert_eq!(view.reasoning_trace, vec!["Planner: second query".to_string()]);
    assert_eq!(server.recorded().len(), 2);
}

#[tokio::test]
async fn test_history_view_and_delete() {
    let server = MockServer::start(Vec::new()).await;
    let store = Arc::new(MemoryHistoryStore::with_records(vec![
        history_record("q1", "First", "2024-05-01T09:00:00"),
        history_record("q2", "Second", "2024-05-03T09:00:00"),
    ]));

    let mut ctrl = controller(&server, store.clone());
    let ids: Vec<String> = ctrl
        .refresh_history()
        .await
        .iter()
        .map(|r| r.query_id.clone())
        .collect();
    assert_eq!(ids, vec!["q2", "q1"]);

    ctrl.select_history("q1").unwrap();
    assert_eq!(ctrl.phase(), SessionPhase::Viewing);
    assert_eq!(ctrl.view().display_answer(), Some("answer to First"));

    ctrl.delete_history("q1").await.unwrap();
    assert_eq!(ctrl.history().len(), 1);
    ctrl.refresh_history().await;
    assert!(ctrl.history().iter().all(|r| r.query_id != "q1"));

    store.set_fail_remove(true);
    assert!(ctrl.delete_history("q2").await.is_err());
    assert_eq!(ctrl.history().len(), 1);
}
