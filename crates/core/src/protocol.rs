//! Wire Protocol Types
//!
//! JSON shapes exchanged with the MEKA backend:
//! - streaming frames on `/ws/ask/{thread_id}` (`ServerFrame`, `QueryRequest`)
//! - request/response bodies for `/history` and the legacy `/ask` endpoint
//!
//! The backend has grown a few field spellings over time (`query` vs
//! `question`, `page_content` vs `content`, ISO strings vs epoch numbers for
//! timestamps); the serde attributes here accept all of them so callers only
//! ever see one shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Result Payload
// ============================================================================

/// Optional metadata attached to an evidence document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    /// Document kind (e.g. "web", "pdf")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Reranker relevance score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Origin URL or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A piece of retrieved evidence backing the final answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    #[serde(alias = "page_content", default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: EvidenceMetadata,
}

/// The final payload of a completed query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub final_answer: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning_trace: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reranked_docs: Vec<EvidenceDocument>,
    /// Grounding verdict from the validator (e.g. "GROUNDED")
    #[serde(
        rename = "validation",
        alias = "validation_label",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub validation_label: Option<String>,
    #[serde(
        rename = "reason",
        alias = "validation_reason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub validation_reason: Option<String>,
    /// Search plan produced by the planner agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner_output: Option<String>,
}

// ============================================================================
// History Records
// ============================================================================

/// Older records stored the bare answer string instead of a result object.
fn answer_or_result<'de, D>(deserializer: D) -> Result<QueryResult, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredResult {
        Answer(String),
        Full(QueryResult),
    }

    Ok(match Option::<StoredResult>::deserialize(deserializer)? {
        Some(StoredResult::Answer(final_answer)) => QueryResult {
            final_answer,
            ..Default::default()
        },
        Some(StoredResult::Full(result)) => result,
        None => QueryResult::default(),
    })
}

/// When a history record was created. The backend has written both epoch
/// milliseconds and ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTimestamp {
    EpochMillis(f64),
    Text(String),
}

impl RecordTimestamp {
    /// Parse into a UTC instant. Naive ISO strings are taken as UTC.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordTimestamp::EpochMillis(ms) => {
                if !ms.is_finite() {
                    return None;
                }
                DateTime::<Utc>::from_timestamp_millis(*ms as i64)
            }
            RecordTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
        }
    }
}

/// A persisted query and its result, as served by `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub query_id: String,
    #[serde(
        rename = "query",
        alias = "query_text",
        alias = "question",
        default,
        deserialize_with = "null_as_default"
    )]
    pub query_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<RecordTimestamp>,
    /// Backend processing status, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Trace stored alongside the record rather than inside the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<Vec<String>>,
    #[serde(default, deserialize_with = "answer_or_result")]
    pub result: QueryResult,
}

impl HistoryRecord {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(RecordTimestamp::to_datetime)
    }

    /// Trace lines to replay for this record: the record-level trace when
    /// present, otherwise the one inside the result.
    pub fn trace_lines(&self) -> &[String] {
        match &self.reasoning_trace {
            Some(lines) if !lines.is_empty() => lines,
            _ => &self.result.reasoning_trace,
        }
    }
}

/// Order records most-recent-first.
///
/// When no record carries a usable timestamp the server order is kept. The
/// sort is stable, and records without a timestamp sort after the
/// timestamped ones.
pub fn order_most_recent_first(records: &mut [HistoryRecord]) {
    if records.iter().all(|r| r.recorded_at().is_none()) {
        return;
    }
    records.sort_by(|a, b| b.recorded_at().cmp(&a.recorded_at()));
}

// ============================================================================
// Streaming Frames
// ============================================================================

/// First message sent after the streaming connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub web_search: bool,
}

/// Frames pushed by the server during one query, discriminated by `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerFrame {
    Trace {
        trace: String,
        /// Explicit stage tag; unknown values fall back to label matching
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },
    Answer {
        answer: String,
    },
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        full_result: Option<QueryResult>,
    },
    Error {
        error: String,
    },
}

impl ServerFrame {
    /// Values accepted in the `event` discriminator.
    pub const EVENT_NAMES: [&'static str; 4] = ["trace", "answer", "done", "error"];
}

// ============================================================================
// Legacy Request/Response
// ============================================================================

/// Body of the non-streaming `POST /ask` fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub web_search: bool,
    pub thread_id: String,
}

/// Response of `POST /ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: QueryResult,
}
