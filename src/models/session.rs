//! Session Models
//!
//! Identifiers, options and the observable view state of a query session.

use std::fmt;

use meka_core::{HistoryRecord, PipelineSnapshot, QueryResult};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of generated session identifiers
pub const SESSION_ID_LEN: usize = 8;

/// Client-generated identifier scoping one streaming connection.
///
/// The backend uses it as the conversation thread key; it is not a security
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier of lowercase letters and digits.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options sent with the initiating message of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Allow the backend to consult web search
    pub web_search: bool,
}

/// Lifecycle phase of the controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No active query; input enabled
    #[default]
    Idle,
    /// Query accepted, channel opening
    Submitting,
    /// At least one event received on the current channel
    Streaming,
    /// `done` received; result frozen
    Completed,
    /// `error` received; message frozen
    Failed,
    /// A history record is displayed
    Viewing,
}

impl SessionPhase {
    /// Whether a query is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionPhase::Submitting | SessionPhase::Streaming)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Streaming => "streaming",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
            SessionPhase::Viewing => "viewing",
        };
        f.write_str(name)
    }
}

/// Serializable snapshot of everything a presentation layer needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub phase: SessionPhase,
    pub session_id: SessionId,
    pub active_query: Option<String>,
    pub loading: bool,
    pub preview_answer: Option<String>,
    pub reasoning_trace: Vec<String>,
    pub stages: PipelineSnapshot,
    pub result: Option<QueryResult>,
    pub error: Option<String>,
    pub history: Vec<HistoryRecord>,
    pub web_search: bool,
}

impl ViewState {
    /// Final answer when one is present, otherwise the streamed preview.
    pub fn display_answer(&self) -> Option<&str> {
        self.result
            .as_ref()
            .map(|r| r.final_answer.as_str())
            .filter(|a| !a.is_empty())
            .or(self.preview_answer.as_deref())
    }
}
