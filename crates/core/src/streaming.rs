//! Session Event Types
//!
//! Typed events produced while one query streams, and the adapter trait that
//! turns raw transport frames into them. The channel (in the client crate)
//! feeds every text frame through a `FrameAdapter`; the controller only ever
//! sees `SessionEvent`s.

use serde::{Deserialize, Serialize};

use crate::classifier::TraceEvent;
use crate::protocol::{QueryResult, ServerFrame};
use crate::stage::PipelineStage;

/// Typed event emitted by a streaming session, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Progress line from one of the backend agents
    Trace { trace: TraceEvent },

    /// Informational answer preview; never terminal
    Answer { text: String },

    /// Successful completion, with the final result when the backend sent one
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<QueryResult>,
    },

    /// Failure reported by the backend, or synthesized by the client when the
    /// connection fails
    Error { message: String },
}

impl SessionEvent {
    pub fn trace(text: impl Into<String>) -> Self {
        SessionEvent::Trace {
            trace: TraceEvent::new(text),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SessionEvent::Error {
            message: message.into(),
        }
    }

    /// `Done` and `Error` end a session; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Done { .. } | SessionEvent::Error { .. })
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Trace { .. } => "trace",
            SessionEvent::Answer { .. } => "answer",
            SessionEvent::Done { .. } => "done",
            SessionEvent::Error { .. } => "error",
        }
    }
}

impl From<ServerFrame> for SessionEvent {
    fn from(frame: ServerFrame) -> Self {
        match frame {
            ServerFrame::Trace { trace, stage } => {
                // An unrecognised tag is not an error: label matching takes over.
                let stage = stage.and_then(|s| s.parse::<PipelineStage>().ok());
                SessionEvent::Trace {
                    trace: TraceEvent {
                        raw_text: trace,
                        stage,
                    },
                }
            }
            ServerFrame::Answer { answer } => SessionEvent::Answer { text: answer },
            ServerFrame::Done { full_result } => SessionEvent::Done {
                result: full_result,
            },
            ServerFrame::Error { error } => SessionEvent::Error { message: error },
        }
    }
}

/// Errors that can occur during frame adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Frame is not JSON at all
    InvalidFormat(String),
    /// JSON that does not match the shape of its event type
    ParseError(String),
    /// Well-formed frame with an event type this client does not know
    UnsupportedEvent(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::UnsupportedEvent(msg) => write!(f, "Unsupported event: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Trait for adapting raw transport frames to session events.
pub trait FrameAdapter: Send + Sync {
    /// Returns the protocol name for logging and identification.
    fn protocol_name(&self) -> &'static str;

    /// Adapt one text frame. Blank frames (keep-alives) yield `Ok(None)`.
    fn adapt(&self, input: &str) -> Result<Option<SessionEvent>, AdapterError>;
}

/// Adapter for the JSON frames described by [`ServerFrame`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFrameAdapter;

impl FrameAdapter for JsonFrameAdapter {
    fn protocol_name(&self) -> &'static str {
        "meka-json"
    }

    fn adapt(&self, input: &str) -> Result<Option<SessionEvent>, AdapterError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| AdapterError::InvalidFormat(format!("{} (data: {})", e, trimmed)))?;

        let event_name = value
            .get("event")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| AdapterError::ParseError("missing \"event\" field".to_string()))?;

        if !ServerFrame::EVENT_NAMES.contains(&event_name.as_str()) {
            return Err(AdapterError::UnsupportedEvent(event_name));
        }

        let frame: ServerFrame = serde_json::from_value(value)
            .map_err(|e| AdapterError::ParseError(format!("{} frame: {}", event_name, e)))?;

        Ok(Some(frame.into()))
    }
}
