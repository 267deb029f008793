//! Trace Classification
//!
//! Maps raw backend trace lines onto pipeline stages.
//!
//! Backends that tag each trace frame with an explicit stage are authoritative;
//! the label-token search below only applies to untagged lines, so older
//! backends that emit plain text keep working.

use serde::{Deserialize, Serialize};

use crate::stage::PipelineStage;

/// A single progress line emitted while one query is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// The line exactly as received
    pub raw_text: String,
    /// Explicit stage tag from the backend, when it sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
}

impl TraceEvent {
    /// An untagged trace line.
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            stage: None,
        }
    }

    /// A trace line the backend tagged with its stage.
    pub fn tagged(raw_text: impl Into<String>, stage: PipelineStage) -> Self {
        Self {
            raw_text: raw_text.into(),
            stage: Some(stage),
        }
    }

    /// The stage this line counts towards, or `None` if unclassified.
    pub fn classification(&self) -> Option<PipelineStage> {
        self.stage.or_else(|| classify_trace(&self.raw_text))
    }
}

/// Classify a raw trace line by its agent label token.
///
/// The search is case-insensitive and looks for `planner:`, `retriever:`,
/// `reranker:`, `summarizer:` or `validator:` anywhere in the line. A line
/// that contains no label, or labels for more than one stage, is
/// unclassified.
pub fn classify_trace(raw: &str) -> Option<PipelineStage> {
    let lower = raw.to_lowercase();
    let mut matches = PipelineStage::ALL
        .into_iter()
        .filter(|stage| lower.contains(stage.label_token()));

    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}
