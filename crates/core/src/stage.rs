//! Pipeline Stage Types
//!
//! The fixed, ordered set of backend pipeline phases and the status the client
//! derives for each of them. Statuses are always computed from observed trace
//! lines; the server never sends them directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One named phase of backend processing, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Planning,
    Retrieval,
    Reranking,
    Summarizing,
    Verification,
}

impl PipelineStage {
    /// All stages in pipeline order.
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::Planning,
        PipelineStage::Retrieval,
        PipelineStage::Reranking,
        PipelineStage::Summarizing,
        PipelineStage::Verification,
    ];

    /// Zero-based position in the pipeline.
    pub fn index(self) -> usize {
        match self {
            PipelineStage::Planning => 0,
            PipelineStage::Retrieval => 1,
            PipelineStage::Reranking => 2,
            PipelineStage::Summarizing => 3,
            PipelineStage::Verification => 4,
        }
    }

    /// Name of the backend agent that reports progress for this stage.
    pub fn agent_name(self) -> &'static str {
        match self {
            PipelineStage::Planning => "planner",
            PipelineStage::Retrieval => "retriever",
            PipelineStage::Reranking => "reranker",
            PipelineStage::Summarizing => "summarizer",
            PipelineStage::Verification => "validator",
        }
    }

    /// Lowercase label token that prefixes this agent's trace lines
    /// (e.g. `planner:`).
    pub fn label_token(self) -> &'static str {
        match self {
            PipelineStage::Planning => "planner:",
            PipelineStage::Retrieval => "retriever:",
            PipelineStage::Reranking => "reranker:",
            PipelineStage::Summarizing => "summarizer:",
            PipelineStage::Verification => "validator:",
        }
    }

    /// Human-readable title for display.
    pub fn title(self) -> &'static str {
        match self {
            PipelineStage::Planning => "Planning",
            PipelineStage::Retrieval => "Retrieval",
            PipelineStage::Reranking => "Reranking",
            PipelineStage::Summarizing => "Summarizing",
            PipelineStage::Verification => "Verification",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Accepts both stage names (`"retrieval"`) and agent names (`"retriever"`),
/// case-insensitively. Backends that tag trace frames may use either.
impl FromStr for PipelineStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        PipelineStage::ALL
            .into_iter()
            .find(|stage| {
                normalized == stage.agent_name()
                    || normalized == stage.title().to_ascii_lowercase()
            })
            .ok_or_else(|| CoreError::unknown_stage(s))
    }
}

/// Derived progress of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Active,
    Done,
}

impl StageStatus {
    pub fn is_done(self) -> bool {
        matches!(self, StageStatus::Done)
    }
}
