//! Pipeline State Tracker
//!
//! Derives the status of every pipeline stage from the trace lines observed so
//! far. The derivation is recomputed from the full trace on every call rather
//! than mutated incrementally, so duplicated or out-of-order delivery can never
//! leave the stages in a state the trace does not justify.

use serde::{Deserialize, Serialize};

use crate::classifier::TraceEvent;
use crate::stage::{PipelineStage, StageStatus};

/// Status and detail text for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageView {
    pub stage: PipelineStage,
    pub status: StageStatus,
    /// First trace line classified to this stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Statuses of all five stages, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub stages: Vec<StageView>,
}

impl PipelineSnapshot {
    /// Every stage pending, nothing observed.
    pub fn initial() -> Self {
        Self {
            stages: PipelineStage::ALL
                .into_iter()
                .map(|stage| StageView {
                    stage,
                    status: StageStatus::Pending,
                    detail: None,
                })
                .collect(),
        }
    }

    pub fn status(&self, stage: PipelineStage) -> StageStatus {
        self.stages
            .get(stage.index())
            .map(|view| view.status)
            .unwrap_or_default()
    }

    pub fn detail(&self, stage: PipelineStage) -> Option<&str> {
        self.stages
            .get(stage.index())
            .and_then(|view| view.detail.as_deref())
    }

    /// The stage currently shown as in progress, if any.
    pub fn active_stage(&self) -> Option<PipelineStage> {
        self.stages
            .iter()
            .find(|view| view.status == StageStatus::Active)
            .map(|view| view.stage)
    }

    pub fn all_done(&self) -> bool {
        self.stages.iter().all(|view| view.status.is_done())
    }
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

/// Derive stage statuses from an ordered trace.
///
/// - `Done`: some trace line classifies to the stage.
/// - `Active`: `loading`, not done, and every earlier stage is done.
/// - `Pending`: otherwise.
pub fn derive_snapshot(events: &[TraceEvent], loading: bool) -> PipelineSnapshot {
    let classified: Vec<(Option<PipelineStage>, &str)> = events
        .iter()
        .map(|event| (event.classification(), event.raw_text.as_str()))
        .collect();

    let mut predecessors_done = true;
    let stages = PipelineStage::ALL
        .into_iter()
        .map(|stage| {
            let detail = classified
                .iter()
                .find(|(tag, _)| *tag == Some(stage))
                .map(|(_, text)| text.to_string());

            let status = if detail.is_some() {
                StageStatus::Done
            } else if loading && predecessors_done {
                StageStatus::Active
            } else {
                StageStatus::Pending
            };
            predecessors_done &= detail.is_some();

            StageView {
                stage,
                status,
                detail,
            }
        })
        .collect();

    PipelineSnapshot { stages }
}

/// Accumulates the trace of the current query.
#[derive(Debug, Clone, Default)]
pub struct PipelineStateTracker {
    events: Vec<TraceEvent>,
}

impl PipelineStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tracker with an already complete trace (history replay).
    pub fn from_events(events: impl IntoIterator<Item = TraceEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every raw line, classified or not, in arrival order.
    pub fn raw_trace(&self) -> Vec<String> {
        self.events.iter().map(|e| e.raw_text.clone()).collect()
    }

    /// Recompute all stage statuses from the accumulated trace.
    pub fn snapshot(&self, loading: bool) -> PipelineSnapshot {
        derive_snapshot(&self.events, loading)
    }
}
