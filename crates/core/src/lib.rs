//! MEKA Core
//!
//! Domain types for the MEKA query client: pipeline stages, trace
//! classification, stage-state derivation and the backend wire protocol. This
//! crate has no dependencies on networking or async runtime code.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`)
//! - `stage` - Pipeline stages and their derived statuses
//! - `classifier` - Trace events and label-based classification
//! - `tracker` - Pure stage-status derivation (`PipelineStateTracker`)
//! - `protocol` - Wire types for streaming frames, history and `/ask`
//! - `streaming` - Typed session events and the frame adapter trait
//!
//! ## Design Principles
//!
//! 1. **Pure derivation** - stage statuses are recomputed from the trace, never stored
//! 2. **Trait at the transport seam** - `FrameAdapter` decouples wire format from the channel
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod classifier;
pub mod error;
pub mod protocol;
pub mod stage;
pub mod streaming;
pub mod tracker;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::CoreError;

// ── Pipeline Model ─────────────────────────────────────────────────────
pub use classifier::{classify_trace, TraceEvent};
pub use stage::{PipelineStage, StageStatus};
pub use tracker::{derive_snapshot, PipelineSnapshot, PipelineStateTracker, StageView};

// ── Wire Protocol ──────────────────────────────────────────────────────
pub use protocol::{
    order_most_recent_first, AskRequest, AskResponse, EvidenceDocument, EvidenceMetadata,
    HistoryRecord, QueryRequest, QueryResult, RecordTimestamp, ServerFrame,
};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, FrameAdapter, JsonFrameAdapter, SessionEvent};
