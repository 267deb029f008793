//! Query Commands
//!
//! `meka ask`: runs one query through the controller and renders the outcome.

use std::fmt::Write as _;

use meka_core::{PipelineSnapshot, SessionEvent, StageStatus};

use crate::models::session::{SessionPhase, ViewState};
use crate::services::controller::QuerySessionController;
use crate::utils::error::{AppError, AppResult};

/// Run `query` to completion, streaming progress lines to `progress`.
///
/// Returns the final view; the caller decides on the exit status from its
/// phase. Only failures that prevent the query from starting are errors.
pub async fn ask(
    ctrl: &mut QuerySessionController,
    query: &str,
    stream: bool,
    mut progress: impl FnMut(&str),
) -> AppResult<ViewState> {
    if !stream {
        // Transport failures are reflected in the view as well.
        if let Err(e) = ctrl.submit_blocking(query).await {
            if ctrl.phase() != SessionPhase::Failed {
                return Err(e);
            }
        }
        return Ok(ctrl.view());
    }

    ctrl.submit(query)?;
    while let Some(event) = ctrl.next_event().await {
        if let Some(line) = progress_line(&event, &ctrl.stages()) {
            progress(&line);
        }
    }
    Ok(ctrl.view())
}

/// Map a finished view to the command outcome. A failed query yields the
/// message the backend (or the channel) reported.
pub fn query_outcome(view: &ViewState) -> AppResult<()> {
    match view.phase {
        SessionPhase::Completed => Ok(()),
        SessionPhase::Failed => Err(AppError::backend(
            view.error.as_deref().unwrap_or("Query failed"),
        )),
        other => Err(AppError::internal(format!("Query ended in phase {}", other))),
    }
}

/// One progress line for a streamed event.
pub fn progress_line(event: &SessionEvent, stages: &PipelineSnapshot) -> Option<String> {
    match event {
        SessionEvent::Trace { trace } => {
            let label = trace
                .classification()
                .map(|stage| stage.title())
                .unwrap_or("Trace");
            let mut line = format!("[{}] {}", label, trace.raw_text);
            if let Some(next) = stages.active_stage() {
                let _ = write!(line, "  (next: {})", next.title());
            }
            Some(line)
        }
        SessionEvent::Answer { .. } => Some("[Answer] preview received".to_string()),
        SessionEvent::Done { .. } | SessionEvent::Error { .. } => None,
    }
}

/// Render the answer of a completed query for standard output.
pub fn render_view(view: &ViewState) -> String {
    let mut out = String::new();

    if let Some(answer) = view.display_answer() {
        let _ = writeln!(out, "{}", answer);
    }

    let pending: Vec<&str> = view
        .stages
        .stages
        .iter()
        .filter(|s| s.status != StageStatus::Done)
        .map(|s| s.stage.title())
        .collect();
    if !pending.is_empty() && view.phase == SessionPhase::Completed {
        let _ = writeln!(out, "\nStages without a report: {}", pending.join(", "));
    }

    if let Some(result) = &view.result {
        if let Some(label) = &result.validation_label {
            let _ = write!(out, "\nValidation: {}", label);
            if let Some(reason) = &result.validation_reason {
                let _ = write!(out, " ({})", reason);
            }
            out.push('\n');
        }

        if !result.reranked_docs.is_empty() {
            out.push_str("\nSources:\n");
            for (i, doc) in result.reranked_docs.iter().enumerate() {
                let source = doc.metadata.source.as_deref().unwrap_or("unknown source");
                let _ = write!(out, "  {}. {}", i + 1, source);
                if let Some(score) = doc.metadata.score {
                    let _ = write!(out, " (score {:.2})", score);
                }
                out.push('\n');
            }
        }
    }

    out
}
