//! History Commands
//!
//! `meka history` and `meka delete`.

use std::fmt::Write as _;

use meka_core::HistoryRecord;

use crate::services::history::HistoryStore;
use crate::utils::error::AppResult;

/// Longest query text shown in the listing before truncation
const QUERY_PREVIEW_CHARS: usize = 60;

/// Fetch the history list, reporting transport errors to the caller.
pub async fn list_history(store: &dyn HistoryStore) -> AppResult<Vec<HistoryRecord>> {
    store.fetch().await
}

pub async fn delete_history(store: &dyn HistoryStore, query_id: &str) -> AppResult<()> {
    store.remove(query_id).await
}

/// One line per record: id, timestamp, status and query text.
pub fn render_history(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No history.\n".to_string();
    }

    let mut out = String::new();
    for record in records {
        let when = record
            .recorded_at()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let status = record.status.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "{:<12} {:<16} {:<10} {}",
            record.query_id,
            when,
            status,
            preview(&record.query_text)
        );
    }
    out
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= QUERY_PREVIEW_CHARS {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(QUERY_PREVIEW_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::history::MemoryHistoryStore;
    use meka_core::{QueryResult, RecordTimestamp};

    fn record(id: &str, query: &str, ts: Option<RecordTimestamp>) -> HistoryRecord {
        HistoryRecord {
            query_id: id.to_string(),
            query_text: query.to_string(),
            timestamp: ts,
            status: Some("done".to_string()),
            reasoning_trace: None,
            result: QueryResult::default(),
        }
    }

    #[test]
    fn test_render_history() {
        let out = render_history(&[
            record(
                "q1",
                "What is X?",
                Some(RecordTimestamp::Text("2024-05-01T10:30:00".into())),
            ),
            record("q2", "Undated", None),
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("q1"));
        assert!(lines[0].contains("2024-05-01 10:30"));
        assert!(lines[0].ends_with("What is X?"));
        assert!(lines[1].contains(" - "));
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_history(&[]), "No history.\n");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(40);
        let p = preview(&long);
        assert_eq!(p.chars().count(), QUERY_PREVIEW_CHARS);
        assert!(p.ends_with("..."));
        assert_eq!(preview("a\n  b"), "a b");
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryHistoryStore::with_records(vec![record("q1", "a", None)]);
        assert_eq!(list_history(&store).await.unwrap().len(), 1);

        delete_history(&store, "q1").await.unwrap();
        assert!(list_history(&store).await.unwrap().is_empty());
        assert!(delete_history(&store, "q1").await.is_err());
    }
}
