//! History Store
//!
//! Read/delete access to persisted query records. There is no client-side
//! create or update: the backend records every completed query itself.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use meka_core::{order_most_recent_first, AskRequest, HistoryRecord, QueryResult};

use super::client::ApiClient;
use crate::utils::error::{AppError, AppResult};

/// Source of persisted query records.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch all records, most recent first. Errors are returned to the caller.
    async fn fetch(&self) -> AppResult<Vec<HistoryRecord>>;

    /// Delete one record by id.
    async fn remove(&self, query_id: &str) -> AppResult<()>;

    /// Fetch all records, failing soft to an empty list.
    async fn list(&self) -> Vec<HistoryRecord> {
        match self.fetch().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("[History] Failed to fetch history: {}", e);
                Vec::new()
            }
        }
    }
}

/// Non-streaming query backend (`POST /ask`).
#[async_trait]
pub trait AskBackend: Send + Sync {
    async fn ask(&self, request: AskRequest) -> AppResult<QueryResult>;
}

#[async_trait]
impl HistoryStore for ApiClient {
    async fn fetch(&self) -> AppResult<Vec<HistoryRecord>> {
        let mut records = self
            .get_history()
            .await
            .map_err(|e| AppError::history_fetch(e.to_string()))?;
        order_most_recent_first(&mut records);
        tracing::debug!("[History] Fetched {} records", records.len());
        Ok(records)
    }

    async fn remove(&self, query_id: &str) -> AppResult<()> {
        self.delete_history_record(query_id)
            .await
            .map_err(|e| AppError::history_delete(e.to_string()))?;
        tracing::info!("[History] Deleted record {}", query_id);
        Ok(())
    }
}

#[async_trait]
impl AskBackend for ApiClient {
    async fn ask(&self, request: AskRequest) -> AppResult<QueryResult> {
        Ok(self.post_ask(&request).await?.answer)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// History store kept in process memory.
///
/// Used for offline runs and tests; failure switches simulate an
/// unreachable backend.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
    fail_fetch: AtomicBool,
    fail_remove: AtomicBool,
    fetch_count: AtomicUsize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn insert(&self, record: HistoryRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Number of `fetch` calls so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<HistoryRecord>>> {
        self.records
            .lock()
            .map_err(|_| AppError::internal("history store lock poisoned"))
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn fetch(&self) -> AppResult<Vec<HistoryRecord>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::history_fetch("backend unavailable"));
        }
        let mut records = self.lock()?.clone();
        order_most_recent_first(&mut records);
        Ok(records)
    }

    async fn remove(&self, query_id: &str) -> AppResult<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(AppError::history_delete("backend unavailable"));
        }
        let mut records = self.lock()?;
        let before = records.len();
        records.retain(|r| r.query_id != query_id);
        if records.len() == before {
            return Err(AppError::history_delete(format!("HTTP 404: {}", query_id)));
        }
        Ok(())
    }
}
