//! Query History
//!
//! HTTP client for the backend's request/response endpoints and the
//! `HistoryStore` abstraction the controller depends on.

pub mod client;
pub mod store;

pub use client::{ApiClient, ApiClientConfig};
pub use store::{AskBackend, HistoryStore, MemoryHistoryStore};
