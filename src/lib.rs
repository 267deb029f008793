//! MEKA Client - Streaming Query Runtime
//!
//! Client-side runtime for the MEKA multi-agent knowledge assistant.
//! It includes:
//! - The query session controller and its state machine
//! - The per-query WebSocket session channel
//! - The HTTP history store and legacy `/ask` client
//! - Configuration storage, data models and utilities
//! - CLI command handlers used by the `meka` binary

pub mod commands;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::session::{QueryOptions, SessionId, SessionPhase, ViewState};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::{
    ApiClient, AskBackend, ChannelEvent, HistoryStore, MemoryHistoryStore, QuerySessionController,
    SessionChannel, WebSocketConnector,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
