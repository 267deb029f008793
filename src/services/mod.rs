//! Services
//!
//! Business logic services for the client.
//! Services handle the core functionality and are called by commands.

pub mod controller;
pub mod history;
pub mod session_channel;

pub use controller::QuerySessionController;
pub use history::{ApiClient, ApiClientConfig, AskBackend, HistoryStore, MemoryHistoryStore};
pub use session_channel::{
    ChannelConfig, ChannelEvent, ChannelHandle, FrameConnection, SessionChannel, StreamConnector,
    WebSocketConnector,
};
