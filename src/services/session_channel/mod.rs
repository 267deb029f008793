//! Streaming Session Channel
//!
//! One WebSocket connection per query, scoped to a session identifier:
//! - `transport` - connection traits and the tokio-tungstenite implementation
//! - `channel` - the spawned per-query task and its owner handle

pub mod channel;
pub mod transport;

pub use channel::{ChannelConfig, ChannelEvent, ChannelHandle, SessionChannel};
pub use transport::{FrameConnection, StreamConnector, WebSocketConnector};
