//! Data Models
//!
//! Client configuration and session state structures. Wire types live in
//! `meka-core`.

pub mod session;
pub mod settings;

pub use session::*;
pub use settings::*;
