//! Storage Layer
//!
//! Handles local persistence: the JSON client config.

pub mod config;

pub use config::*;
