//! CLI Commands
//!
//! Handlers behind the `meka` subcommands. Each returns data or rendered
//! text; printing and exit codes are left to the binary.

pub mod config;
pub mod history;
pub mod query;

pub use config::{reset_config, show_config, update_config};
pub use history::{delete_history, list_history, render_history};
pub use query::{ask, progress_line, query_outcome, render_view};
