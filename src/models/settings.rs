//! Settings Models
//!
//! Client configuration and settings data structures.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::error::{AppError, AppResult};

/// Environment variable overriding `server_host`
pub const HOST_ENV: &str = "MEKA_HOST";
/// Environment variable overriding `server_port`
pub const PORT_ENV: &str = "MEKA_PORT";

/// Client configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend host name or address
    pub server_host: String,
    /// Backend port
    pub server_port: u16,
    /// Use `https`/`wss` instead of `http`/`ws`
    pub use_tls: bool,
    /// Initial value of the web-search toggle
    pub web_search_default: bool,
    /// Time allowed to establish the streaming connection
    pub connect_timeout_secs: u64,
    /// Maximum silence between frames on an open stream
    pub stream_idle_timeout_secs: u64,
    /// Timeout for history and legacy `/ask` requests
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            use_tls: false,
            web_search_default: false,
            connect_timeout_secs: 10,
            stream_idle_timeout_secs: 120,
            request_timeout_secs: 30,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub use_tls: Option<bool>,
    pub web_search_default: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub stream_idle_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

impl SettingsUpdate {
    /// Collect host/port overrides from the environment.
    ///
    /// Unparseable port values are ignored with a warning.
    pub fn from_env() -> Self {
        let server_host = std::env::var(HOST_ENV)
            .ok()
            .filter(|h| !h.trim().is_empty());
        let server_port = std::env::var(PORT_ENV).ok().and_then(|p| match p.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!("[Config] Ignoring invalid {}={:?}", PORT_ENV, p);
                None
            }
        });
        Self {
            server_host,
            server_port,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.server_host.is_none()
            && self.server_port.is_none()
            && self.use_tls.is_none()
            && self.web_search_default.is_none()
            && self.connect_timeout_secs.is_none()
            && self.stream_idle_timeout_secs.is_none()
            && self.request_timeout_secs.is_none()
    }
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(host) = update.server_host {
            self.server_host = host;
        }
        if let Some(port) = update.server_port {
            self.server_port = port;
        }
        if let Some(tls) = update.use_tls {
            self.use_tls = tls;
        }
        if let Some(web) = update.web_search_default {
            self.web_search_default = web;
        }
        if let Some(secs) = update.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(secs) = update.stream_idle_timeout_secs {
            self.stream_idle_timeout_secs = secs;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server_host.trim().is_empty() {
            return Err("server_host must not be empty".to_string());
        }

        if self.server_port == 0 {
            return Err("server_port must be between 1 and 65535".to_string());
        }

        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be at least 1 second".to_string());
        }
        if self.stream_idle_timeout_secs == 0 {
            return Err("stream_idle_timeout_secs must be at least 1 second".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1 second".to_string());
        }

        Ok(())
    }

    /// Base URL for the request/response endpoints, e.g. `http://127.0.0.1:8000/`
    pub fn api_base_url(&self) -> AppResult<Url> {
        let scheme = if self.use_tls { "https" } else { "http" };
        self.build_url(scheme, "/")
    }

    /// Streaming endpoint for one session, e.g. `ws://127.0.0.1:8000/ws/ask/abc123`
    pub fn stream_url(&self, session_id: &str) -> AppResult<Url> {
        if session_id.is_empty() {
            return Err(AppError::validation("session id must not be empty"));
        }
        let scheme = if self.use_tls { "wss" } else { "ws" };
        let mut url = self.build_url(scheme, "/")?;
        url.path_segments_mut()
            .map_err(|_| AppError::config("endpoint cannot carry a path"))?
            .clear()
            .extend(["ws", "ask", session_id]);
        Ok(url)
    }

    fn build_url(&self, scheme: &str, path: &str) -> AppResult<Url> {
        let host = self.server_host.trim();
        // IPv6 literals need brackets in the authority
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        let raw = format!("{}://{}:{}{}", scheme, host, self.server_port, path);
        Ok(Url::parse(&raw)?)
    }
}
