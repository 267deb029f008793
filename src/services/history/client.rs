//! MEKA API Client
//!
//! HTTP client for the request/response endpoints of the backend:
//! `GET /history`, `DELETE /history/{query_id}` and the legacy `POST /ask`.

use std::time::Duration;

use meka_core::{AskRequest, AskResponse, HistoryRecord};
use url::Url;

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000/`
    pub base_url: Url,
    /// Request timeout duration.
    pub timeout: Duration,
}

impl ApiClientConfig {
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            base_url: config.api_base_url()?,
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

/// HTTP client for the MEKA backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client with the given configuration.
    pub fn with_config(config: ApiClientConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// Creates a client for the endpoint described by `config`.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        Self::with_config(ApiClientConfig::from_app_config(config)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /history`, in server order. Records that fail to decode are
    /// skipped.
    pub async fn get_history(&self) -> AppResult<Vec<HistoryRecord>> {
        let url = self.endpoint(&["history"])?;
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(decode_history_rows(rows))
    }

    /// `DELETE /history/{query_id}`. Any 2xx status is success.
    pub async fn delete_history_record(&self, query_id: &str) -> AppResult<()> {
        let url = self.endpoint(&["history", query_id])?;
        let response = self.client.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// `POST /ask`, the non-streaming path.
    pub async fn post_ask(&self, request: &AskRequest) -> AppResult<AskResponse> {
        let url = self.endpoint(&["ask"])?;
        let response = self.client.post(url).json(request).send().await?;
        let response = check_status(response).await?;
        let body: AskResponse = response.json().await?;
        Ok(body)
    }
}

fn decode_history_rows(rows: Vec<serde_json::Value>) -> Vec<HistoryRecord> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<HistoryRecord>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("[History] Skipping undecodable record #{}: {}", index, e);
                None
            }
        })
        .collect()
}

async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Http {
        status: status.as_u16(),
        body,
    })
}
