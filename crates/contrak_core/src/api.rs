//! Typed client for the Contrak REST backend.

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::validate_url;

/// Errors returned by [`ContrakClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL is not an http(s) URL.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Body of `POST /contracts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub name: String,
    pub contract_history_id: String,
    pub chain_id: String,
    pub contract_address: String,
    pub deployment_transaction_hash: String,
    pub deployer_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_username: Option<String>,
    pub message: String,
}

/// A contract deployment as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub id: i64,
    pub name: String,
    pub contract_history_id: String,
    pub chain_id: String,
    pub contract_address: String,
    #[serde(default)]
    pub deployment_transaction_hash: Option<String>,
    #[serde(default)]
    pub deployer_address: Option<String>,
    #[serde(default)]
    pub deployer_signature: Option<String>,
    #[serde(default)]
    pub org_public_key: Option<String>,
    #[serde(default)]
    pub org_signature: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub git_username: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client for the contracts endpoints of the Contrak API.
#[derive(Debug, Clone)]
pub struct ContrakClient {
    base_url: String,
    client: Client,
}

impl ContrakClient {
    /// Create a client for the given base URL (trailing slashes are ignored).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !validate_url(&base_url) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("contrak/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(default_headers)
            .build()?;

        Ok(Self { base_url, client })
    }

    /// Return the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store a new contract deployment record.
    pub async fn create_contract(&self, request: &CreateContractRequest) -> Result<Value, ApiError> {
        let url = format!("{}/contracts", self.base_url);
        debug!(url = %url, name = %request.name, "creating contract");

        let response = self.client.post(&url).json(request).send().await?;
        let body = Self::read_body(response).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch every stored contract, bypassing intermediate caches.
    pub async fn get_all_contracts(&self) -> Result<Vec<ContractRecord>, ApiError> {
        let url = format!("{}/contracts", self.base_url);
        debug!(url = %url, "listing contracts");

        let response = self
            .client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
