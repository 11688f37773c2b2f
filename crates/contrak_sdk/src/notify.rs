//! Push notifications to subscribers through the WalletConnect Notify API.

use anyhow::{Context, Result};
use contrak_core::{ContrakConfig, NotifyCredentials, chain_name};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::connect::ConnectOutput;

const DEFAULT_BASE_URL: &str = "https://notify.walletconnect.com";
const NOTIFICATION_ICON: &str = "https://avatars.githubusercontent.com/u/37784886?s=48&v=4";
const NOTIFICATION_TYPE: &str = "alerts";

/// A single notification as accepted by the notify endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
struct NotifyRequest<'a> {
    accounts: &'a [String],
    notification: &'a Notification,
}

/// Describe a freshly connected contract. `app_url` is the public frontend
/// URL; without it the notification carries no link.
pub fn build_notification(output: &ConnectOutput, app_url: Option<&str>) -> Notification {
    let url = app_url.map(|base| {
        format!(
            "{}/contracts/history/{}?contractAddress={}",
            base.trim_end_matches('/'),
            output.contract_history_id,
            output.contract_address
        )
    });

    Notification {
        title: format!("Contract Deployed - {}", output.contract_name),
        body: format!(
            "{} Deployed by Contrak Team to chain {} - {}",
            output.contract_address,
            chain_name(&output.chain_id),
            output.chain_id
        ),
        icon: NOTIFICATION_ICON.to_string(),
        url,
        kind: NOTIFICATION_TYPE.to_string(),
    }
}

/// Client for one notify project.
pub struct NotifyClient {
    project_id: String,
    base_url: String,
    client: Client,
}

impl NotifyClient {
    /// Build a client when notify credentials are configured.
    pub fn from_config(config: &ContrakConfig) -> Result<Option<Self>> {
        config.notify().map(Self::new).transpose()
    }

    pub fn new(credentials: NotifyCredentials) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Point the client at a custom API base URL (used against mock servers).
    pub fn with_base_url(
        credentials: NotifyCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut default_headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", credentials.api_secret))
            .context("invalid characters in notify API secret")?;
        default_headers.insert(AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(default_headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            project_id: credentials.project_id,
            base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Accounts subscribed to this project.
    pub async fn subscribers(&self) -> Result<Vec<String>> {
        let url = format!("{}/{}/subscribers", self.base_url, self.project_id);
        debug!(url = %url, "listing notify subscribers");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("notify subscribers request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("notify API error ({status}): {body}");
        }
        response
            .json()
            .await
            .context("failed to parse notify subscribers response")
    }

    /// Send `notification` to `accounts`.
    pub async fn notify(&self, accounts: &[String], notification: &Notification) -> Result<()> {
        let url = format!("{}/{}/notify", self.base_url, self.project_id);
        debug!(url = %url, accounts = accounts.len(), title = %notification.title, "sending notification");

        let response = self
            .client
            .post(&url)
            .json(&NotifyRequest {
                accounts,
                notification,
            })
            .send()
            .await
            .context("notify request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("notify API error ({status}): {body}");
        }
        Ok(())
    }

    /// Notify every subscriber about `output`. Returns how many accounts were
    /// addressed.
    pub async fn announce(&self, output: &ConnectOutput, app_url: Option<&str>) -> Result<usize> {
        let accounts = self.subscribers().await?;
        let notification = build_notification(output, app_url);
        self.notify(&accounts, &notification).await?;
        info!(accounts = accounts.len(), contract = %output.contract_name, "subscribers notified");
        Ok(accounts.len())
    }
}
