//! The connect flow: attest, sign, record, notify.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use contrak_core::{ContrakClient, ContrakConfig, CreateContractRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::git::GitMetadata;
use crate::message::ConnectMessage;
use crate::notify::NotifyClient;
use crate::signer::{Signer, SignerError, recover_signer};

const DEFAULT_OUTPUT_FILE: &str = "output.json";

/// What the caller knows about a fresh deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub contract_name: String,
    pub contract_history_id: String,
    pub chain_id: String,
    pub contract_address: String,
    pub deployer_address: String,
    pub contract_deployment_transaction_hash: String,
    pub org_public_key: Option<String>,
}

/// The artifact written to disk and submitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOutput {
    pub contract_name: String,
    pub contract_history_id: String,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    pub contract_address: String,
    pub deployer_address: String,
    pub contract_deployment_transaction_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_public_key: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_username: Option<String>,
}

impl ConnectOutput {
    /// Map onto the backend's create-contract body.
    pub fn to_request(&self) -> CreateContractRequest {
        CreateContractRequest {
            name: self.contract_name.clone(),
            contract_history_id: self.contract_history_id.clone(),
            chain_id: self.chain_id.clone(),
            contract_address: self.contract_address.clone(),
            deployment_transaction_hash: self.contract_deployment_transaction_hash.clone(),
            deployer_address: self.deployer_address.clone(),
            deployer_signature: self.deployer_signature.clone(),
            org_public_key: self.org_public_key.clone(),
            org_signature: self.org_signature.clone(),
            github_url: self.github_url.clone(),
            git_username: self.git_username.clone(),
            message: self.message.clone(),
        }
    }
}

/// Up to two independently configured keys.
#[derive(Debug, Default)]
pub struct SigningKeys {
    pub deployer: Option<Signer>,
    pub org: Option<Signer>,
}

impl SigningKeys {
    /// Load `DEPLOYER_PRIVATE_KEY` and `TEAM_PRIVATE_KEY`. A key that is set
    /// but malformed is an error, not a silent skip.
    pub fn from_config(config: &ContrakConfig) -> Result<Self, SignerError> {
        Ok(Self {
            deployer: config
                .deployer_private_key
                .as_deref()
                .map(Signer::from_hex)
                .transpose()?,
            org: config
                .org_private_key
                .as_deref()
                .map(Signer::from_hex)
                .transpose()?,
        })
    }
}

/// Where the flow writes and who it talks to.
pub struct ConnectConfig {
    pub verbose: bool,
    pub output_path: PathBuf,
    pub repo_dir: PathBuf,
    pub client: Option<ContrakClient>,
    pub notifier: Option<NotifyClient>,
    pub app_url: Option<String>,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            repo_dir: PathBuf::from("."),
            client: None,
            notifier: None,
            app_url: None,
        }
    }
}

impl ConnectConfig {
    /// Wire the API client and notifier from the environment. Submission is
    /// skipped when `submit` is false or `CONTRAK_API_URL` is unset; the API
    /// URL is only validated when it will be used.
    pub fn from_config(config: &ContrakConfig, submit: bool) -> Result<Self> {
        let client = match &config.api_url {
            Some(_) if submit => {
                let url = config.require_api_url()?;
                Some(ContrakClient::new(url)?)
            }
            _ => None,
        };
        Ok(Self {
            client,
            notifier: NotifyClient::from_config(config)?,
            app_url: config.app_url.clone(),
            ..Self::default()
        })
    }
}

/// Outcome of posting the artifact to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// No API URL configured.
    Skipped,
    Sent { response: Value },
    Failed { error: String },
}

impl Submission {
    pub fn is_sent(&self) -> bool {
        matches!(self, Submission::Sent { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ConnectReport {
    pub output: ConnectOutput,
    pub artifact_path: PathBuf,
    pub submission: Submission,
    /// Number of subscribers notified; `None` when notification was skipped
    /// or failed.
    pub notified: Option<usize>,
}

/// Sign and record a contract deployment.
///
/// Writing the artifact is the only fatal step after signing. Submission and
/// notification failures are logged and reported in [`ConnectReport`].
pub async fn connect(
    options: ConnectOptions,
    keys: &SigningKeys,
    config: &ConnectConfig,
) -> Result<ConnectReport> {
    let message = ConnectMessage::new(
        options.chain_id.clone(),
        options.contract_address.clone(),
        options.org_public_key.clone(),
    )
    .encode();

    let deployer_signature = match &keys.deployer {
        Some(signer) => {
            if !signer
                .address()
                .eq_ignore_ascii_case(options.deployer_address.trim())
            {
                warn!(
                    signer = %signer.address(),
                    deployer = %options.deployer_address,
                    "deployer key does not match the deployer address"
                );
            }
            Some(
                signer
                    .sign_message(&message)
                    .context("failed to sign with deployer key")?,
            )
        }
        None => None,
    };

    let org_signature = match &keys.org {
        Some(signer) => Some(
            signer
                .sign_message(&message)
                .context("failed to sign with org key")?,
        ),
        None => None,
    };

    let git = GitMetadata::collect(&config.repo_dir);

    let output = ConnectOutput {
        contract_name: options.contract_name,
        contract_history_id: options.contract_history_id,
        chain_id: options.chain_id,
        contract_address: options.contract_address,
        deployer_address: options.deployer_address,
        contract_deployment_transaction_hash: options.contract_deployment_transaction_hash,
        org_public_key: options.org_public_key,
        message,
        deployer_signature,
        org_signature,
        github_url: git.commit_link,
        git_username: git.username,
    };

    write_artifact(&config.output_path, &output).await?;
    info!(path = %config.output_path.display(), "wrote connect artifact");

    let submission = submit(&output, config).await;

    let notified = match (&config.notifier, submission.is_sent()) {
        (Some(notifier), true) => match notifier.announce(&output, config.app_url.as_deref()).await
        {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("failed to notify subscribers: {e:#}");
                None
            }
        },
        _ => None,
    };

    Ok(ConnectReport {
        output,
        artifact_path: config.output_path.clone(),
        submission,
        notified,
    })
}

async fn write_artifact(path: &Path, output: &ConnectOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("failed to serialize artifact")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write artifact to {}", path.display()))
}

async fn submit(output: &ConnectOutput, config: &ConnectConfig) -> Submission {
    let Some(client) = &config.client else {
        info!("no API URL configured, skipping submission");
        return Submission::Skipped;
    };

    match client.create_contract(&output.to_request()).await {
        Ok(response) => {
            info!(api = %client.base_url(), "sent contract details");
            if config.verbose {
                let pretty =
                    serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string());
                info!("create contract response:\n{pretty}");
            }
            Submission::Sent { response }
        }
        Err(e) => {
            warn!(api = %client.base_url(), "failed to send contract details: {e}");
            Submission::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Result of checking a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub signer: String,
    /// The decoded payload when `message` is a connect message.
    pub message: Option<ConnectMessage>,
}

/// Recover who signed `message`.
pub fn verify(message: &str, signature: &str) -> Result<VerifyReport, SignerError> {
    let signer = recover_signer(message, signature)?;
    Ok(VerifyReport {
        signer,
        message: ConnectMessage::decode(message).ok(),
    })
}
