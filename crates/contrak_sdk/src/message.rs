use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

const CONNECT_ACTION: &str = "connect";

/// Errors raised while decoding a signed message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("message is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("message is not a connect payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected message action: {0}")]
    Action(String),
}

/// The payload both signers attest to. Key order on the wire is fixed:
/// `action`, `chainID`, `contractAddress`, then `orgPublicKey` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectMessage {
    pub action: String,
    #[serde(rename = "chainID")]
    pub chain_id: String,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(
        rename = "orgPublicKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub org_public_key: Option<String>,
}

impl ConnectMessage {
    pub fn new(
        chain_id: impl Into<String>,
        contract_address: impl Into<String>,
        org_public_key: Option<String>,
    ) -> Self {
        Self {
            action: CONNECT_ACTION.to_string(),
            chain_id: chain_id.into(),
            contract_address: contract_address.into(),
            org_public_key,
        }
    }

    /// Compact JSON, base64-encoded. This string is what gets signed.
    pub fn encode(&self) -> String {
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }

    /// Inverse of [`encode`](Self::encode). Rejects payloads whose action is
    /// not `connect`.
    pub fn decode(message: &str) -> Result<Self, MessageError> {
        let raw = STANDARD.decode(message.trim())?;
        let parsed: Self = serde_json::from_slice(&raw)?;
        if parsed.action != CONNECT_ACTION {
            return Err(MessageError::Action(parsed.action));
        }
        Ok(parsed)
    }
}
