//! Ethereum personal-message signatures (EIP-191) over secp256k1.

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Errors raised while loading keys, signing, or recovering signers.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The private key is not 32 bytes of hex or is outside the curve order.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// The signature is not 65 bytes of hex or carries a bad `v`.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The input is not a 20-byte hex address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No public key could be recovered from the signature.
    #[error("signer recovery failed: {0}")]
    Recovery(String),
}

/// A secp256k1 key that signs personal messages the way Ethereum wallets do.
pub struct Signer {
    key: SigningKey,
    address: String,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Load a key from hex, with or without a `0x` prefix.
    pub fn from_hex(private_key: &str) -> Result<Self, SignerError> {
        let bytes = decode_hex(private_key)
            .map_err(|e| SignerError::InvalidKey(format!("not hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    /// EIP-55 checksummed address of this key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign `message` as an Ethereum personal message. Returns `0x` followed
    /// by r, s and v (27 or 28) in hex.
    pub fn sign_message(&self, message: &str) -> Result<String, SignerError> {
        let digest = personal_message_hash(message.as_bytes());
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(format!("0x{}", hex::encode(out)))
    }
}

/// Recover the checksummed address that produced `signature` over `message`.
///
/// Accepts `v` as 0/1 or 27/28. High-s signatures are normalized first.
pub fn recover_signer(message: &str, signature: &str) -> Result<String, SignerError> {
    let bytes = decode_hex(signature)
        .map_err(|e| SignerError::InvalidSignature(format!("not hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(SignerError::InvalidSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        other => {
            return Err(SignerError::InvalidSignature(format!(
                "unsupported recovery byte {other}"
            )));
        }
    };
    let mut recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| SignerError::InvalidSignature(format!("bad recovery id {v}")))?;
    let mut sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_hash(message.as_bytes());
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|e| SignerError::Recovery(e.to_string()))?;
    Ok(address_of(&key))
}

/// EIP-55 mixed-case checksum for a 20-byte hex address.
pub fn to_checksum_address(address: &str) -> Result<String, SignerError> {
    let lower = address
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .to_ascii_lowercase();
    if lower.len() != 40 || !lower.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SignerError::InvalidAddress(address.to_string()));
    }

    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// keccak256("\x19Ethereum Signed Message:\n" || len || message)
fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag.
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    let lower = hex::encode(&hash[12..]);
    // Always 40 hex chars here.
    to_checksum_address(&lower).unwrap_or_else(|_| format!("0x{lower}"))
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let raw = raw.trim();
    let raw = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(raw)
}
