//! Envelope container and the seal/open operations.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::EnvelopeError;
use crate::key::EnvelopeKey;

/// Container type marker written to `__type`.
pub const ENVELOPE_KIND: &str = "enc+json";
/// Current envelope schema version.
pub const ENVELOPE_VERSION: u32 = 1;
/// Algorithm tag for AES-256-GCM envelopes.
pub const ALGORITHM: &str = "AES-256-GCM";

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Sealed payload plus everything a key holder needs to open it.
///
/// Fields are only readable; an envelope is never modified after [`seal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "__type", default = "default_kind")]
    kind: String,
    v: u32,
    alg: String,
    iv_b64: String,
    tag_b64: String,
    ct_b64: String,
}

fn default_kind() -> String {
    ENVELOPE_KIND.to_owned()
}

impl EncryptedEnvelope {
    /// Schema version.
    pub fn version(&self) -> u32 {
        self.v
    }

    /// Algorithm tag.
    pub fn algorithm(&self) -> &str {
        &self.alg
    }

    /// Base64 nonce.
    pub fn nonce_b64(&self) -> &str {
        &self.iv_b64
    }

    /// Serializes the container to the JSON bytes that get pinned.
    pub fn to_vec(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a container previously produced by [`EncryptedEnvelope::to_vec`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Serializes `payload` to JSON and seals it under `key` with a fresh nonce.
pub fn seal<T>(payload: &T, key: &EnvelopeKey) -> Result<EncryptedEnvelope, EnvelopeError>
where
    T: Serialize + ?Sized,
{
    let plaintext = serde_json::to_vec(payload)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    // aes-gcm appends the tag to the ciphertext
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| EnvelopeError::Malformed("encryption failed".to_owned()))?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(EncryptedEnvelope {
        kind: default_kind(),
        v: ENVELOPE_VERSION,
        alg: ALGORITHM.to_owned(),
        iv_b64: STANDARD.encode(nonce),
        tag_b64: STANDARD.encode(tag),
        ct_b64: STANDARD.encode(sealed),
    })
}

/// Verifies and decrypts an envelope, then deserializes the JSON payload.
pub fn open<T>(envelope: &EncryptedEnvelope, key: &EnvelopeKey) -> Result<T, EnvelopeError>
where
    T: DeserializeOwned,
{
    if envelope.alg != ALGORITHM {
        return Err(EnvelopeError::UnsupportedAlgorithm(envelope.alg.clone()));
    }
    if envelope.v > ENVELOPE_VERSION {
        return Err(EnvelopeError::UnsupportedVersion(envelope.v));
    }

    let nonce = decode_field("iv_b64", &envelope.iv_b64, Some(NONCE_LEN))?;
    let tag = decode_field("tag_b64", &envelope.tag_b64, Some(TAG_LEN))?;
    let mut sealed = decode_field("ct_b64", &envelope.ct_b64, None)?;
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| EnvelopeError::InvalidKey(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
        .map_err(|_| EnvelopeError::AuthenticationFailed)?;

    Ok(serde_json::from_slice(&plaintext)?)
}

fn decode_field(
    name: &str,
    value: &str,
    expected_len: Option<usize>,
) -> Result<Vec<u8>, EnvelopeError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|e| EnvelopeError::Malformed(format!("{name}: {e}")))?;
    match expected_len {
        Some(len) if bytes.len() != len => Err(EnvelopeError::Malformed(format!(
            "{name} must be {len} bytes (got {})",
            bytes.len()
        ))),
        _ => Ok(bytes),
    }
}
