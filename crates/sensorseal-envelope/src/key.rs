use std::fmt;

use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::EnvelopeError;

/// 32-byte AES-256-GCM key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey([u8; 32]);

impl EnvelopeKey {
    /// Required key length in bytes.
    pub const LEN: usize = 32;

    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decodes a standard-alphabet base64 key (the `DATA_ENC_KEY_B64` format).
    pub fn from_base64(encoded: &str) -> Result<Self, EnvelopeError> {
        let mut bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EnvelopeError::InvalidKey(format!("not base64: {e}")))?;
        let key = Self::try_from(bytes.as_slice());
        bytes.zeroize();
        key
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<&[u8]> for EnvelopeKey {
    type Error = EnvelopeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            EnvelopeError::InvalidKey(format!(
                "must be {} bytes (got {})",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}
