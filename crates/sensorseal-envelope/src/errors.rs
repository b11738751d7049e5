use thiserror::Error;

/// Errors that can occur while sealing or opening an envelope.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// Key material is absent, undecodable, or not 32 bytes.
    #[error("invalid envelope key: {0}")]
    InvalidKey(String),
    /// The authentication tag did not verify (tampering or wrong key).
    #[error("envelope authentication failed")]
    AuthenticationFailed,
    /// The envelope names an algorithm this reader does not implement.
    #[error("unsupported envelope algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    /// The envelope was written by a newer format version.
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),
    /// A field could not be decoded (bad base64, wrong nonce or tag length).
    #[error("malformed envelope: {0}")]
    Malformed(String),
    /// Payload or container (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
