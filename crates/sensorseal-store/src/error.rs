//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or answered with a non-success status.
    #[error("content store unavailable: {reason}")]
    Unavailable {
        /// HTTP status, when the store answered at all.
        status: Option<u16>,
        /// Transport error or response body.
        reason: String,
    },
    /// The bytes handed to the store are not a JSON document.
    #[error("content is not valid JSON: {0}")]
    InvalidContent(#[from] serde_json::Error),
    /// The store answered 2xx but without a usable identifier.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Unavailable {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}
