use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// When a value is not valid hex.
    #[error("{field} ('{value}') is not valid hex")]
    InvalidHex {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a decoded value has the wrong length.
    #[error("{field} must be {expected} bytes (got {actual})")]
    InvalidLength {
        /// Field name that failed validation.
        field: &'static str,
        /// Required byte length.
        expected: usize,
        /// Observed byte length.
        actual: usize,
    },
    /// When a value contains characters it must not carry.
    #[error("{field} ('{value}') is malformed")]
    Malformed {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a required value is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Field name that is empty.
        field: &'static str,
    },
}
