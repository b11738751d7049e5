use sensorseal_canonical::{MerkleError, ReadingError};
use sensorseal_envelope::EnvelopeError;
use sensorseal_ledger::{LedgerError, TxSignature};
use sensorseal_store::StoreError;
use thiserror::Error;

/// Errors that stop a run or a verification outright.
///
/// Per-batch failures during a run are not reported here; they are recorded
/// in the batch's [`crate::BatchResult`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No readings were supplied.
    #[error("readings must be a non-empty array")]
    EmptyInput,
    /// Chunk size was zero.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// A device or checkpoint reference was missing or blank.
    #[error("{0} is required")]
    MissingReference(&'static str),
    /// A reference was present but not a valid account address.
    #[error("invalid {field}: {source}")]
    InvalidReference {
        /// Which reference.
        field: &'static str,
        /// Decoding failure.
        source: LedgerError,
    },
    /// A reading failed validation.
    #[error(transparent)]
    InvalidReading(#[from] ReadingError),
    /// Root computation failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),
    /// Envelope key missing or unusable, or an envelope failed to open.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// Signer resolution or a ledger call failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Content store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The transaction holds no successful commit to the program.
    #[error("no checkpoint commit found in transaction {0}")]
    CommitNotFound(TxSignature),
    /// The commit has no `CID:` memo to fetch the batch from.
    #[error("commit transaction {0} carries no content identifier memo")]
    MissingContentIdentifier(TxSignature),
    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
    /// Request or payload JSON could not be decoded.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
