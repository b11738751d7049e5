use std::time::Duration;

use thiserror::Error;

use crate::pubkey::TxSignature;

/// Errors that can occur while building, signing or submitting a commit.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No signer credential is configured.
    #[error("no signer credential configured (set SOLANA_SECRET_BASE58, SOLANA_SECRET_KEY or SOLANA_SECRET_SEED)")]
    MissingSigner,
    /// A credential is configured but does not decode to a usable key.
    #[error("invalid signer credential: {0}")]
    InvalidSigner(String),
    /// A base58 account, hash or signature failed to decode.
    #[error("invalid {field} '{value}'")]
    InvalidPubkey {
        /// What was being decoded.
        field: &'static str,
        /// Offending text.
        value: String,
    },
    /// The ledger refused the transaction or it failed on execution.
    #[error("commit rejected: {0}")]
    CommitRejected(String),
    /// The transaction was sent but not confirmed before the deadline.
    #[error("transaction {signature} not confirmed after {waited:?}")]
    CommitTimeout {
        /// Signature of the unconfirmed transaction.
        signature: TxSignature,
        /// How long confirmation was awaited.
        waited: Duration,
    },
    /// The ledger endpoint could not be reached.
    #[error("ledger transport error: {0}")]
    Transport(String),
    /// The ledger answered with something unexpected.
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
    /// Seeds cannot produce a program-derived address.
    #[error("invalid address seeds: {0}")]
    InvalidSeeds(String),
    /// A transaction could not be encoded or decoded.
    #[error("transaction encoding error: {0}")]
    Encoding(String),
}
