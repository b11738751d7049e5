//! Outcome of a run, one entry per batch.
//!
//! Wire shape:
//!
//! ```json
//! {"total": 5, "chunkSize": 2, "batches": 3, "elapsedMs": 812,
//!  "results": [{"batch": 1, "count": 2, "contentIdentifier": "...",
//!               "merkleRoot": "<hex>", "signature": "<base58>"},
//!              {"batch": 2, "count": 2, "merkleRoot": "<hex>",
//!               "error": {"stage": "pin", "message": "..."}}]}
//! ```
//!
//! `batch` on the wire is 1-based; [`BatchResult::batch_index`] is 0-based.

use std::time::Duration;

use sensorseal_canonical::{ContentIdentifier, Hash32};
use sensorseal_ledger::TxSignature;
use serde::{Deserialize, Serialize, Serializer};

/// Step of the per-batch flow that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Leaf hashing and root computation.
    Root,
    /// Envelope encryption.
    Seal,
    /// Upload to the content store.
    Pin,
    /// Ledger commit.
    Commit,
}

/// Why a batch did not commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Failing step.
    pub stage: Stage,
    /// Error text from that step.
    pub message: String,
}

impl BatchFailure {
    /// Failure at `stage` described by `error`.
    pub fn new(stage: Stage, error: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: error.to_string(),
        }
    }
}

/// Outcome of one batch.
///
/// Root and identifier are kept even when a later step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    /// 0-based position of the batch.
    pub batch_index: usize,
    /// Readings in the batch.
    pub count: usize,
    /// Identifier of the pinned envelope, if pinning succeeded.
    pub content_identifier: Option<ContentIdentifier>,
    /// Root over the batch, if it was computed.
    pub merkle_root: Option<Hash32>,
    /// Commit signature, or the failure that stopped the batch.
    pub outcome: Result<TxSignature, BatchFailure>,
}

impl BatchResult {
    /// Whether the batch committed.
    pub fn is_committed(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Commit signature, when committed.
    pub fn signature(&self) -> Option<&TxSignature> {
        self.outcome.as_ref().ok()
    }

    /// Failure, when not committed.
    pub fn error(&self) -> Option<&BatchFailure> {
        self.outcome.as_ref().err()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchResultWire<'a> {
    batch: usize,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_identifier: Option<&'a ContentIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merkle_root: Option<&'a Hash32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<&'a TxSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a BatchFailure>,
}

impl Serialize for BatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BatchResultWire {
            batch: self.batch_index + 1,
            count: self.count,
            content_identifier: self.content_identifier.as_ref(),
            merkle_root: self.merkle_root.as_ref(),
            signature: self.signature(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// Terminal report of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Readings submitted.
    pub total: usize,
    /// Chunk size used.
    pub chunk_size: usize,
    /// One entry per batch, in batch order.
    pub results: Vec<BatchResult>,
    /// Wall time of the batch loop.
    pub elapsed: Duration,
}

impl RunResult {
    /// Number of batches attempted.
    pub fn batches(&self) -> usize {
        self.results.len()
    }

    /// Batches that committed.
    pub fn committed(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.iter().filter(|r| r.is_committed())
    }

    /// Batches that failed.
    pub fn failed(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.iter().filter(|r| !r.is_committed())
    }

    /// True when every batch committed.
    pub fn all_committed(&self) -> bool {
        self.results.iter().all(BatchResult::is_committed)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResultWire<'a> {
    total: usize,
    chunk_size: usize,
    batches: usize,
    elapsed_ms: u64,
    results: &'a [BatchResult],
}

impl Serialize for RunResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RunResultWire {
            total: self.total,
            chunk_size: self.chunk_size,
            batches: self.batches(),
            elapsed_ms: u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
            results: &self.results,
        }
        .serialize(serializer)
    }
}
