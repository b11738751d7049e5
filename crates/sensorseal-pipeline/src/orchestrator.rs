//! Splits readings into batches and drives each one through
//! root → seal → pin → commit.

use std::slice::Chunks;
use std::time::Instant;

use sensorseal_canonical::{build_root, leaf_hash, ContentIdentifier, Hash32, MerkleError, Reading};
use sensorseal_envelope::{seal, EnvelopeKey};
use sensorseal_ledger::{CheckpointCommitter, CheckpointRefs, Ledger, Pubkey, Signer, TxSignature};
use sensorseal_store::ContentStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::request::{BatchRefs, RunRequest};
use crate::result::{BatchFailure, BatchResult, RunResult, Stage};

/// Chunk size used when the caller gives none.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Plaintext sealed into each batch envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    /// 0-based batch position.
    pub batch_index: usize,
    /// Number of readings.
    pub count: usize,
    /// The batch, in input order.
    pub readings: Vec<Reading>,
}

impl BatchPayload {
    /// Name the envelope is pinned under.
    pub fn pin_name(&self) -> String {
        format!("batch-{}.enc.json", self.batch_index)
    }
}

/// Ordered, contiguous batches of at most `chunk_size` readings.
pub fn partition(readings: &[Reading], chunk_size: usize) -> Result<Chunks<'_, Reading>, PipelineError> {
    if readings.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    if chunk_size == 0 {
        return Err(PipelineError::InvalidChunkSize);
    }
    Ok(readings.chunks(chunk_size))
}

/// Merkle root over the leaves of one batch.
pub fn batch_root(batch: &[Reading]) -> Result<Hash32, MerkleError> {
    let leaves: Vec<Hash32> = batch.iter().map(leaf_hash).collect();
    build_root(&leaves)
}

/// Runs batches against a content store and a ledger.
///
/// Holds only read-only state, so one orchestrator can serve concurrent runs.
/// Within a run, batches are processed strictly in order.
pub struct BatchOrchestrator<S, L> {
    key: EnvelopeKey,
    committer: CheckpointCommitter,
    store: S,
    ledger: L,
}

struct BatchProgress {
    merkle_root: Option<Hash32>,
    content_identifier: Option<ContentIdentifier>,
}

impl<S, L> BatchOrchestrator<S, L>
where
    S: ContentStore,
    L: Ledger,
{
    /// Orchestrator sealing under `key` and committing to `program_id`.
    pub fn new(key: EnvelopeKey, program_id: Pubkey, store: S, ledger: L) -> Self {
        Self {
            key,
            committer: CheckpointCommitter::new(program_id),
            store,
            ledger,
        }
    }

    /// Content store in use.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ledger in use.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Decodes a caller request and runs it.
    pub async fn run_request(
        &self,
        request: &RunRequest,
        signer: &Signer,
    ) -> Result<RunResult, PipelineError> {
        let readings = request.readings()?;
        let chunk_size = request.chunk_size()?;
        self.run(&readings, chunk_size, &request.refs, signer).await
    }

    /// Processes every batch and reports each outcome.
    ///
    /// Input defects fail the whole call before any batch starts. After that
    /// the call always succeeds; batch failures are recorded in the result.
    pub async fn run(
        &self,
        readings: &[Reading],
        chunk_size: usize,
        refs: &BatchRefs,
        signer: &Signer,
    ) -> Result<RunResult, PipelineError> {
        let batches = partition(readings, chunk_size)?;
        let refs = refs.resolve()?;

        info!(
            total = readings.len(),
            chunk_size,
            batches = batches.len(),
            authority = %signer.pubkey(),
            "starting run"
        );

        let started = Instant::now();
        let mut results = Vec::with_capacity(batches.len());
        for (batch_index, batch) in batches.enumerate() {
            let result = self.process_batch(batch_index, batch, &refs, signer).await;
            match &result.outcome {
                Ok(signature) => info!(
                    batch = batch_index,
                    count = result.count,
                    %signature,
                    "batch committed"
                ),
                Err(failure) => warn!(
                    batch = batch_index,
                    count = result.count,
                    stage = ?failure.stage,
                    error = %failure.message,
                    "batch failed"
                ),
            }
            results.push(result);
        }

        let run = RunResult {
            total: readings.len(),
            chunk_size,
            results,
            elapsed: started.elapsed(),
        };
        info!(
            committed = run.committed().count(),
            failed = run.failed().count(),
            elapsed_ms = run.elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(run)
    }

    async fn process_batch(
        &self,
        batch_index: usize,
        batch: &[Reading],
        refs: &CheckpointRefs,
        signer: &Signer,
    ) -> BatchResult {
        let mut progress = BatchProgress {
            merkle_root: None,
            content_identifier: None,
        };
        let outcome = self
            .advance(batch_index, batch, refs, signer, &mut progress)
            .await;
        BatchResult {
            batch_index,
            count: batch.len(),
            content_identifier: progress.content_identifier,
            merkle_root: progress.merkle_root,
            outcome,
        }
    }

    async fn advance(
        &self,
        batch_index: usize,
        batch: &[Reading],
        refs: &CheckpointRefs,
        signer: &Signer,
        progress: &mut BatchProgress,
    ) -> Result<TxSignature, BatchFailure> {
        let root = batch_root(batch).map_err(|e| BatchFailure::new(Stage::Root, e))?;
        progress.merkle_root = Some(root);
        debug!(batch = batch_index, root = %root, "computed root");

        let payload = BatchPayload {
            batch_index,
            count: batch.len(),
            readings: batch.to_vec(),
        };
        let sealed = seal(&payload, &self.key)
            .and_then(|envelope| envelope.to_vec())
            .map_err(|e| BatchFailure::new(Stage::Seal, e))?;
        debug!(batch = batch_index, size = sealed.len(), "sealed batch");

        let cid = self
            .store
            .pin(sealed, &payload.pin_name())
            .await
            .map_err(|e| BatchFailure::new(Stage::Pin, e))?;
        progress.content_identifier = Some(cid.clone());
        debug!(batch = batch_index, %cid, "pinned envelope");

        self.committer
            .commit(&self.ledger, &root, &cid, refs, signer)
            .await
            .map_err(|e| BatchFailure::new(Stage::Commit, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(n: u64) -> Vec<Reading> {
        (0..n)
            .map(|i| Reading {
                device_id: None,
                ts: 1_700_000_000 + i,
                t_c_x100: 2500,
                rh_x100: 5000,
                p_pa: 100_000,
                gas: 150,
            })
            .collect()
    }

    #[test]
    fn five_readings_in_twos_make_three_batches() {
        let input = readings(5);
        let sizes: Vec<usize> = partition(&input, 2).unwrap().map(<[Reading]>::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn partition_reproduces_input_in_order() {
        let input = readings(17);
        for chunk_size in 1..=20 {
            let batches: Vec<&[Reading]> = partition(&input, chunk_size).unwrap().collect();
            assert_eq!(batches.len(), input.len().div_ceil(chunk_size));
            assert!(batches[..batches.len() - 1]
                .iter()
                .all(|b| b.len() == chunk_size));
            assert_eq!(batches.concat(), input);
        }
    }

    #[test]
    fn partition_rejects_bad_input() {
        assert!(matches!(partition(&[], 4), Err(PipelineError::EmptyInput)));
        assert!(matches!(
            partition(&readings(3), 0),
            Err(PipelineError::InvalidChunkSize)
        ));
    }

    #[test]
    fn pin_name_uses_zero_based_index() {
        let payload = BatchPayload {
            batch_index: 0,
            count: 0,
            readings: Vec::new(),
        };
        assert_eq!(payload.pin_name(), "batch-0.enc.json");
    }
}
