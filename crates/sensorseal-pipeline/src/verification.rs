//! Checks a ledger commit against a disclosed batch.
//!
//! The root is recomputed from plaintext readings and compared with the root
//! carried by the commit instruction. Readings come either from the caller
//! or, in fetch mode, from the envelope the commit's memo points at.

use sensorseal_canonical::{Hash32, Reading};
use sensorseal_envelope::{open, EncryptedEnvelope, EnvelopeKey};
use sensorseal_ledger::{
    find_commitment, CommittedCheckpoint, FetchedTransaction, Ledger, Pubkey, TxSignature,
};
use sensorseal_store::ContentStore;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::orchestrator::{batch_root, BatchPayload};

/// Result of comparing a recomputed root with the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationVerdict {
    /// The committed root equals the recomputed one.
    Match,
    /// A commit exists but carries a different root.
    Mismatch,
    /// No successful commit to the program was found.
    NotFound,
}

/// Verdict plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    /// Transaction that was checked.
    pub signature: TxSignature,
    /// Outcome.
    pub verdict: VerificationVerdict,
    /// Root recomputed from the readings.
    pub computed_root: Hash32,
    /// Root found on the ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed_root: Option<Hash32>,
    /// Identifier from the commit memo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_identifier: Option<String>,
    /// Number of readings the root was computed over.
    pub count: usize,
}

/// Verifies commits made to one checkpoint program.
#[derive(Debug, Clone)]
pub struct Verifier {
    program_id: Pubkey,
}

impl Verifier {
    /// Verifier for commits to `program_id`.
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Compares a fetched transaction with `readings` without any I/O.
    ///
    /// Returns the commitment found (if any) and the verdict.
    pub fn check(
        &self,
        signature: TxSignature,
        tx: Option<&FetchedTransaction>,
        readings: &[Reading],
    ) -> Result<VerificationReport, PipelineError> {
        if readings.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let computed_root = batch_root(readings)?;

        let committed = tx
            .filter(|tx| tx.error.is_none())
            .and_then(|tx| find_commitment(tx, &self.program_id));

        let verdict = match &committed {
            None => VerificationVerdict::NotFound,
            Some(c) if c.merkle_root == computed_root => VerificationVerdict::Match,
            Some(_) => VerificationVerdict::Mismatch,
        };

        Ok(VerificationReport {
            signature,
            verdict,
            computed_root,
            committed_root: committed.as_ref().map(|c| c.merkle_root),
            content_identifier: committed
                .and_then(|c| c.content_identifier)
                .map(|cid| cid.to_string()),
            count: readings.len(),
        })
    }

    /// Fetches the transaction and checks it against caller-supplied readings.
    pub async fn verify_checkpoint<L>(
        &self,
        ledger: &L,
        signature: &TxSignature,
        readings: &[Reading],
    ) -> Result<VerificationReport, PipelineError>
    where
        L: Ledger + ?Sized,
    {
        let tx = ledger.fetch_transaction(signature).await?;
        debug!(%signature, found = tx.is_some(), "fetched transaction");
        let report = self.check(*signature, tx.as_ref(), readings)?;
        info!(%signature, verdict = ?report.verdict, "checkpoint verified");
        Ok(report)
    }

    /// Fetches the transaction, then the envelope its memo names, opens it
    /// with `key` and checks the decrypted readings.
    pub async fn verify_fetched<L, S>(
        &self,
        ledger: &L,
        store: &S,
        key: &EnvelopeKey,
        signature: &TxSignature,
    ) -> Result<(BatchPayload, VerificationReport), PipelineError>
    where
        L: Ledger + ?Sized,
        S: ContentStore + ?Sized,
    {
        let tx = ledger.fetch_transaction(signature).await?;
        let commitment: Option<CommittedCheckpoint> = tx
            .as_ref()
            .filter(|tx| tx.error.is_none())
            .and_then(|tx| find_commitment(tx, &self.program_id));
        let Some(commitment) = commitment else {
            return Err(PipelineError::CommitNotFound(*signature));
        };
        let cid = commitment
            .content_identifier
            .ok_or(PipelineError::MissingContentIdentifier(*signature))?;

        let bytes = store.fetch(&cid).await?;
        let envelope = EncryptedEnvelope::from_slice(&bytes)?;
        let payload: BatchPayload = open(&envelope, key)?;
        debug!(%cid, count = payload.readings.len(), "opened batch envelope");

        let report = self.check(*signature, tx.as_ref(), &payload.readings)?;
        info!(%signature, %cid, verdict = ?report.verdict, "checkpoint verified from store");
        Ok((payload, report))
    }
}
