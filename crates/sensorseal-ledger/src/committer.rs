//! Builds, signs and submits one checkpoint commit, and reads one back.

use sensorseal_canonical::{ContentIdentifier, Hash32};
use tracing::{debug, info};

use crate::credential::Signer;
use crate::errors::LedgerError;
use crate::instruction::{
    commit_checkpoint, discriminator, initialize_device, memo, DeviceAccounts, ThresholdConfig,
    COMMIT_CHECKPOINT, MEMO_PREFIX, MEMO_PROGRAM_ID,
};
use crate::ledger::{FetchedTransaction, Ledger};
use crate::pubkey::{Blockhash, Pubkey, TxSignature};
use crate::transaction::{Message, Transaction};

/// Ledger accounts a commit writes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointRefs {
    /// Device registration account (read-only).
    pub device: Pubkey,
    /// Checkpoint account the root is written to.
    pub checkpoint: Pubkey,
}

impl CheckpointRefs {
    /// Parses both references from base58.
    pub fn parse(device: &str, checkpoint: &str) -> Result<Self, LedgerError> {
        Ok(Self {
            device: device.parse()?,
            checkpoint: checkpoint.parse()?,
        })
    }
}

/// A checkpoint commit recovered from a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedCheckpoint {
    /// Root carried in the commit instruction.
    pub merkle_root: Hash32,
    /// Identifier from the memo, when one is present.
    pub content_identifier: Option<ContentIdentifier>,
    /// Device account of the commit.
    pub device: Pubkey,
    /// Checkpoint account of the commit.
    pub checkpoint: Pubkey,
    /// Signing authority.
    pub authority: Pubkey,
}

/// Commits Merkle roots to a checkpoint program.
#[derive(Debug, Clone)]
pub struct CheckpointCommitter {
    program_id: Pubkey,
}

impl CheckpointCommitter {
    /// Committer for the program at `program_id`.
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    /// Target program.
    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Builds and signs `[memo("CID:"+cid), commit_checkpoint(root)]`.
    ///
    /// The signer is both authority and fee payer.
    pub fn build_transaction(
        &self,
        root: &Hash32,
        cid: &ContentIdentifier,
        refs: &CheckpointRefs,
        signer: &Signer,
        recent_blockhash: Blockhash,
    ) -> Result<Transaction, LedgerError> {
        let authority = signer.pubkey();
        let instructions = [
            memo(cid),
            commit_checkpoint(
                self.program_id,
                refs.device,
                refs.checkpoint,
                authority,
                root,
            ),
        ];
        let message = Message::compile(&authority, &instructions, recent_blockhash)?;
        Transaction::sign(message, &[signer.signing_key()])
    }

    /// Submits one commit and waits for the ledger to confirm it.
    ///
    /// Exactly one transaction is sent; a failure is returned as-is and never
    /// retried here.
    pub async fn commit<L>(
        &self,
        ledger: &L,
        root: &Hash32,
        cid: &ContentIdentifier,
        refs: &CheckpointRefs,
        signer: &Signer,
    ) -> Result<TxSignature, LedgerError>
    where
        L: Ledger + ?Sized,
    {
        let blockhash = ledger.latest_blockhash().await?;
        let tx = self.build_transaction(root, cid, refs, signer, blockhash)?;
        debug!(
            root = %root,
            %cid,
            checkpoint = %refs.checkpoint,
            %blockhash,
            "submitting checkpoint commit"
        );

        let signature = ledger.submit_transaction(tx.to_wire()?).await?;
        info!(%signature, root = %root, "checkpoint committed");
        Ok(signature)
    }

    /// Builds and signs `initialize_device(cfg)` for the signer's device accounts.
    pub fn build_initialize_transaction(
        &self,
        accounts: &DeviceAccounts,
        cfg: &ThresholdConfig,
        signer: &Signer,
        recent_blockhash: Blockhash,
    ) -> Result<Transaction, LedgerError> {
        let instruction = initialize_device(self.program_id, accounts, cfg);
        let message = Message::compile(&accounts.authority, &[instruction], recent_blockhash)?;
        Transaction::sign(message, &[signer.signing_key()])
    }

    /// Registers the signer's device with `cfg` and waits for confirmation.
    ///
    /// Returns the derived accounts; their `checkpoint` is the account later
    /// commits write to.
    pub async fn initialize_device<L>(
        &self,
        ledger: &L,
        signer: &Signer,
        cfg: &ThresholdConfig,
    ) -> Result<(DeviceAccounts, TxSignature), LedgerError>
    where
        L: Ledger + ?Sized,
    {
        let accounts = DeviceAccounts::derive(&self.program_id, &signer.pubkey())?;
        let blockhash = ledger.latest_blockhash().await?;
        let tx = self.build_initialize_transaction(&accounts, cfg, signer, blockhash)?;
        debug!(
            device = %accounts.device,
            checkpoint = %accounts.checkpoint,
            %blockhash,
            "submitting device registration"
        );

        let signature = ledger.submit_transaction(tx.to_wire()?).await?;
        info!(%signature, device = %accounts.device, "device registered");
        Ok((accounts, signature))
    }
}

/// Finds the `commit_checkpoint` call for `program_id` in a fetched transaction.
///
/// Returns `None` if no instruction carries the commit discriminator and a
/// 32-byte root.
pub fn find_commitment(tx: &FetchedTransaction, program_id: &Pubkey) -> Option<CommittedCheckpoint> {
    let tag = discriminator(COMMIT_CHECKPOINT);

    let commit = tx.instructions.iter().find(|ix| {
        tx.account(ix.program_id_index) == Some(program_id)
            && ix.data.len() == tag.len() + Hash32::LEN
            && ix.data[..tag.len()] == tag
    })?;
    let merkle_root = Hash32::try_from(&commit.data[tag.len()..]).ok()?;
    let account = |pos: usize| commit.accounts.get(pos).and_then(|i| tx.account(*i)).copied();

    let content_identifier = tx
        .instructions
        .iter()
        .filter(|ix| tx.account(ix.program_id_index) == Some(&MEMO_PROGRAM_ID))
        .filter_map(|ix| std::str::from_utf8(&ix.data).ok())
        .filter_map(|text| text.strip_prefix(MEMO_PREFIX))
        .find_map(|cid| ContentIdentifier::parse(cid).ok());

    Some(CommittedCheckpoint {
        merkle_root,
        content_identifier,
        device: account(0)?,
        checkpoint: account(1)?,
        authority: account(2)?,
    })
}
