//! The contract the committer and verifier need from a ledger.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::pubkey::{Blockhash, Pubkey, TxSignature};
use crate::transaction::{CompiledInstruction, Transaction};

/// Confirmation level a submission waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node.
    Processed,
    /// Voted on by a supermajority.
    #[default]
    Confirmed,
    /// Rooted.
    Finalized,
}

impl Commitment {
    /// RPC spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    /// Whether a reported `confirmationStatus` satisfies this level.
    pub fn is_reached_by(&self, status: &str) -> bool {
        status.parse::<Commitment>().is_ok_and(|s| s >= *self)
    }
}

impl FromStr for Commitment {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(LedgerError::InvalidResponse(format!(
                "unknown commitment level '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTransaction {
    /// Slot the transaction landed in.
    pub slot: u64,
    /// Signatures, first one is the transaction id.
    pub signatures: Vec<TxSignature>,
    /// Account table of the message.
    pub account_keys: Vec<Pubkey>,
    /// Compiled instructions.
    pub instructions: Vec<CompiledInstruction>,
    /// Execution error reported by the ledger, if any.
    pub error: Option<String>,
}

impl FetchedTransaction {
    /// View of a locally built transaction, as if it landed in `slot`.
    pub fn from_transaction(tx: &Transaction, slot: u64) -> Self {
        Self {
            slot,
            signatures: tx.signatures().to_vec(),
            account_keys: tx.message().account_keys.clone(),
            instructions: tx.message().instructions.clone(),
            error: None,
        }
    }

    /// Resolves an account index to its key.
    pub fn account(&self, index: u8) -> Option<&Pubkey> {
        self.account_keys.get(usize::from(index))
    }
}

/// Operations the checkpoint flow performs against a ledger.
///
/// `submit_transaction` must not return until the transaction reached the
/// implementation's commitment level, or failed.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Recent blockhash to bind a new transaction to.
    async fn latest_blockhash(&self) -> Result<Blockhash, LedgerError>;

    /// Submits a signed wire transaction and waits for confirmation.
    async fn submit_transaction(&self, wire: Vec<u8>) -> Result<TxSignature, LedgerError>;

    /// Reads a transaction back; `None` if the ledger does not know it.
    async fn fetch_transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<FetchedTransaction>, LedgerError>;

    /// Balance of an account in the ledger's smallest unit.
    async fn get_balance(&self, account: &Pubkey) -> Result<u64, LedgerError>;
}
