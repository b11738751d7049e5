//! Ledger side of a Sensorseal checkpoint.
//!
//! This crate provides:
//! - Base58 key, hash and signature newtypes
//! - The legacy transaction wire format (compact-u16 lists, compiled instructions)
//! - Memo, `commit_checkpoint` and `initialize_device` instruction builders
//! - Program-derived addresses for a device's accounts
//! - Signer credential resolution with ordered fallbacks
//! - The [`Ledger`] contract and a JSON-RPC implementation
//! - [`CheckpointCommitter`], which ties the above together for one batch
//!
//! Core invariants:
//! - The commit instruction data is exactly `discriminator(8) || merkle_root(32)`
//! - Commit accounts are `device (ro)`, `checkpoint (w)`, `authority (signer)`, in that order
//! - A commit is submitted once; retries are new transactions
//! - Derived addresses lie off the ed25519 curve; the highest such bump wins
//!
#![deny(missing_docs)]

/// Checkpoint commit orchestration and on-ledger commitment extraction.
pub mod committer;
/// Signer credential decoding.
pub mod credential;
/// Error types for ledger operations.
pub mod errors;
/// Instruction builders and discriminators.
pub mod instruction;
/// Ledger contract and fetched transaction view.
pub mod ledger;
/// Base58 fixed-width byte newtypes.
pub mod pubkey;
/// JSON-RPC ledger client.
pub mod rpc;
/// Transaction and message wire codec.
pub mod transaction;

pub use committer::{find_commitment, CheckpointCommitter, CheckpointRefs, CommittedCheckpoint};
pub use credential::{resolve_signer, CredentialSource, KeyFallback, Signer, SignerSources};
pub use errors::LedgerError;
pub use instruction::{
    commit_checkpoint, create_program_address, discriminator, find_program_address,
    initialize_device, memo, AccountMeta, DeviceAccounts, Instruction, ThresholdConfig,
    COMMIT_CHECKPOINT, INITIALIZE_DEVICE, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};
pub use ledger::{Commitment, FetchedTransaction, Ledger};
pub use pubkey::{Blockhash, Pubkey, TxSignature};
pub use rpc::{RpcConfig, RpcLedger};
pub use transaction::{CompiledInstruction, Message, MessageHeader, Transaction};
