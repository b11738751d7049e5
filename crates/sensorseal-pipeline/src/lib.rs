//! Batched, Merkle-anchored checkpoint pipeline for Sensorseal.
//!
//! This crate provides:
//! - Process configuration loaded once from the environment
//! - The run request accepted from callers
//! - [`BatchOrchestrator`], which drives root → seal → pin → commit per batch
//! - [`RunResult`], the per-batch outcome report
//! - Offline and on-ledger checkpoint verification
//!
//! Core invariants:
//! - Batches partition the input in order, with no overlap and no gaps
//! - Batches run strictly one after another
//! - A failing batch is recorded and never aborts the run
//! - Input and configuration defects abort before the first batch
//!
#![deny(missing_docs)]

/// Process configuration.
pub mod config;
/// Error types for pipeline operations.
pub mod errors;
/// Batch partitioning and the per-batch flow.
pub mod orchestrator;
/// Caller-facing run request.
pub mod request;
/// Run and batch outcome types.
pub mod result;
/// Checkpoint verification against the ledger.
pub mod verification;

pub use config::Settings;
pub use errors::PipelineError;
pub use orchestrator::{
    batch_root, partition, BatchOrchestrator, BatchPayload, DEFAULT_CHUNK_SIZE,
};
pub use request::{BatchRefs, RunRequest};
pub use result::{BatchFailure, BatchResult, RunResult, Stage};
pub use verification::{VerificationReport, VerificationVerdict, Verifier};
