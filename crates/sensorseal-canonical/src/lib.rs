//! Canonical data model primitives for Sensorseal checkpoints.
//!
//! Every byte that participates in a checkpoint commitment is produced here:
//! the canonical encoding of a [`Reading`], its keccak-256 leaf, and the
//! Merkle root over an ordered batch of leaves. Nothing in this crate performs
//! I/O; all functions are deterministic.
//!
#![deny(missing_docs)]

/// Fixed-length digests.
pub mod digest;
/// Opaque identifiers handed out by collaborators.
pub mod identifiers;
/// Binary Merkle accumulator over ordered leaves.
pub mod merkle;
/// Sensor readings and their canonical leaf encoding.
pub mod reading;
/// Validation errors shared by canonical types.
pub mod validation;

pub use digest::Hash32;
pub use identifiers::ContentIdentifier;
pub use merkle::{build_root, combine, MerkleError};
pub use reading::{encode, leaf_hash, parse_readings, Reading, ReadingError};
pub use validation::ValidationError;
