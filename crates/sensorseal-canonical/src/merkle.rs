//! Binary Merkle accumulator with sorted sibling pairs.
//!
//! Each level hashes adjacent pairs after ordering the two siblings
//! byte-lexicographically, so `combine(a, b) == combine(b, a)`. A trailing odd
//! node is carried up unchanged. The position of a leaf in the input still
//! determines which sibling it is paired with, so leaf order matters.

use thiserror::Error;

use crate::digest::Hash32;

/// Errors raised while accumulating a root.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    /// No leaves were supplied.
    #[error("cannot build a Merkle root over an empty batch")]
    EmptyBatch,
}

/// Hashes one sibling pair in canonical order.
pub fn combine(a: &Hash32, b: &Hash32) -> Hash32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    Hash32::keccak(&[lo.as_bytes(), hi.as_bytes()])
}

/// Computes the root over an ordered, non-empty leaf sequence.
pub fn build_root(leaves: &[Hash32]) -> Result<Hash32, MerkleError> {
    let mut level: Vec<Hash32> = match leaves {
        [] => return Err(MerkleError::EmptyBatch),
        [single] => return Ok(*single),
        _ => leaves.to_vec(),
    };

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => combine(left, right),
                [odd] => *odd,
                _ => unreachable!("chunks(2) yields one or two nodes"),
            })
            .collect();
    }

    // The loop only exits with exactly one node left.
    Ok(level[0])
}
