//! Content-store contract for Sensorseal ciphertext.
//!
//! The pipeline needs exactly one thing from a store: pin some bytes under a
//! name and get back an opaque [`ContentIdentifier`]. Identifiers are used as
//! pointers only; no assumption is made that equal content yields equal
//! identifiers across retries.
//!
//! [`PinataStore`] is the HTTP implementation (bearer-token JSON pinning plus
//! gateway retrieval).
//!
//! [`ContentIdentifier`]: sensorseal_canonical::ContentIdentifier

#![deny(missing_docs)]

/// Error types for store operations.
pub mod error;
/// Pinata-compatible HTTP store.
pub mod pinata;
/// Store backend trait.
pub mod traits;

pub use error::StoreError;
pub use pinata::{PinataConfig, PinataStore, DEFAULT_GATEWAY_URL, DEFAULT_PIN_URL};
pub use traits::ContentStore;
