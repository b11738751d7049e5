//! Authenticated-encryption envelopes for batch payloads.
//!
//! A batch is serialized to JSON and sealed with AES-256-GCM under a single
//! process-wide key. The resulting [`EncryptedEnvelope`] carries its own
//! version and algorithm tag so a reader can tell which scheme produced it:
//!
//! ```json
//! {"__type":"enc+json","v":1,"alg":"AES-256-GCM","iv_b64":"...","tag_b64":"...","ct_b64":"..."}
//! ```
//!
//! Every call to [`seal`] draws a fresh 12-byte nonce from the OS RNG.

#![deny(missing_docs)]

/// Envelope container and the seal/open operations.
pub mod envelope;
/// Error types for envelope operations.
pub mod errors;
/// Symmetric key material.
pub mod key;

pub use envelope::{open, seal, EncryptedEnvelope, ALGORITHM, ENVELOPE_KIND, ENVELOPE_VERSION};
pub use errors::EnvelopeError;
pub use key::EnvelopeKey;
