//! Store backend trait.

use async_trait::async_trait;
use sensorseal_canonical::ContentIdentifier;

use crate::error::StoreError;

/// Content-addressed store for sealed batches.
///
/// Implementations must be safe to retry: a failed `pin` may be re-issued and
/// may then return a different identifier for equivalent content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Uploads `bytes` under the human-readable `name`.
    async fn pin(&self, bytes: Vec<u8>, name: &str) -> Result<ContentIdentifier, StoreError>;

    /// Retrieves previously pinned bytes.
    async fn fetch(&self, id: &ContentIdentifier) -> Result<Vec<u8>, StoreError>;
}
