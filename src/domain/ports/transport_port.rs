//! Port definition for fetching image bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::ResourceKey;
use crate::domain::errors::LoadError;

/// Port for acquiring the raw bytes behind a key.
#[async_trait]
pub trait ImageTransport: Send + Sync {
    /// Fetches the full body for `key`.
    ///
    /// # Errors
    /// Returns `LoadError::Network` or `LoadError::HttpStatus` on failure.
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, LoadError>;
}
