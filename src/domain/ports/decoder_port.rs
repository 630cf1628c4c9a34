//! Port definition for turning fetched bytes into an image.

use crate::domain::entities::DecodedImage;
use crate::domain::errors::LoadError;

/// Port for image decoding.
///
/// Decoding is CPU bound; callers run it on a blocking thread, never on the
/// task that publishes results.
#[cfg_attr(test, mockall::automock)]
pub trait ImageDecoder: Send + Sync {
    /// Decodes raw bytes.
    ///
    /// # Errors
    /// Returns `LoadError::Decode` if the bytes are not a supported image.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError>;
}
