//! Port definition for image caching.

use crate::domain::entities::{DecodedImage, ResourceKey};

/// Port for decoded image caching.
/// Implementations must be thread-safe; loaders call into one cache from
/// many tasks without any external locking.
///
/// Absence is never an error: a key that is not cached simply returns `None`.
/// Every present entry is a successfully decoded image.
pub trait ImageCachePort: Send + Sync {
    /// Attempts to get an image from the cache.
    fn get(&self, key: &ResourceKey) -> Option<DecodedImage>;

    /// Stores an image, overwriting any previous entry for `key`.
    /// May evict other entries.
    fn set(&self, key: ResourceKey, image: DecodedImage);

    /// Removes an image from the cache, returning it if present.
    fn remove(&self, key: &ResourceKey) -> Option<DecodedImage>;

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    fn clear(&self);
}
