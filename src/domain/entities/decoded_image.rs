//! Decoded in-memory image handle.

use std::sync::Arc;

/// Shared handle to a decoded image.
///
/// Cloning is cheap. Two handles compare equal only when they point at the
/// same decoded allocation, so a cached entry and a published one can be
/// checked for identity.
#[derive(Clone)]
pub struct DecodedImage(Arc<image::DynamicImage>);

impl DecodedImage {
    /// Wraps a decoded image.
    #[must_use]
    pub fn new(image: image::DynamicImage) -> Self {
        Self(Arc::new(image))
    }

    /// Returns the decoded pixels.
    #[must_use]
    pub fn image(&self) -> &image::DynamicImage {
        &self.0
    }

    /// Returns the shared pointer to the decoded pixels.
    #[must_use]
    pub fn as_arc(&self) -> &Arc<image::DynamicImage> {
        &self.0
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Memory cost of the decoded pixel buffer in bytes.
    #[must_use]
    pub fn cost(&self) -> usize {
        self.0.as_bytes().len()
    }
}

impl From<image::DynamicImage> for DecodedImage {
    fn from(image: image::DynamicImage) -> Self {
        Self::new(image)
    }
}

impl PartialEq for DecodedImage {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DecodedImage {}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("cost", &self.cost())
            .finish()
    }
}
