//! Loader state machine and the snapshot published to observers.

use super::{DecodedImage, ResourceKey};

/// State of a single loader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing requested, or the last fetch was cancelled.
    #[default]
    Idle,
    /// A network fetch for `key` is in flight.
    Loading {
        /// Requested image.
        key: ResourceKey,
    },
    /// `key` was decoded and published.
    Loaded {
        /// Requested image.
        key: ResourceKey,
        /// Decoded result.
        image: DecodedImage,
    },
    /// Fetching or decoding `key` failed.
    Failed {
        /// Requested image.
        key: ResourceKey,
    },
}

impl LoadState {
    /// Returns the key this state refers to, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&ResourceKey> {
        match self {
            Self::Idle => None,
            Self::Loading { key } | Self::Loaded { key, .. } | Self::Failed { key } => Some(key),
        }
    }

    /// Returns true while a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Returns the decoded image for `Loaded`.
    #[must_use]
    pub const fn image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Loaded { image, .. } => Some(image),
            _ => None,
        }
    }

    /// Returns true if `key` is already loading or loaded, making a new
    /// request for it redundant.
    #[must_use]
    pub fn is_current_for(&self, key: &ResourceKey) -> bool {
        match self {
            Self::Loading { key: current } | Self::Loaded { key: current, .. } => current == key,
            Self::Idle | Self::Failed { .. } => false,
        }
    }
}

/// Observable pair published by a loader on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoaderSnapshot {
    /// Latest published image, or none.
    pub image: Option<DecodedImage>,
    /// True between fetch start and fetch completion or cancellation.
    pub is_loading: bool,
}
