//! Decoder backed by the `image` crate.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::domain::entities::DecodedImage;
use crate::domain::errors::LoadError;
use crate::domain::ports::ImageDecoder;

/// Decoder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Downscale images whose width or height exceeds this, keeping aspect ratio.
    #[serde(default)]
    pub max_dimension: Option<u32>,
}

/// Decodes PNG, JPEG, WebP and GIF with format sniffing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder {
    config: DecoderConfig,
}

impl ImageCrateDecoder {
    /// Creates decoder from configuration.
    #[must_use]
    pub const fn new(config: DecoderConfig) -> Self {
        Self { config }
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| LoadError::decode(format!("Failed to decode image: {e}")))?;

        match self.config.max_dimension {
            Some(max) if img.width() > max || img.height() > max => {
                Ok(img.resize(max, max, FilterType::Triangle).into())
            }
            _ => Ok(img.into()),
        }
    }
}
