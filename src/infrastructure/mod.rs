//! Infrastructure layer with adapters for the domain ports.

/// Application configuration.
pub mod config;
/// Image handling (caching, fetching, decoding, loading).
pub mod image;

pub use config::{AppConfig, CliArgs, ConfigError, ConfigStore, LogLevel};
pub use image::{
    CacheLimits, CacheStats, DecoderConfig, HttpConfig, HttpTransport, ImageCrateDecoder,
    ImageLoader, ImageLoaderBuilder, MemoryImageCache,
};
