//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU eviction bounded by count and decoded size
//! - HTTP transport
//! - Decoding through the `image` crate
//! - The per-slot async loader

pub mod decoder;
pub mod http_transport;
pub mod loader;
pub mod memory_cache;

pub use decoder::{DecoderConfig, ImageCrateDecoder};
pub use http_transport::{HttpConfig, HttpTransport};
pub use loader::{ImageLoader, ImageLoaderBuilder};
pub use memory_cache::{CacheLimits, CacheStats, MemoryImageCache};
