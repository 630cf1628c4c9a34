//! Cached image loading.
//!
//! This crate turns image URLs into decoded in-memory images. Each
//! [`ImageLoader`](infrastructure::ImageLoader) drives one image slot:
//! it serves from a shared bounded cache when it can, otherwise fetches
//! over HTTP, decodes off the async workers, and publishes the result
//! through a watch channel. Duplicate requests are collapsed and
//! superseded fetches never publish.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "cached-image";
