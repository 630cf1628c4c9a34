//! Domain entity definitions.

mod decoded_image;
mod load_state;
mod resource_key;

pub use decoded_image::DecodedImage;
pub use load_state::{LoadState, LoaderSnapshot};
pub use resource_key::ResourceKey;
