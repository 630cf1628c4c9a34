mod decoder_port;
mod image_cache_port;
mod transport_port;

pub use decoder_port::ImageDecoder;
pub use image_cache_port::ImageCachePort;
pub use transport_port::ImageTransport;
