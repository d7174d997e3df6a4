//! Pixel buffers, alpha trimming, and image file access

pub mod buffer;
pub mod io;
pub mod trim;

pub use buffer::{PixelBuffer, Rect, BYTES_PER_PIXEL};
pub use io::{FsImageStore, ImageStore, MemoryImageStore};
pub use trim::{trim_alpha, trimmed_bounds};
