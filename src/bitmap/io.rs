//! Image file access
//!
//! The pipeline only ever sees decoded [`PixelBuffer`]s. Reading and writing
//! image files goes through [`ImageStore`], backed by the `image` crate on
//! disk and by a map in tests.

use super::buffer::PixelBuffer;
use image::RgbaImage;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Source and sink for decoded images
pub trait ImageStore {
    /// Decode the image at `path` into RGBA pixels
    fn load(&mut self, path: &Path) -> Result<PixelBuffer, BoxError>;

    /// Encode `buffer` to `path`, creating parent directories as needed
    fn save(&mut self, path: &Path, buffer: &PixelBuffer) -> Result<(), BoxError>;
}

/// Reads and writes PNG files on disk
#[derive(Debug, Default)]
pub struct FsImageStore;

impl ImageStore for FsImageStore {
    fn load(&mut self, path: &Path) -> Result<PixelBuffer, BoxError> {
        let image = image::open(path)?.into_rgba8();
        let (width, height) = image.dimensions();
        debug!("Decoded {:?} ({}x{})", path, width, height);
        PixelBuffer::from_rgba(width, height, image.into_raw())
            .ok_or_else(|| format!("decoded size mismatch for {}", path.display()).into())
    }

    fn save(&mut self, path: &Path, buffer: &PixelBuffer) -> Result<(), BoxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let (width, height) = (buffer.width(), buffer.height());
        let image = RgbaImage::from_raw(width, height, buffer.clone().into_rgba())
            .ok_or_else(|| format!("buffer size mismatch for {}", path.display()))?;
        image.save(path)?;
        debug!("Wrote {:?} ({}x{})", path, width, height);
        Ok(())
    }
}

/// Keeps images in memory, keyed by path
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: HashMap<PathBuf, PixelBuffer>,
    loads: usize,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, buffer: PixelBuffer) {
        self.images.insert(path.into(), buffer);
    }

    pub fn get(&self, path: &Path) -> Option<&PixelBuffer> {
        self.images.get(path)
    }

    /// Number of successful `load` calls so far
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

impl ImageStore for MemoryImageStore {
    fn load(&mut self, path: &Path) -> Result<PixelBuffer, BoxError> {
        let image = self
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| format!("no image at {}", path.display()))?;
        self.loads += 1;
        Ok(image)
    }

    fn save(&mut self, path: &Path, buffer: &PixelBuffer) -> Result<(), BoxError> {
        self.images.insert(path.to_path_buf(), buffer.clone());
        Ok(())
    }
}
