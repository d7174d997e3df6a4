//! Trimmed glyph bitmaps shared between characters
//!
//! A [`Glyph`] is owned by the [`GlyphCache`](super::GlyphCache); characters
//! refer to it through a [`GlyphId`]. Two characters with the same source
//! image and source rectangle, in the same font or in different fonts, hold
//! the same id and therefore occupy one spot in the atlas.

use crate::bitmap::{trim_alpha, PixelBuffer, Rect};
use std::path::PathBuf;

/// Index of a glyph inside its cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphId(pub(crate) usize);

/// Identity of a glyph's pixels: the image they come from and the region
/// inside it. Standalone glyph images use [`Rect::EMPTY`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub source: PathBuf,
    pub rect: Rect,
}

impl GlyphKey {
    /// Key for a region cropped out of a font atlas
    pub fn atlas_region(source: impl Into<PathBuf>, rect: Rect) -> Self {
        Self {
            source: source.into(),
            rect,
        }
    }

    /// Key for a glyph supplied as its own image file
    pub fn standalone(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            rect: Rect::EMPTY,
        }
    }
}

/// Where a glyph ended up in the packed atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Rectangle written to descriptors, padding border included
    pub rect: Rect,
    /// Added to each character's stored offset: trim offset plus padding
    pub offset: (i32, i32),
}

#[derive(Debug, Clone)]
pub struct Glyph {
    pub key: GlyphKey,
    /// Trimmed pixels; `None` until populated, and again after compositing
    pub image: Option<PixelBuffer>,
    /// Top-left of the visible area inside the untrimmed image
    pub trim_offset: (i32, i32),
    pub placement: Option<Placement>,
}

impl Glyph {
    pub(crate) fn new(key: GlyphKey) -> Self {
        Self {
            key,
            image: None,
            trim_offset: (0, 0),
            placement: None,
        }
    }

    /// Trim `raw` and keep the result as this glyph's pixels
    pub fn set_untrimmed_image(&mut self, raw: &PixelBuffer) {
        let (trimmed, offset) = trim_alpha(raw);
        self.image = Some(trimmed);
        self.trim_offset = offset;
    }

    /// Size of the trimmed image, (1, 1) if none was ever set
    pub fn size(&self) -> (u32, u32) {
        self.image
            .as_ref()
            .map(|image| (image.width(), image.height()))
            .unwrap_or((1, 1))
    }
}
