//! Run-scoped glyph deduplication

use super::glyph::{Glyph, GlyphId, GlyphKey};
use crate::bitmap::Rect;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::trace;

/// Owns every glyph created during one build.
///
/// Lookups are keyed first by source image, then by the rectangle inside it.
/// Glyphs are kept in creation order.
#[derive(Debug, Default)]
pub struct GlyphCache {
    lookup: HashMap<PathBuf, HashMap<Rect, GlyphId>>,
    glyphs: Vec<Glyph>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every glyph. Called at the start of each build.
    pub fn reset(&mut self) {
        self.lookup.clear();
        self.glyphs.clear();
    }

    /// Find the glyph for `key`, registering an empty one on a miss.
    ///
    /// The flag is `true` on a hit. On a miss the caller is expected to give
    /// the new glyph its pixels with [`Glyph::set_untrimmed_image`].
    pub fn get_or_create(&mut self, key: GlyphKey) -> (GlyphId, bool) {
        let by_rect = self.lookup.entry(key.source.clone()).or_default();
        if let Some(&id) = by_rect.get(&key.rect) {
            trace!("Glyph cache hit: {:?} {:?}", key.source, key.rect);
            return (id, true);
        }

        trace!("Glyph cache miss: {:?} {:?}", key.source, key.rect);
        let id = GlyphId(self.glyphs.len());
        by_rect.insert(key.rect, id);
        self.glyphs.push(Glyph::new(key));
        (id, false)
    }

    pub fn glyph(&self, id: GlyphId) -> Option<&Glyph> {
        self.glyphs.get(id.0)
    }

    pub fn glyph_mut(&mut self, id: GlyphId) -> Option<&mut Glyph> {
        self.glyphs.get_mut(id.0)
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn glyphs_mut(&mut self) -> &mut [Glyph] {
        &mut self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}
