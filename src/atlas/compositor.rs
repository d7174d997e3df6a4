//! Atlas compositing
//!
//! Packs every glyph in the cache, draws their pixels into one canvas, and
//! records each glyph's final [`Placement`] for descriptor output.

use super::packer::pack_rects;
use crate::bitmap::{PixelBuffer, Rect};
use crate::core::errors::AtlasResult;
use crate::font::{GlyphCache, Placement};
use tracing::info;

/// Canvas sizing for a pack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSettings {
    pub padding: u32,
    pub initial_width: u32,
    pub initial_height: u32,
    pub max_size: u32,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            padding: 1,
            initial_width: 128,
            initial_height: 128,
            max_size: 1024,
        }
    }
}

/// Pack and draw every glyph in `cache`, returning the atlas canvas.
///
/// Afterwards each glyph has a placement whose rectangle is its padded cell
/// and whose offset is its trim offset plus the padding. Glyph pixel buffers
/// are released once drawn.
pub fn compose_atlas(cache: &mut GlyphCache, settings: &PackSettings) -> AtlasResult<PixelBuffer> {
    let mut order: Vec<usize> = (0..cache.len()).collect();
    order.sort_by_key(|&index| std::cmp::Reverse(cache.glyphs()[index].size().1));

    let sizes: Vec<(u32, u32)> = order
        .iter()
        .map(|&index| cache.glyphs()[index].size())
        .collect();
    let layout = pack_rects(
        &sizes,
        settings.padding,
        (settings.initial_width, settings.initial_height),
        settings.max_size,
    )?;

    let mut canvas = PixelBuffer::new(layout.width, layout.height);
    let padding = settings.padding;
    let glyphs = cache.glyphs_mut();
    for (&index, rect) in order.iter().zip(&layout.rects) {
        let glyph = &mut glyphs[index];
        if let Some(image) = glyph.image.take() {
            // the packer keeps every rectangle inside the canvas
            let copied = canvas.copy_from(rect.x, rect.y, &image, image.bounds());
            debug_assert!(copied);
        }

        let (trim_x, trim_y) = glyph.trim_offset;
        glyph.placement = Some(Placement {
            rect: Rect::new(
                rect.x - padding,
                rect.y - padding,
                rect.width + padding * 2,
                rect.height + padding * 2,
            ),
            offset: (trim_x + padding as i32, trim_y + padding as i32),
        });
    }

    info!(
        "Composed {}x{} atlas from {} glyphs",
        layout.width,
        layout.height,
        order.len()
    );
    Ok(canvas)
}
