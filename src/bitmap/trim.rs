//! Alpha trimming
//!
//! Crops away fully transparent borders so only the visible part of a glyph
//! takes up atlas space. The returned offset has to be added back to the
//! glyph's drawing offsets to keep it in the same visual position.

use super::buffer::{PixelBuffer, Rect};

/// Bounding box of all pixels with nonzero alpha, or `None` if the buffer is
/// fully transparent
pub fn trimmed_bounds(buffer: &PixelBuffer) -> Option<Rect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for y in 0..buffer.height() {
        for x in 0..buffer.width() {
            if buffer.alpha(x, y) != 0 {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }

    if min_x == u32::MAX {
        return None;
    }
    Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Trim transparent borders off `buffer`.
///
/// Returns the cropped copy and the top-left corner of the visible area in
/// source coordinates. A fully transparent input yields a 1x1 blank buffer
/// at offset (0, 0).
pub fn trim_alpha(buffer: &PixelBuffer) -> (PixelBuffer, (i32, i32)) {
    let Some(bounds) = trimmed_bounds(buffer) else {
        return (PixelBuffer::blank(), (0, 0));
    };

    let mut trimmed = PixelBuffer::new(bounds.width, bounds.height);
    // bounds comes from the buffer itself, so the copy cannot fail
    let copied = trimmed.copy_from(0, 0, buffer, bounds);
    debug_assert!(copied);

    (trimmed, (bounds.x as i32, bounds.y as i32))
}
