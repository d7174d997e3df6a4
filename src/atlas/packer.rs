//! Rectangle bin packing
//!
//! A maximal-rectangles packer: the bin keeps every maximal free rectangle,
//! which may overlap each other. Each placement picks the free rectangle
//! giving the lowest bottom edge, then the leftmost position, splits every
//! free rectangle it touches into the pieces left around it, and drops free
//! rectangles contained in others.
//!
//! [`pack_rects`] wraps the bin in a retry loop that doubles the canvas
//! until everything fits or the maximum size is reached.

use crate::bitmap::Rect;
use crate::core::errors::{AtlasError, AtlasResult};
use tracing::debug;

/// One fixed-size bin
#[derive(Debug, Clone)]
pub struct MaxRectsBin {
    free: Vec<Rect>,
}

impl MaxRectsBin {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            free: vec![Rect::new(0, 0, width, height)],
        }
    }

    /// Current free rectangles
    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    /// Place a `width` x `height` rectangle, or return `None` if no free
    /// rectangle can hold it
    pub fn insert(&mut self, width: u32, height: u32) -> Option<Rect> {
        let placed = self.find_bottom_left(width, height)?;
        self.place(placed);
        Some(placed)
    }

    fn find_bottom_left(&self, width: u32, height: u32) -> Option<Rect> {
        self.free
            .iter()
            .filter(|free| free.width >= width && free.height >= height)
            .map(|free| Rect::new(free.x, free.y, width, height))
            // min_by_key keeps the first of equal scores
            .min_by_key(|candidate| (candidate.bottom(), candidate.x))
    }

    fn place(&mut self, used: Rect) {
        let mut next = Vec::with_capacity(self.free.len() + 4);
        for free in self.free.drain(..) {
            if free.intersects(&used) {
                split_free_rect(free, used, &mut next);
            } else {
                next.push(free);
            }
        }
        self.free = prune_contained(next);
    }
}

/// Push the parts of `free` not covered by `used`. Each part spans the full
/// extent of `free` along one axis, so the parts may overlap.
fn split_free_rect(free: Rect, used: Rect, out: &mut Vec<Rect>) {
    if used.x > free.x {
        out.push(Rect::new(free.x, free.y, used.x - free.x, free.height));
    }
    if used.right() < free.right() {
        out.push(Rect::new(
            used.right(),
            free.y,
            free.right() - used.right(),
            free.height,
        ));
    }
    if used.y > free.y {
        out.push(Rect::new(free.x, free.y, free.width, used.y - free.y));
    }
    if used.bottom() < free.bottom() {
        out.push(Rect::new(
            free.x,
            used.bottom(),
            free.width,
            free.bottom() - used.bottom(),
        ));
    }
}

fn prune_contained(rects: Vec<Rect>) -> Vec<Rect> {
    let mut keep = vec![true; rects.len()];
    for i in 0..rects.len() {
        for j in 0..rects.len() {
            if i != j && keep[j] && rects[j].contains(&rects[i]) {
                keep[i] = false;
                break;
            }
        }
    }
    rects
        .into_iter()
        .zip(keep)
        .filter_map(|(rect, keep)| keep.then_some(rect))
        .collect()
}

/// Result of a successful pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedLayout {
    pub width: u32,
    pub height: u32,
    /// Inner rectangle of each input, padding removed, in input order
    pub rects: Vec<Rect>,
}

/// Pack `sizes` with `padding` pixels reserved on every side of each one.
///
/// Inputs are placed tallest first; equal heights keep their input order.
/// When a pass fails the canvas grows by doubling its width if it is not
/// wider than tall, its height otherwise, and packing restarts from scratch.
/// A canvas dimension above `max_size`, or a padded size that does not fit
/// in `u32`, is a [`AtlasError::PackingOverflow`].
pub fn pack_rects(
    sizes: &[(u32, u32)],
    padding: u32,
    initial: (u32, u32),
    max_size: u32,
) -> AtlasResult<PackedLayout> {
    let (mut width, mut height) = initial;
    let overflow = |width, height| AtlasError::PackingOverflow {
        max_size,
        width,
        height,
    };
    if width > max_size || height > max_size {
        return Err(overflow(width, height));
    }

    let border = padding.checked_mul(2).ok_or_else(|| overflow(width, height))?;
    let padded = sizes
        .iter()
        .map(|&(w, h)| Some((w.checked_add(border)?, h.checked_add(border)?)))
        .collect::<Option<Vec<(u32, u32)>>>()
        .ok_or_else(|| overflow(width, height))?;
    let mut order: Vec<usize> = (0..padded.len()).collect();
    order.sort_by(|&a, &b| padded[b].1.cmp(&padded[a].1));

    loop {
        if let Some(rects) = try_pack(&padded, &order, padding, width, height) {
            debug!("Packed {} rectangles into {}x{}", sizes.len(), width, height);
            return Ok(PackedLayout {
                width,
                height,
                rects,
            });
        }

        let next = if width <= height {
            width.checked_mul(2).map(|grown| (grown, height))
        } else {
            height.checked_mul(2).map(|grown| (width, grown))
        };
        let Some((next_width, next_height)) =
            next.filter(|&(w, h)| w <= max_size && h <= max_size)
        else {
            return Err(overflow(width, height));
        };
        debug!(
            "Rectangles do not fit in {}x{}, retrying at {}x{}",
            width, height, next_width, next_height
        );
        width = next_width;
        height = next_height;
    }
}

fn try_pack(
    padded: &[(u32, u32)],
    order: &[usize],
    padding: u32,
    width: u32,
    height: u32,
) -> Option<Vec<Rect>> {
    let mut bin = MaxRectsBin::new(width, height);
    let mut rects = vec![Rect::EMPTY; padded.len()];
    for &index in order {
        let (padded_width, padded_height) = padded[index];
        let cell = bin.insert(padded_width, padded_height)?;
        rects[index] = Rect::new(
            cell.x + padding,
            cell.y + padding,
            padded_width - padding * 2,
            padded_height - padding * 2,
        );
    }
    Some(rects)
}
