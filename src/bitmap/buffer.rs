//! Owned RGBA pixel storage
//!
//! Pixels are stored row-major, four bytes per pixel, with `stride` bytes
//! per row. All copies go through bounds-checked row slices.

use std::fmt;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Integer rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True when the two rectangles share at least one pixel
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A contiguous RGBA image
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Create a fully transparent buffer
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// The 1x1 transparent stand-in used for empty glyphs
    pub fn blank() -> Self {
        Self::new(1, 1)
    }

    /// Wrap tightly packed RGBA bytes. Returns `None` if the length does not
    /// match the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let stride = width as usize * BYTES_PER_PIXEL;
        if data.len() != stride * height as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The bounds of the whole buffer
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// One row of pixels as raw bytes
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * BYTES_PER_PIXEL;
        &mut self.data[start..start + len]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = x as usize * BYTES_PER_PIXEL;
        let row = self.row(y);
        [row[offset], row[offset + 1], row[offset + 2], row[offset + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = x as usize * BYTES_PER_PIXEL;
        self.row_mut(y)[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Alpha channel of one pixel
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.row(y)[x as usize * BYTES_PER_PIXEL + 3]
    }

    /// Copy `src_rect` of `src` into this buffer with its top-left corner at
    /// (`dest_x`, `dest_y`).
    ///
    /// Returns `false` without touching any pixel if either rectangle falls
    /// outside its buffer.
    pub fn copy_from(&mut self, dest_x: u32, dest_y: u32, src: &PixelBuffer, src_rect: Rect) -> bool {
        let dest_rect = Rect::new(dest_x, dest_y, src_rect.width, src_rect.height);
        if !src.bounds().contains(&src_rect) || !self.bounds().contains(&dest_rect) {
            return false;
        }

        let src_start = src_rect.x as usize * BYTES_PER_PIXEL;
        let dest_start = dest_x as usize * BYTES_PER_PIXEL;
        let len = src_rect.width as usize * BYTES_PER_PIXEL;
        for y in 0..src_rect.height {
            let src_row = &src.row(src_rect.y + y)[src_start..src_start + len];
            self.row_mut(dest_y + y)[dest_start..dest_start + len].copy_from_slice(src_row);
        }
        true
    }

    /// A new buffer holding a copy of `rect`, or `None` if `rect` is out of bounds
    pub fn crop(&self, rect: Rect) -> Option<PixelBuffer> {
        let mut cropped = PixelBuffer::new(rect.width, rect.height);
        cropped.copy_from(0, 0, self, rect).then_some(cropped)
    }

    /// Tightly packed RGBA bytes, dropping any row padding
    pub fn into_rgba(self) -> Vec<u8> {
        let row_len = self.width as usize * BYTES_PER_PIXEL;
        if self.stride == row_len {
            return self.data;
        }
        let mut out = Vec::with_capacity(row_len * self.height as usize);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}
