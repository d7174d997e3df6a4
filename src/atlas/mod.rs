//! Packing glyphs into the output atlas

pub mod compositor;
pub mod packer;

pub use compositor::{compose_atlas, PackSettings};
pub use packer::{pack_rects, MaxRectsBin, PackedLayout};
