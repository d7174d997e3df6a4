//! Bitmap font data: glyphs, descriptors, and the per-source merge steps
//!
//! Fonts here are the bitmap fonts being combined into one atlas. A glyph is
//! a trimmed bitmap; a character is one code point's metrics pointing at a
//! glyph. Glyphs are shared across characters and fonts through the
//! [`GlyphCache`].

pub mod descriptor;
pub mod glyph;
pub mod glyph_cache;
pub mod merge;

// Explicit re-exports for public API
pub use descriptor::{AtlasInfo, Character, FontDescriptor, GlyphSourcing, KerningTable, LINE_ENDING};
pub use glyph::{Glyph, GlyphId, GlyphKey, Placement};
pub use glyph_cache::GlyphCache;
pub use merge::{default_output_path, produce_font, ExtraGlyph, SourceKind, SourceSpec};
