//! Per-source font transformations
//!
//! Each configured source produces one font, either parsed from a descriptor
//! file or cloned from a font produced earlier in the same build. The font is
//! then run through a fixed sequence of steps:
//!
//! 1. extra characters from standalone glyph images
//! 2. character allow-list
//! 3. uniform offset and advance deltas
//! 4. tracking
//! 5. lowercase synthesis from uppercase
//! 6. kerning pruning
//!
//! Later steps see the result of earlier ones, so the order matters.

use super::descriptor::{Character, FontDescriptor, GlyphSourcing};
use super::glyph::GlyphKey;
use super::glyph_cache::GlyphCache;
use crate::bitmap::ImageStore;
use crate::core::errors::{AtlasError, AtlasResult};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Channel mask for glyphs that use all four color channels
const ALL_CHANNELS: i32 = 15;

/// Where a source's font comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Parse the descriptor at this path
    Parse(PathBuf),
    /// Copy the font parsed from this path earlier in the build
    Clone(PathBuf),
}

impl SourceKind {
    /// The descriptor path named by either variant
    pub fn path(&self) -> &Path {
        match self {
            SourceKind::Parse(path) | SourceKind::Clone(path) => path,
        }
    }
}

/// A character drawn from its own image file
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraGlyph {
    pub image: PathBuf,
    /// Keep the advance but draw nothing
    pub blank: bool,
    pub x_advance: i32,
    pub y_offset: i32,
}

/// Everything needed to produce one output font
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub kind: SourceKind,
    /// Output descriptor path relative to the output directory
    pub output: PathBuf,
    pub extras: BTreeMap<u32, ExtraGlyph>,
    /// Code points to keep; `None` keeps everything
    pub characters: Option<BTreeSet<u32>>,
    pub extra_x_offset: i32,
    pub extra_y_offset: i32,
    pub extra_x_advance: i32,
    /// Extra advance in thousandths of the line height
    pub tracking: Option<f64>,
}

impl SourceSpec {
    /// A source that only parses `path`, writing to `<stem>/<stem>.txt`
    pub fn parse(path: impl Into<PathBuf>) -> Self {
        let kind = SourceKind::Parse(path.into());
        let output = default_output_path(kind.path());
        Self {
            kind,
            output,
            extras: BTreeMap::new(),
            characters: None,
            extra_x_offset: 0,
            extra_y_offset: 0,
            extra_x_advance: 0,
            tracking: None,
        }
    }

    /// A source that only clones the font parsed from `path`
    pub fn clone_of(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            output: default_output_path(&path),
            kind: SourceKind::Clone(path),
            ..Self::parse(PathBuf::new())
        }
    }
}

/// `<stem>/<stem>.txt` for a descriptor path
pub fn default_output_path(source: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default();
    PathBuf::from(stem).join(Path::new(stem).with_extension("txt"))
}

/// Produce the font for `spec` and apply all of its transformations.
///
/// `fonts` holds the fonts produced so far, in source order; clone
/// references are resolved against it.
pub fn produce_font(
    spec: &SourceSpec,
    fonts: &[FontDescriptor],
    cache: &mut GlyphCache,
    images: &mut dyn ImageStore,
    sourcing: &GlyphSourcing,
) -> AtlasResult<FontDescriptor> {
    let mut font = match &spec.kind {
        SourceKind::Parse(path) => {
            info!("Reading font {:?}", path);
            FontDescriptor::load(path, cache, images, sourcing)?
        }
        SourceKind::Clone(path) => {
            info!("Copying font {:?}", path);
            fonts
                .iter()
                .find(|font| font.source_path == *path)
                .ok_or_else(|| AtlasError::UnresolvedCloneReference {
                    reference: path.clone(),
                })?
                .clone_font()
        }
    };
    font.output_path = spec.output.clone();

    apply_extras(&mut font, &spec.extras, cache, images)?;
    if let Some(allowed) = &spec.characters {
        filter_characters(&mut font, allowed);
    }
    apply_deltas(
        &mut font,
        spec.extra_x_offset,
        spec.extra_y_offset,
        spec.extra_x_advance,
    );
    if let Some(tracking) = spec.tracking {
        apply_tracking(&mut font, tracking);
    }
    duplicate_case(&mut font);
    prune_kernings(&mut font);

    debug!(
        "Font {:?} ready: {} characters, {} kerning pairs",
        font.output_path,
        font.characters.len(),
        font.kerning_count()
    );
    Ok(font)
}

/// Add or replace characters drawn from standalone glyph images.
///
/// The advance defaults to the trimmed glyph width; the vertical offset puts
/// the glyph's top on the line's top edge.
pub fn apply_extras(
    font: &mut FontDescriptor,
    extras: &BTreeMap<u32, ExtraGlyph>,
    cache: &mut GlyphCache,
    images: &mut dyn ImageStore,
) -> AtlasResult<()> {
    for (&code_point, extra) in extras {
        let (glyph_id, cached) = cache.get_or_create(GlyphKey::standalone(&extra.image));
        if !cached {
            let raw = images
                .load(&extra.image)
                .map_err(|source| AtlasError::MissingGlyphFile {
                    path: extra.image.clone(),
                    source,
                })?;
            if let Some(glyph) = cache.glyph_mut(glyph_id) {
                glyph.set_untrimmed_image(&raw);
            }
        }

        let width = cache
            .glyph(glyph_id)
            .map(|glyph| glyph.size().0)
            .unwrap_or(1);

        let character = Character {
            x_offset: 0.0,
            y_offset: (-(font.line_height - font.base_offset) + extra.y_offset) as f32,
            x_advance: (width as i32 + extra.x_advance) as f32,
            page: 0,
            channel: ALL_CHANNELS,
            glyph: (!extra.blank).then_some(glyph_id),
        };
        debug!("Extra character {} from {:?}", code_point, extra.image);
        font.characters.insert(code_point, character);
    }
    Ok(())
}

/// Drop every character whose code point is not in `allowed`
pub fn filter_characters(font: &mut FontDescriptor, allowed: &BTreeSet<u32>) {
    font.characters.retain(|id, _| allowed.contains(id));
}

/// Shift every character by fixed amounts
pub fn apply_deltas(font: &mut FontDescriptor, x_offset: i32, y_offset: i32, x_advance: i32) {
    for character in font.characters.values_mut() {
        character.x_offset += x_offset as f32;
        character.y_offset += y_offset as f32;
        character.x_advance += x_advance as f32;
    }
}

/// Widen every advance by `tracking` thousandths of the line height,
/// rounded half to even
pub fn apply_tracking(font: &mut FontDescriptor, tracking: f64) {
    let extra = (tracking / 1000.0 * font.line_height as f64).round_ties_even() as i32;
    for character in font.characters.values_mut() {
        character.x_advance += extra as f32;
    }
}

/// Give an uppercase-only font its lowercase letters.
///
/// Applies when all of A-Z exist and at least one of a-z is missing. Each
/// missing lowercase letter becomes a copy of its uppercase letter, and
/// kerning involving the uppercase letter is mirrored onto it in both
/// positions. Lowercase letters that already exist are left alone.
pub fn duplicate_case(font: &mut FontDescriptor) {
    let has_upper = (b'A'..=b'Z').all(|c| font.characters.contains_key(&(c as u32)));
    let has_lower = (b'a'..=b'z').all(|c| font.characters.contains_key(&(c as u32)));
    if !has_upper || has_lower {
        return;
    }

    let mut synthesized = 0;
    for upper in (b'A'..=b'Z').map(u32::from) {
        let lower = upper + 32;
        if font.characters.contains_key(&lower) {
            continue;
        }
        if let Some(character) = font.characters.get(&upper).cloned() {
            font.characters.insert(lower, character);
        }

        if let Some(seconds) = font.kernings.get(&upper).cloned() {
            font.kernings.insert(lower, seconds);
        }
        for seconds in font.kernings.values_mut() {
            if let Some(&amount) = seconds.get(&upper) {
                seconds.insert(lower, amount);
            }
        }
        synthesized += 1;
    }
    debug!("Synthesized {} lowercase characters", synthesized);
}

/// Remove kerning pairs that mention a code point the font no longer has
pub fn prune_kernings(font: &mut FontDescriptor) {
    let characters = &font.characters;
    font.kernings.retain(|first, seconds| {
        if !characters.contains_key(first) {
            return false;
        }
        seconds.retain(|second, _| characters.contains_key(second));
        !seconds.is_empty()
    });
}
