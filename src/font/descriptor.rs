//! Bitmap font descriptor model
//!
//! Reads and writes the text descriptor format:
//!
//! ```text
//! info face="Example" size=32 ...
//! common lineHeight=60 base=46 scaleW=512 scaleH=512 pages=1
//! page id=0 file="example.png"
//! chars count=95
//! char id=32 x=248 y=38 width=5 height=5 xoffset=-2 yoffset=34 xadvance=8 page=0 chnl=15
//! kernings count=1
//! kerning first=32 second=74 amount=-1
//! ```
//!
//! Header lines other than `common` and `page` are passed through untouched.
//! Records are matched field by field; any name that differs from the
//! expected one rejects the whole file.

use super::glyph::{GlyphId, GlyphKey};
use super::glyph_cache::GlyphCache;
use crate::bitmap::{ImageStore, PixelBuffer, Rect};
use crate::core::errors::{AtlasError, AtlasResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Line terminator used for every written line
pub const LINE_ENDING: &str = "\r\n";

/// Kerning amounts by first code point, then second code point
pub type KerningTable = BTreeMap<u32, BTreeMap<u32, f32>>;

/// Placement data for one code point in one font
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_advance: f32,
    pub page: i32,
    pub channel: i32,
    /// Shared glyph; `None` for blank characters that only advance the pen
    pub glyph: Option<GlyphId>,
}

/// How glyph pixels are obtained on a cache miss
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GlyphSourcing {
    /// Crop the region out of the font's atlas image
    #[default]
    Crop,
    /// Crop, and also save each untrimmed crop under the given directory
    CropAndDump(PathBuf),
    /// Load each untrimmed glyph from the given directory instead of cropping
    Loose(PathBuf),
}

impl GlyphSourcing {
    /// `<dir>/<font stem>/glyph_<id>.png`
    fn glyph_file(dir: &Path, font_path: &Path, id: u32) -> PathBuf {
        let stem = font_path.file_stem().unwrap_or_default();
        dir.join(stem).join(format!("glyph_{id}.png"))
    }
}

/// Final atlas facts written into every descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasInfo {
    pub width: u32,
    pub height: u32,
    pub page_file: String,
}

/// One bitmap font
#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    /// Descriptor this font was parsed from; clones keep their source's path
    pub source_path: PathBuf,
    /// Where the rewritten descriptor goes, relative to the output directory
    pub output_path: PathBuf,
    pub header_lines: Vec<String>,
    pub line_height: i32,
    pub base_offset: i32,
    pub characters: BTreeMap<u32, Character>,
    pub kernings: KerningTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Header,
    Characters,
    Kernings,
}

/// A character record before its glyph is resolved
struct CharRecord {
    id: u32,
    rect: Rect,
    character: Character,
}

/// Split `name=value` and check the name
fn parse_field<T: FromStr>(token: Option<&str>, name: &str) -> Result<T, String> {
    let token = token.ok_or_else(|| format!("missing field `{name}`"))?;
    let (found, value) = token
        .split_once('=')
        .ok_or_else(|| format!("expected `{name}=<value>`, found `{token}`"))?;
    if found != name {
        return Err(format!("expected field `{name}`, found `{found}`"));
    }
    value
        .parse()
        .map_err(|_| format!("invalid value `{value}` for field `{name}`"))
}

fn expect_tag<'a>(tokens: &mut impl Iterator<Item = &'a str>, tag: &str) -> Result<(), String> {
    match tokens.next() {
        Some(found) if found == tag => Ok(()),
        Some(found) => Err(format!("expected `{tag}` record, found `{found}`")),
        None => Err(format!("expected `{tag}` record")),
    }
}

fn parse_char_record(line: &str) -> Result<CharRecord, String> {
    let mut tokens = line.split_whitespace();
    expect_tag(&mut tokens, "char")?;
    let id = parse_field(tokens.next(), "id")?;
    let x: u32 = parse_field(tokens.next(), "x")?;
    let y: u32 = parse_field(tokens.next(), "y")?;
    let width: u32 = parse_field(tokens.next(), "width")?;
    let height: u32 = parse_field(tokens.next(), "height")?;
    if x.checked_add(width).is_none() || y.checked_add(height).is_none() {
        return Err(format!(
            "glyph rectangle x={x} y={y} width={width} height={height} is out of range"
        ));
    }
    let character = Character {
        x_offset: parse_field(tokens.next(), "xoffset")?,
        y_offset: parse_field(tokens.next(), "yoffset")?,
        x_advance: parse_field(tokens.next(), "xadvance")?,
        page: parse_field(tokens.next(), "page")?,
        channel: parse_field(tokens.next(), "chnl")?,
        glyph: None,
    };
    Ok(CharRecord {
        id,
        rect: Rect::new(x, y, width, height),
        character,
    })
}

fn parse_kerning_record(line: &str) -> Result<(u32, u32, f32), String> {
    let mut tokens = line.split_whitespace();
    expect_tag(&mut tokens, "kerning")?;
    Ok((
        parse_field(tokens.next(), "first")?,
        parse_field(tokens.next(), "second")?,
        parse_field(tokens.next(), "amount")?,
    ))
}

fn parse_common(line: &str) -> Result<(i32, i32), String> {
    let mut tokens = line.split_whitespace();
    expect_tag(&mut tokens, "common")?;
    Ok((
        parse_field(tokens.next(), "lineHeight")?,
        parse_field(tokens.next(), "base")?,
    ))
}

fn parse_page_file(line: &str) -> Result<String, String> {
    let start = line
        .find("file=")
        .ok_or_else(|| "page line has no `file=` field".to_string())?;
    Ok(line[start + "file=".len()..].replace('"', ""))
}

impl FontDescriptor {
    /// Read and parse the descriptor at `path`
    pub fn load(
        path: &Path,
        cache: &mut GlyphCache,
        images: &mut dyn ImageStore,
        sourcing: &GlyphSourcing,
    ) -> AtlasResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text, cache, images, sourcing)
    }

    /// Parse descriptor text. `path` is the descriptor's own location; the
    /// page image is resolved relative to it.
    ///
    /// Every character record is resolved through `cache`. On a miss the
    /// glyph's untrimmed pixels are cropped from the page image (or loaded,
    /// see [`GlyphSourcing`]) and trimmed.
    pub fn parse(
        path: &Path,
        text: &str,
        cache: &mut GlyphCache,
        images: &mut dyn ImageStore,
        sourcing: &GlyphSourcing,
    ) -> AtlasResult<Self> {
        let malformed = |line: usize, reason: String| AtlasError::MalformedDescriptor {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut font = FontDescriptor {
            source_path: path.to_path_buf(),
            ..Default::default()
        };
        let mut page_image: Option<(PathBuf, Option<PixelBuffer>)> = None;
        let mut mode = Mode::Header;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            match mode {
                Mode::Header => {
                    if line.starts_with("chars") {
                        mode = Mode::Characters;
                    } else if line.starts_with("common") {
                        let (line_height, base_offset) =
                            parse_common(line).map_err(|reason| malformed(line_number, reason))?;
                        font.line_height = line_height;
                        font.base_offset = base_offset;
                    } else if line.starts_with("page") {
                        if page_image.is_some() {
                            return Err(malformed(
                                line_number,
                                "only single-page fonts are supported".to_string(),
                            ));
                        }
                        let file =
                            parse_page_file(line).map_err(|reason| malformed(line_number, reason))?;
                        let image_path = path.parent().unwrap_or(Path::new("")).join(file);
                        let image = match sourcing {
                            GlyphSourcing::Loose(_) => None,
                            _ => Some(images.load(&image_path).map_err(|source| {
                                AtlasError::MissingSourceImage {
                                    path: image_path.clone(),
                                    source,
                                }
                            })?),
                        };
                        page_image = Some((image_path, image));
                    } else {
                        font.header_lines.push(line.to_string());
                    }
                }
                Mode::Characters => {
                    if line.starts_with("kernings") {
                        mode = Mode::Kernings;
                        continue;
                    }
                    if line.trim().is_empty() {
                        continue;
                    }
                    let record =
                        parse_char_record(line).map_err(|reason| malformed(line_number, reason))?;
                    let (image_path, image) = page_image.as_ref().ok_or_else(|| {
                        malformed(line_number, "character record before page line".to_string())
                    })?;

                    if font.characters.contains_key(&record.id) {
                        return Err(malformed(
                            line_number,
                            format!("duplicate character id {}", record.id),
                        ));
                    }

                    let (glyph_id, cached) =
                        cache.get_or_create(GlyphKey::atlas_region(image_path, record.rect));
                    if !cached {
                        let raw = match sourcing {
                            GlyphSourcing::Loose(dir) => {
                                let glyph_path = GlyphSourcing::glyph_file(dir, path, record.id);
                                images.load(&glyph_path).map_err(|source| {
                                    AtlasError::MissingGlyphFile {
                                        path: glyph_path,
                                        source,
                                    }
                                })?
                            }
                            GlyphSourcing::Crop | GlyphSourcing::CropAndDump(_) => {
                                let atlas = image.as_ref().ok_or_else(|| {
                                    malformed(line_number, "page image not loaded".to_string())
                                })?;
                                atlas.crop(record.rect).ok_or_else(|| {
                                    malformed(
                                        line_number,
                                        format!(
                                            "glyph rectangle {:?} lies outside the {}x{} page image",
                                            record.rect,
                                            atlas.width(),
                                            atlas.height()
                                        ),
                                    )
                                })?
                            }
                        };

                        if let GlyphSourcing::CropAndDump(dir) = sourcing {
                            let dump_path = GlyphSourcing::glyph_file(dir, path, record.id);
                            images.save(&dump_path, &raw).map_err(|source| AtlasError::Io {
                                path: dump_path,
                                source: std::io::Error::other(source),
                            })?;
                        }

                        if let Some(glyph) = cache.glyph_mut(glyph_id) {
                            glyph.set_untrimmed_image(&raw);
                        }
                    }

                    font.characters.insert(
                        record.id,
                        Character {
                            glyph: Some(glyph_id),
                            ..record.character
                        },
                    );
                }
                Mode::Kernings => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let (first, second, amount) = parse_kerning_record(line)
                        .map_err(|reason| malformed(line_number, reason))?;
                    font.kernings.entry(first).or_default().insert(second, amount);
                }
            }
        }

        debug!(
            "Parsed {:?}: {} characters, {} kerning pairs",
            path,
            font.characters.len(),
            font.kerning_count()
        );
        Ok(font)
    }

    /// An independent copy sharing glyphs with `self`.
    ///
    /// Character and kerning tables are duplicated, glyph ids are not, so the
    /// copy takes no extra atlas space.
    pub fn clone_font(&self) -> Self {
        Self {
            source_path: self.source_path.clone(),
            output_path: PathBuf::new(),
            header_lines: self.header_lines.clone(),
            line_height: self.line_height,
            base_offset: self.base_offset,
            characters: self.characters.clone(),
            kernings: self.kernings.clone(),
        }
    }

    /// Total number of kerning pairs
    pub fn kerning_count(&self) -> usize {
        self.kernings.values().map(BTreeMap::len).sum()
    }

    /// Render the descriptor against the packed atlas
    pub fn serialize(&self, glyphs: &GlyphCache, atlas: &AtlasInfo) -> AtlasResult<String> {
        let mut out = String::new();
        for line in &self.header_lines {
            out.push_str(line);
            out.push_str(LINE_ENDING);
        }

        out.push_str(&format!(
            "common lineHeight={} base={} scaleW={} scaleH={} pages=1{LINE_ENDING}",
            self.line_height, self.base_offset, atlas.width, atlas.height
        ));
        out.push_str(&format!("page id=0 file=\"{}\"{LINE_ENDING}", atlas.page_file));

        out.push_str(&format!("chars count={}{LINE_ENDING}", self.characters.len()));
        for (&id, character) in &self.characters {
            let (rect, (dx, dy)) = match character.glyph {
                Some(glyph_id) => {
                    let placement = glyphs
                        .glyph(glyph_id)
                        .and_then(|glyph| glyph.placement)
                        .ok_or(AtlasError::UnplacedGlyph { id })?;
                    (placement.rect, placement.offset)
                }
                None => (Rect::EMPTY, (0, 0)),
            };
            out.push_str(&format!(
                "char id={} x={} y={} width={} height={} xoffset={} yoffset={} xadvance={} page={} chnl={}{LINE_ENDING}",
                id,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                character.x_offset + dx as f32,
                character.y_offset + dy as f32,
                character.x_advance,
                character.page,
                character.channel,
            ));
        }

        out.push_str(&format!("kernings count={}{LINE_ENDING}", self.kerning_count()));
        for (first, seconds) in &self.kernings {
            for (second, amount) in seconds {
                out.push_str(&format!(
                    "kerning first={first} second={second} amount={amount}{LINE_ENDING}"
                ));
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::MemoryImageStore;
    use crate::font::glyph::Placement;

    const SAMPLE: &str = "info face=\"Sample\" size=32 bold=0\n\
common lineHeight=40 base=30 scaleW=64 scaleH=64 pages=1\n\
page id=0 file=\"sample.png\"\n\
chars count=3\n\
char id=65   x=0     y=0     width=8     height=8     xoffset=1     yoffset=2     xadvance=9     page=0  chnl=15\n\
char id=66   x=8     y=0     width=8     height=8     xoffset=0     yoffset=0     xadvance=10    page=0  chnl=15\n\
char id=67   x=0     y=0     width=8     height=8     xoffset=-1.5  yoffset=0     xadvance=9     page=0  chnl=15\n\
kernings count=2\n\
kerning first=65  second=66  amount=-1\n\
kerning first=66  second=65  amount=0.5\n";

    fn sample_images() -> MemoryImageStore {
        let mut page = PixelBuffer::new(64, 64);
        // 'A': one 4x3 block starting at (2, 3)
        for y in 3..6 {
            for x in 2..6 {
                page.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        // 'B': a single pixel at (8 + 7, 7)
        page.set_pixel(15, 7, [255, 0, 0, 200]);
        let mut images = MemoryImageStore::new();
        images.insert("/fonts/sample.png", page);
        images
    }

    fn parse_sample(cache: &mut GlyphCache) -> FontDescriptor {
        let mut images = sample_images();
        FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            SAMPLE,
            cache,
            &mut images,
            &GlyphSourcing::Crop,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_header_and_tables() {
        let mut cache = GlyphCache::new();
        let font = parse_sample(&mut cache);

        assert_eq!(font.header_lines, vec!["info face=\"Sample\" size=32 bold=0"]);
        assert_eq!(font.line_height, 40);
        assert_eq!(font.base_offset, 30);
        assert_eq!(font.characters.len(), 3);
        assert_eq!(font.characters[&67].x_offset, -1.5);
        assert_eq!(font.kernings[&65][&66], -1.0);
        assert_eq!(font.kernings[&66][&65], 0.5);
    }

    #[test]
    fn test_parse_shares_and_trims_glyphs() {
        let mut cache = GlyphCache::new();
        let font = parse_sample(&mut cache);

        // 'A' and 'C' use the same source rectangle
        assert_eq!(font.characters[&65].glyph, font.characters[&67].glyph);
        assert_eq!(cache.len(), 2);

        let a = cache.glyph(font.characters[&65].glyph.unwrap()).unwrap();
        assert_eq!(a.size(), (4, 3));
        assert_eq!(a.trim_offset, (2, 3));
        assert_eq!(a.key.source, PathBuf::from("/fonts/sample.png"));

        let b = cache.glyph(font.characters[&66].glyph.unwrap()).unwrap();
        assert_eq!(b.size(), (1, 1));
        assert_eq!(b.trim_offset, (7, 7));
    }

    #[test]
    fn test_field_name_mismatch_is_rejected() {
        let text = SAMPLE.replace("xadvance=10", "xadv=10");
        let mut cache = GlyphCache::new();
        let mut images = sample_images();
        let result = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            &text,
            &mut cache,
            &mut images,
            &GlyphSourcing::Crop,
        );
        match result {
            Err(AtlasError::MalformedDescriptor { line, reason, .. }) => {
                assert_eq!(line, 6);
                assert!(reason.contains("xadvance"));
            }
            other => panic!("expected malformed descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_rect_is_rejected() {
        let text = SAMPLE.replace(
            "char id=66   x=8 ",
            "char id=66   x=4294967295 ",
        );
        let mut cache = GlyphCache::new();
        let mut images = sample_images();
        let result = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            &text,
            &mut cache,
            &mut images,
            &GlyphSourcing::Crop,
        );
        match result {
            Err(AtlasError::MalformedDescriptor { line, reason, .. }) => {
                assert_eq!(line, 6);
                assert!(reason.contains("out of range"));
            }
            other => panic!("expected malformed descriptor, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_character_id_is_rejected() {
        let text = SAMPLE.replace("char id=67 ", "char id=65 ");
        let mut cache = GlyphCache::new();
        let mut images = sample_images();
        let result = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            &text,
            &mut cache,
            &mut images,
            &GlyphSourcing::Crop,
        );
        match result {
            Err(AtlasError::MalformedDescriptor { line, reason, .. }) => {
                assert_eq!(line, 7);
                assert!(reason.contains("duplicate character id 65"));
            }
            other => panic!("expected malformed descriptor, got {other:?}"),
        }
        // the rejected record never reaches the cache
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_unexpected_record_in_kerning_section() {
        let text = format!("{SAMPLE}char id=68 x=0 y=0 width=1 height=1 xoffset=0 yoffset=0 xadvance=1 page=0 chnl=15\n");
        let mut cache = GlyphCache::new();
        let mut images = sample_images();
        let result = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            &text,
            &mut cache,
            &mut images,
            &GlyphSourcing::Crop,
        );
        assert!(matches!(
            result,
            Err(AtlasError::MalformedDescriptor { line: 11, .. })
        ));
    }

    #[test]
    fn test_missing_page_image() {
        let mut cache = GlyphCache::new();
        let mut images = MemoryImageStore::new();
        let result = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            SAMPLE,
            &mut cache,
            &mut images,
            &GlyphSourcing::Crop,
        );
        match result {
            Err(AtlasError::MissingSourceImage { path, .. }) => {
                assert_eq!(path, PathBuf::from("/fonts/sample.png"));
            }
            other => panic!("expected missing source image, got {other:?}"),
        }
    }

    #[test]
    fn test_loose_glyphs_loaded_from_directory() {
        let mut cache = GlyphCache::new();
        let mut images = MemoryImageStore::new();
        let mut loose = PixelBuffer::new(3, 3);
        loose.set_pixel(1, 1, [1, 2, 3, 255]);
        for id in [65, 66] {
            images.insert(format!("/glyphs/sample/glyph_{id}.png"), loose.clone());
        }

        let font = FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            SAMPLE,
            &mut cache,
            &mut images,
            &GlyphSourcing::Loose(PathBuf::from("/glyphs")),
        )
        .unwrap();

        // 'C' hits the cache entry created by 'A', so glyph_67.png is never needed
        assert_eq!(images.load_count(), 2);
        let a = cache.glyph(font.characters[&65].glyph.unwrap()).unwrap();
        assert_eq!(a.trim_offset, (1, 1));
    }

    #[test]
    fn test_dump_saves_untrimmed_crops() {
        let mut cache = GlyphCache::new();
        let mut images = sample_images();
        FontDescriptor::parse(
            Path::new("/fonts/sample.fnt"),
            SAMPLE,
            &mut cache,
            &mut images,
            &GlyphSourcing::CropAndDump(PathBuf::from("/dump")),
        )
        .unwrap();

        let dumped = images.get(Path::new("/dump/sample/glyph_65.png")).unwrap();
        assert_eq!((dumped.width(), dumped.height()), (8, 8));
        assert!(images.get(Path::new("/dump/sample/glyph_66.png")).is_some());
        assert!(images.get(Path::new("/dump/sample/glyph_67.png")).is_none());
    }

    #[test]
    fn test_clone_is_independent_but_shares_glyphs() {
        let mut cache = GlyphCache::new();
        let font = parse_sample(&mut cache);
        let mut copy = font.clone_font();

        copy.characters.get_mut(&65).unwrap().x_advance += 5.0;
        copy.kernings.clear();
        copy.header_lines.push("extra".to_string());

        assert_eq!(font.characters[&65].x_advance, 9.0);
        assert_eq!(font.kerning_count(), 2);
        assert_eq!(font.header_lines.len(), 1);
        assert_eq!(copy.characters[&66].glyph, font.characters[&66].glyph);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_serialize_uses_placements() {
        let mut cache = GlyphCache::new();
        let mut font = parse_sample(&mut cache);
        font.characters.insert(
            32,
            Character {
                x_offset: 0.0,
                y_offset: -10.0,
                x_advance: 7.0,
                page: 0,
                channel: 15,
                glyph: None,
            },
        );
        for (index, glyph) in cache.glyphs_mut().iter_mut().enumerate() {
            let (dx, dy) = glyph.trim_offset;
            glyph.placement = Some(Placement {
                rect: Rect::new(index as u32 * 10, 0, 6, 5),
                offset: (dx + 1, dy + 1),
            });
        }

        let atlas = AtlasInfo {
            width: 128,
            height: 64,
            page_file: "FontAtlas.png".to_string(),
        };
        let text = font.serialize(&cache, &atlas).unwrap();
        let expected = [
            "info face=\"Sample\" size=32 bold=0",
            "common lineHeight=40 base=30 scaleW=128 scaleH=64 pages=1",
            "page id=0 file=\"FontAtlas.png\"",
            "chars count=4",
            "char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=-10 xadvance=7 page=0 chnl=15",
            "char id=65 x=0 y=0 width=6 height=5 xoffset=4 yoffset=6 xadvance=9 page=0 chnl=15",
            "char id=66 x=10 y=0 width=6 height=5 xoffset=8 yoffset=8 xadvance=10 page=0 chnl=15",
            "char id=67 x=0 y=0 width=6 height=5 xoffset=1.5 yoffset=4 xadvance=9 page=0 chnl=15",
            "kernings count=2",
            "kerning first=65 second=66 amount=-1",
            "kerning first=66 second=65 amount=0.5",
            "",
        ]
        .join(LINE_ENDING);
        assert_eq!(text, expected);
    }

    #[test]
    fn test_serialize_requires_packed_glyphs() {
        let mut cache = GlyphCache::new();
        let font = parse_sample(&mut cache);
        let atlas = AtlasInfo {
            width: 64,
            height: 64,
            page_file: "FontAtlas.png".to_string(),
        };
        assert!(matches!(
            font.serialize(&cache, &atlas),
            Err(AtlasError::UnplacedGlyph { id: 65 })
        ));
    }
}
