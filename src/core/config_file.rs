//! Build configuration files
//!
//! A build is described by a JSON file:
//!
//! ```json
//! {
//!   "outputDirectory": "out",
//!   "outputImage": "FontAtlas.png",
//!   "sources": [
//!     "fonts/body.fnt",
//!     { "filename": "fonts/title.fnt", "characters": "ABCDEFG", "tracking": 50 },
//!     { "copyFrom": "fonts/body.fnt", "output": "body_wide/body_wide.txt", "extraXAdvance": 2 },
//!     { "filename": "fonts/icons.fnt",
//!       "extra": { "*": { "glyph": "glyphs/star.png", "x_advance": 2 } } }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use super::errors::{AtlasError, AtlasResult};
use crate::atlas::PackSettings;
use crate::font::{default_output_path, ExtraGlyph, SourceKind, SourceSpec};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_OUTPUT_IMAGE: &str = "FontAtlas.png";

/// One entry of `sources`: a bare descriptor path or a full object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSource {
    Path(String),
    Entry(RawSourceEntry),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceEntry {
    pub filename: Option<String>,
    pub copy_from: Option<String>,
    pub output: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, RawExtra>,
    pub characters: Option<String>,
    pub extra_x_offset: Option<f64>,
    pub extra_y_offset: Option<f64>,
    pub extra_x_advance: Option<f64>,
    pub tracking: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtra {
    pub glyph: String,
    #[serde(default)]
    pub blank: bool,
    pub x_advance: Option<f64>,
    pub y_offset: Option<f64>,
}

/// The configuration file as written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub sources: Vec<RawSource>,
    pub output_directory: Option<String>,
    pub output_image: Option<String>,
    /// Name written into each descriptor's page line
    pub page_file: Option<String>,
    pub padding: Option<u32>,
    pub initial_width: Option<u32>,
    pub initial_height: Option<u32>,
    pub max_size: Option<u32>,
}

/// A validated configuration with resolved paths
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Directory relative paths were resolved against
    pub base_dir: PathBuf,
    pub sources: Vec<SourceSpec>,
    pub output_directory: PathBuf,
    /// Atlas image path, inside `output_directory`
    pub output_image: PathBuf,
    pub page_file: String,
    pub pack: PackSettings,
}

/// Numbers in the file may be fractional; adjustments are whole pixels
fn whole_pixels(value: Option<f64>) -> i32 {
    value.map(|value| value.trunc() as i32).unwrap_or(0)
}

fn invalid(message: impl Into<String>) -> AtlasError {
    AtlasError::InvalidConfig(message.into())
}

impl BuildConfig {
    /// Read, parse, and validate the configuration at `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let raw: RawConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;
        let base_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        let config = Self::from_raw(raw, &base_dir)?;
        debug!(
            "Loaded configuration {:?} with {} sources",
            path,
            config.sources.len()
        );
        Ok(config)
    }

    /// Validate `raw`, resolving relative paths against `base_dir`
    pub fn from_raw(raw: RawConfig, base_dir: &Path) -> AtlasResult<Self> {
        if raw.sources.is_empty() {
            return Err(invalid("`sources` must list at least one font"));
        }

        let sources = raw
            .sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| source_spec(source, base_dir, index))
            .collect::<AtlasResult<Vec<_>>>()?;

        let defaults = PackSettings::default();
        let pack = PackSettings {
            padding: raw.padding.unwrap_or(defaults.padding),
            initial_width: raw.initial_width.unwrap_or(defaults.initial_width),
            initial_height: raw.initial_height.unwrap_or(defaults.initial_height),
            max_size: raw.max_size.unwrap_or(defaults.max_size),
        };
        if pack.initial_width == 0 || pack.initial_height == 0 {
            return Err(invalid("initial atlas size must be nonzero"));
        }
        if pack.initial_width > pack.max_size || pack.initial_height > pack.max_size {
            return Err(invalid(format!(
                "initial atlas size {}x{} exceeds maxSize {}",
                pack.initial_width, pack.initial_height, pack.max_size
            )));
        }

        let output_directory = base_dir.join(raw.output_directory.as_deref().unwrap_or("."));
        let image_name = raw.output_image.as_deref().unwrap_or(DEFAULT_OUTPUT_IMAGE);
        let output_image = output_directory.join(image_name);
        let page_file = match raw.page_file {
            Some(page_file) => page_file,
            None => Path::new(image_name)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| invalid(format!("`outputImage` {image_name:?} has no file name")))?,
        };

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            sources,
            output_directory,
            output_image,
            page_file,
            pack,
        })
    }
}

fn source_spec(source: RawSource, base_dir: &Path, index: usize) -> AtlasResult<SourceSpec> {
    let entry = match source {
        RawSource::Path(filename) => RawSourceEntry {
            filename: Some(filename),
            ..Default::default()
        },
        RawSource::Entry(entry) => entry,
    };

    let (kind, named) = match (entry.filename, entry.copy_from) {
        (Some(filename), None) => (SourceKind::Parse(base_dir.join(&filename)), filename),
        (None, Some(copy_from)) => (SourceKind::Clone(base_dir.join(&copy_from)), copy_from),
        (Some(_), Some(_)) => {
            return Err(invalid(format!(
                "source {index} sets both `filename` and `copyFrom`"
            )))
        }
        (None, None) => {
            return Err(invalid(format!(
                "source {index} needs either `filename` or `copyFrom`"
            )))
        }
    };

    let output = match entry.output {
        Some(output) => PathBuf::from(output),
        None => default_output_path(Path::new(&named)),
    };

    let mut extras = BTreeMap::new();
    for (key, extra) in entry.extra {
        let mut chars = key.chars();
        let (Some(character), None) = (chars.next(), chars.next()) else {
            return Err(invalid(format!(
                "source {index}: extra key {key:?} must be a single character"
            )));
        };
        extras.insert(
            u32::from(character),
            ExtraGlyph {
                image: base_dir.join(&extra.glyph),
                blank: extra.blank,
                x_advance: whole_pixels(extra.x_advance),
                y_offset: whole_pixels(extra.y_offset),
            },
        );
    }

    let characters = entry
        .characters
        .map(|allowed| allowed.chars().map(u32::from).collect::<BTreeSet<u32>>());

    Ok(SourceSpec {
        kind,
        output,
        extras,
        characters,
        extra_x_offset: whole_pixels(entry.extra_x_offset),
        extra_y_offset: whole_pixels(entry.extra_y_offset),
        extra_x_advance: whole_pixels(entry.extra_x_advance),
        tracking: entry.tracking,
    })
}
