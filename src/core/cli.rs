//! Command line interface for glyphpack
//!
//! Handles parsing command line arguments and provides
//! validation for user inputs.

use crate::font::GlyphSourcing;
use clap::Parser;
use std::path::{Path, PathBuf};

/// glyphpack CLI arguments
///
/// Examples:
///   glyphpack fonts.json                    # Build one atlas
///   glyphpack ui.json hud.json              # Build two independent atlases
///   glyphpack --dump-glyphs fonts.json      # Also save every cropped glyph
///   glyphpack --loose-glyphs fonts.json     # Use hand-edited glyph files
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "glyphpack",
    version,
    about = "Merge bitmap fonts into one packed texture atlas",
    long_about = "glyphpack reads bitmap font descriptors listed in a JSON build file, removes duplicate glyphs, trims transparent borders, packs everything into a single atlas image, and rewrites each descriptor against the new atlas."
)]
pub struct CliArgs {
    /// Build configuration files, processed in order
    #[clap(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Save each cropped glyph before trimming
    #[clap(
        long = "dump-glyphs",
        conflicts_with = "loose_glyphs",
        help = "Save every cropped glyph as <glyph-dir>/<font>/glyph_<id>.png"
    )]
    pub dump_glyphs: bool,

    /// Load glyphs from individual files instead of the font's atlas
    #[clap(
        long = "loose-glyphs",
        help = "Load glyphs from <glyph-dir>/<font>/glyph_<id>.png instead of cropping",
        long_help = "Load each glyph from <glyph-dir>/<font>/glyph_<id>.png instead of cropping it out of the font's atlas image. Pair with an earlier --dump-glyphs run to edit glyphs by hand."
    )]
    pub loose_glyphs: bool,

    /// Directory for dumped or loose glyphs, relative to the configuration file
    #[clap(long = "glyph-dir", default_value = "glyphs", value_name = "DIR")]
    pub glyph_dir: PathBuf,

    /// Log debug output
    #[clap(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Also write logs to the user config directory
    #[clap(
        long = "log-file",
        help = "Also write logs to ~/.config/glyphpack/logs"
    )]
    pub log_file: bool,
}

impl CliArgs {
    /// Validate the CLI arguments after parsing
    pub fn validate(&self) -> Result<(), String> {
        for path in &self.configs {
            if !path.exists() {
                return Err(format!(
                    "Configuration file does not exist: {}\nMake sure the path is correct and the file exists.",
                    path.display()
                ));
            }
            if !path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    path.display()
                ));
            }
        }
        Ok(())
    }

    /// How glyph pixels are sourced for a configuration in `base_dir`
    pub fn glyph_sourcing(&self, base_dir: &Path) -> GlyphSourcing {
        let glyph_dir = base_dir.join(&self.glyph_dir);
        if self.loose_glyphs {
            GlyphSourcing::Loose(glyph_dir)
        } else if self.dump_glyphs {
            GlyphSourcing::CropAndDump(glyph_dir)
        } else {
            GlyphSourcing::Crop
        }
    }
}
