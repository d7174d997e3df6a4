//! Build runner
//!
//! Drives one configuration through the whole pipeline: produce every font,
//! pack and draw the shared glyphs, render the descriptors, and only then
//! write anything to disk.

use super::cli::CliArgs;
use super::config_file::BuildConfig;
use super::errors::{AtlasError, AtlasResult};
use crate::atlas::compose_atlas;
use crate::bitmap::{FsImageStore, ImageStore, PixelBuffer};
use crate::font::{produce_font, AtlasInfo, FontDescriptor, GlyphCache, GlyphSourcing};
use crate::logging;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// State that lives for exactly one build
#[derive(Debug, Default)]
pub struct RunContext {
    pub cache: GlyphCache,
    /// Fonts produced so far, in source order
    pub fonts: Vec<FontDescriptor>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all glyphs and fonts from a previous build
    pub fn reset(&mut self) {
        self.cache.reset();
        self.fonts.clear();
    }
}

/// Everything a build produces, not yet written
#[derive(Debug)]
pub struct BuildOutput {
    pub atlas: PixelBuffer,
    /// Absolute output path and text of each descriptor, in source order
    pub descriptors: Vec<(PathBuf, String)>,
}

/// Run every stage of a build in memory.
///
/// `ctx` is reset first, so glyphs never leak from an earlier build.
pub fn build_atlas(
    config: &BuildConfig,
    ctx: &mut RunContext,
    images: &mut dyn ImageStore,
    sourcing: &GlyphSourcing,
) -> AtlasResult<BuildOutput> {
    ctx.reset();

    for spec in &config.sources {
        let font = produce_font(spec, &ctx.fonts, &mut ctx.cache, images, sourcing)?;
        ctx.fonts.push(font);
    }

    let mut seen = HashSet::new();
    for font in &ctx.fonts {
        if !seen.insert(&font.output_path) {
            warn!(
                "Several fonts write to {:?}; only the last one will be kept",
                font.output_path
            );
        }
    }

    let atlas = compose_atlas(&mut ctx.cache, &config.pack)?;
    let info = AtlasInfo {
        width: atlas.width(),
        height: atlas.height(),
        page_file: config.page_file.clone(),
    };

    let descriptors = ctx
        .fonts
        .iter()
        .map(|font| {
            let text = font.serialize(&ctx.cache, &info)?;
            Ok::<_, AtlasError>((config.output_directory.join(&font.output_path), text))
        })
        .collect::<AtlasResult<Vec<_>>>()?;

    Ok(BuildOutput { atlas, descriptors })
}

fn create_parent_dir(path: &Path) -> AtlasResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| AtlasError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Hidden sibling that `path` is written to before being moved into place.
/// The extension is kept so the image encoder still recognizes it.
fn staging_path(path: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    path.with_file_name(format!(".partial-{name}"))
}

/// Staged file and its final location, in write order
type Staged = Vec<(PathBuf, PathBuf)>;

fn stage_output(
    config: &BuildConfig,
    output: &BuildOutput,
    images: &mut dyn ImageStore,
    staged: &mut Staged,
) -> AtlasResult<()> {
    let atlas_staging = staging_path(&config.output_image);
    staged.push((atlas_staging.clone(), config.output_image.clone()));
    images
        .save(&atlas_staging, &output.atlas)
        .map_err(|source| AtlasError::Io {
            path: config.output_image.clone(),
            source: std::io::Error::other(source),
        })?;

    for (path, text) in &output.descriptors {
        create_parent_dir(path)?;
        let staging = staging_path(path);
        // a repeated output path overwrites its staged text, so the last font wins
        if !staged.iter().any(|(_, target)| target == path) {
            staged.push((staging.clone(), path.clone()));
        }
        fs::write(&staging, text).map_err(|source| AtlasError::Io {
            path: path.clone(),
            source,
        })?;
    }
    Ok(())
}

fn commit_staged(staged: &Staged) -> AtlasResult<()> {
    for (staging, path) in staged {
        fs::rename(staging, path).map_err(|source| AtlasError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Wrote {:?}", path);
    }
    Ok(())
}

/// Write the atlas image and every descriptor.
///
/// Everything is first written to hidden staging files next to its target,
/// then renamed into place. A failure while staging removes the staged files
/// and leaves the previous outputs untouched.
pub fn write_output(
    config: &BuildConfig,
    output: &BuildOutput,
    images: &mut dyn ImageStore,
) -> AtlasResult<()> {
    let mut staged = Staged::new();
    let result = stage_output(config, output, images, &mut staged)
        .and_then(|()| commit_staged(&staged));

    if result.is_err() {
        for (staging, _) in &staged {
            if staging.exists() {
                if let Err(error) = fs::remove_file(staging) {
                    warn!("Could not remove staging file {:?}: {}", staging, error);
                }
            }
        }
    }
    result
}

/// Load, build, and write one configuration file
pub fn run_config(path: &Path, cli_args: &CliArgs, ctx: &mut RunContext) -> Result<()> {
    let config = BuildConfig::load(path)?;
    let sourcing = cli_args.glyph_sourcing(&config.base_dir);
    let mut images = FsImageStore;

    let output = build_atlas(&config, ctx, &mut images, &sourcing)
        .with_context(|| format!("Failed to build atlas for {}", path.display()))?;
    write_output(&config, &output, &mut images)
        .with_context(|| format!("Failed to write output for {}", path.display()))?;

    info!(
        "Built {} fonts from {} into {}x{} atlas",
        output.descriptors.len(),
        path.display(),
        output.atlas.width(),
        output.atlas.height()
    );
    Ok(())
}

/// Run the application with the given CLI arguments.
///
/// Each configuration file is an independent build; the first failure stops
/// the run.
pub fn run_app(cli_args: CliArgs) -> Result<()> {
    cli_args
        .validate()
        .map_err(|e| anyhow::anyhow!("CLI validation failed: {}", e))?;

    // keep the guard alive so file logs are flushed on exit
    let _log_guard = logging::init(cli_args.verbose, cli_args.log_file)?;

    let mut ctx = RunContext::new();
    for path in &cli_args.configs {
        run_config(path, &cli_args, &mut ctx)?;
    }
    Ok(())
}
