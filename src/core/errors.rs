//! Error types for atlas builds
//!
//! Every variant aborts the whole run. Nothing is written to disk for a run
//! that produced one of these.

use std::path::PathBuf;
use thiserror::Error;

/// Failure categories of a single atlas build
#[derive(Debug, Error)]
pub enum AtlasError {
    /// A descriptor line did not match the expected record layout
    #[error("malformed descriptor {path}:{line}: {reason}")]
    MalformedDescriptor {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The atlas image referenced by a descriptor's page line could not be read
    #[error("missing source image {path}: {source}")]
    MissingSourceImage {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An extra glyph or loose glyph image could not be read
    #[error("missing glyph file {path}: {source}")]
    MissingGlyphFile {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The glyphs do not fit even at the maximum canvas size
    #[error("glyphs do not fit in a {max_size}x{max_size} atlas (last attempt {width}x{height})")]
    PackingOverflow {
        max_size: u32,
        width: u32,
        height: u32,
    },

    /// A `copyFrom` source names a font that was not produced earlier in the list
    #[error("copyFrom references {reference}, which has not been loaded by an earlier source")]
    UnresolvedCloneReference { reference: PathBuf },

    /// A character references a glyph that was never given an atlas position
    #[error("character {id} has no packed glyph")]
    UnplacedGlyph { id: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AtlasResult<T> = Result<T, AtlasError>;
