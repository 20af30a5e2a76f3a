//! Bitmap font atlas packing
//!
//! This crate provides:
//! - Font loading and parsing (TTF/OTF via ttf-parser)
//! - Glyph rasterization at a fixed pixel size (swash)
//! - Code point set construction and range parsing
//! - Uniform-grid atlas packing into a square RGBA texture
//! - Per-glyph UV/metric export (JSON via serde)

pub mod font;
pub mod rasterizer;
pub mod charset;
pub mod atlas;
pub mod export;

pub use font::{FontFace, FontMetrics};
pub use rasterizer::{GlyphSource, MissingGlyph, RasterGlyph, SwashRasterizer};
pub use charset::CharSet;
pub use atlas::{atlas_dimension, build_atlas, AtlasParams, GlyphMetric, PackedAtlas, UvRect};
pub use export::{code_point_label, AtlasMetadata};

use thiserror::Error;

/// Atlas packing errors
#[derive(Error, Debug)]
pub enum FontpackError {
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("Failed to rasterize code point U+{code_point:04X}: {reason}")]
    GlyphRaster { code_point: u32, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to save atlas image: {0}")]
    ImageSave(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FontpackError>;
