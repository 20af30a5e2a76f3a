//! Font loading
//!
//! Parses TrueType/OpenType faces via ttf-parser and keeps the raw data alive
//! for the rasterizer.

use crate::{FontpackError, Result};
use std::path::Path;
use std::sync::Arc;

/// Face-wide metrics in font units
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    /// Units per em (typically 1000 or 2048)
    pub units_per_em: u16,
    /// Distance from baseline to top of tallest glyph
    pub ascender: i16,
    /// Distance from baseline to bottom, typically negative
    pub descender: i16,
    /// Additional spacing between lines
    pub line_gap: i16,
}

/// A parsed font face
#[derive(Clone)]
pub struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    metrics: FontMetrics,
    glyph_count: u16,
    family_name: String,
}

impl FontFace {
    /// Load a font from raw TTF/OTF data (uses face index 0)
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        Self::from_data_with_index(data, 0)
    }

    /// Load a font from raw TTF/OTF data with a specific face index
    ///
    /// For TTC collections, different indices select different faces.
    pub fn from_data_with_index(data: Vec<u8>, face_index: u32) -> Result<Self> {
        let data = Arc::new(data);

        let face = ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| FontpackError::FontLoad(format!("{:?}", e)))?;

        let metrics = FontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        };

        let family_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::FAMILY)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let glyph_count = face.number_of_glyphs();

        tracing::debug!(
            "Parsed font '{}' (face {}, {} glyphs, {} upem)",
            family_name,
            face_index,
            glyph_count,
            metrics.units_per_em
        );

        Ok(Self {
            data,
            face_index,
            metrics,
            glyph_count,
            family_name,
        })
    }

    /// Load a font from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            FontpackError::FontLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_data(data)
    }

    /// Raw font data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    pub fn family_name(&self) -> &str {
        &self.family_name
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("family_name", &self.family_name)
            .field("face_index", &self.face_index)
            .field("glyph_count", &self.glyph_count)
            .finish()
    }
}
