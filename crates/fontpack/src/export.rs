//! Metric export
//!
//! Serializes a packed atlas's glyph table so renderers can look up UVs and
//! pen metrics by code point.

use crate::atlas::{GlyphMetric, PackedAtlas};
use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Serializable description of a packed atlas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasMetadata {
    /// File name of the texture this table describes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Side length of the square texture
    pub atlas_size: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub padding: u32,
    /// Grid cell size (largest glyph bitmap)
    pub box_width: u32,
    pub box_height: u32,
    /// Glyphs keyed by code point, in packing order
    pub glyphs: IndexMap<u32, GlyphMetric>,
}

impl AtlasMetadata {
    pub fn from_atlas(atlas: &PackedAtlas, image: Option<String>) -> Self {
        let params = atlas.params();
        let (box_width, box_height) = atlas.box_size();
        Self {
            image,
            atlas_size: atlas.dimension(),
            cell_width: params.cell_width,
            cell_height: params.cell_height,
            padding: params.padding,
            box_width,
            box_height,
            glyphs: atlas.glyphs().clone(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| std::io::Error::from(e).into())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| std::io::Error::from(e).into())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::debug!("Wrote {} glyph metrics to {}", self.glyphs.len(), path.display());
        Ok(())
    }
}

impl PackedAtlas {
    /// Metadata for this atlas, optionally naming its texture file
    pub fn metadata(&self, image: Option<String>) -> AtlasMetadata {
        AtlasMetadata::from_atlas(self, image)
    }
}

impl fmt::Display for GlyphMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uv=({:.6}, {:.6}, {:.6}, {:.6}) size={}x{} advance=({}, {}) bearing=({}, {})",
            self.uv.left,
            self.uv.top,
            self.uv.right,
            self.uv.bottom,
            self.width,
            self.height,
            self.advance_x,
            self.advance_y,
            self.bearing_x,
            self.bearing_y
        )
    }
}

/// Printable label for a code point: the character itself when it is
/// visible, otherwise its `U+XXXX` form
pub fn code_point_label(code_point: u32) -> String {
    match char::from_u32(code_point) {
        Some(c) if !c.is_control() && !c.is_whitespace() => format!("'{}'", c),
        _ => format!("U+{:04X}", code_point),
    }
}
