//! Glyph rasterization using swash
//!
//! Produces 8-bit coverage bitmaps plus FreeType-style metrics (bearings in
//! whole pixels, advances in 26.6 fixed point) for the atlas builder.

use crate::font::FontFace;
use crate::{FontpackError, Result};
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Transform};

/// Rasterized glyph bitmap with metrics
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RasterGlyph {
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Coverage values, one byte per pixel, row-major
    pub coverage: Vec<u8>,
    /// Offset from pen position to the bitmap's left edge
    pub bearing_x: i32,
    /// Offset from baseline up to the bitmap's top edge
    pub bearing_y: i32,
    /// Horizontal pen advance in 1/64 pixel units
    pub advance_x: i32,
    /// Vertical pen advance in 1/64 pixel units
    pub advance_y: i32,
}

impl RasterGlyph {
    /// Whether the glyph covers no pixels (e.g. whitespace)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Source of rasterized glyphs, keyed by code point
///
/// Rasterization must be deterministic: the atlas builder rasterizes every
/// code point twice and expects identical results.
pub trait GlyphSource {
    fn rasterize(&mut self, code_point: u32) -> Result<RasterGlyph>;
}

/// What to do with code points the font has no glyph for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingGlyph {
    /// Render the font's `.notdef` glyph in its place
    #[default]
    Notdef,
    /// Fail with a raster error
    Error,
}

/// Glyph rasterizer using swash
pub struct SwashRasterizer<'a> {
    font: &'a FontFace,
    /// Parsed once; holds the cmap and metrics tables
    swash_font: swash::FontRef<'a>,
    units_per_em: f32,
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    width_px: u32,
    height_px: u32,
    missing: MissingGlyph,
}

impl<'a> SwashRasterizer<'a> {
    /// Create a rasterizer for `font`; call `set_pixel_size` before use
    pub fn new(font: &'a FontFace) -> Result<Self> {
        let swash_font = swash::FontRef::from_index(font.data(), font.face_index() as usize)
            .ok_or_else(|| FontpackError::FontLoad("invalid font data".to_string()))?;
        let units_per_em = swash_font.metrics(&[]).units_per_em;
        if units_per_em == 0 {
            return Err(FontpackError::FontLoad(
                "font reports zero units per em".to_string(),
            ));
        }
        Ok(Self {
            font,
            swash_font,
            units_per_em: units_per_em as f32,
            scale_context: ScaleContext::new(),
            width_px: 0,
            height_px: 0,
            missing: MissingGlyph::default(),
        })
    }

    /// Set the nominal glyph size in pixels
    ///
    /// A `height` of zero means "same as width".
    pub fn set_pixel_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 {
            return Err(FontpackError::FontLoad(
                "pixel width must be greater than zero".to_string(),
            ));
        }
        self.width_px = width;
        self.height_px = if height == 0 { width } else { height };
        tracing::debug!(
            "Pixel size for '{}' set to {}x{}",
            self.font.family_name(),
            self.width_px,
            self.height_px
        );
        Ok(())
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    pub fn with_missing_glyph(mut self, missing: MissingGlyph) -> Self {
        self.missing = missing;
        self
    }

    fn resolve_glyph(&self, code_point: u32) -> Result<u16> {
        if char::from_u32(code_point).is_none() {
            return Err(FontpackError::GlyphRaster {
                code_point,
                reason: "not a Unicode scalar value".to_string(),
            });
        }
        // Glyph 0 is .notdef, which the cmap returns for unmapped code points
        match (self.swash_font.charmap().map(code_point), self.missing) {
            (id, _) if id != 0 => Ok(id),
            (_, MissingGlyph::Notdef) => {
                tracing::trace!("U+{:04X} unmapped, using .notdef", code_point);
                Ok(0)
            }
            (_, MissingGlyph::Error) => Err(FontpackError::GlyphRaster {
                code_point,
                reason: format!("font '{}' has no glyph for it", self.font.family_name()),
            }),
        }
    }
}

impl GlyphSource for SwashRasterizer<'_> {
    fn rasterize(&mut self, code_point: u32) -> Result<RasterGlyph> {
        if self.width_px == 0 {
            return Err(FontpackError::FontLoad(
                "pixel size has not been set".to_string(),
            ));
        }
        let glyph_id = self.resolve_glyph(code_point)?;

        let size = self.height_px as f32;
        let x_scale = self.width_px as f32 / self.height_px as f32;

        let mut scaler = self.scale_context.builder(self.swash_font).size(size).build();

        // Advance from font units, scaled by the horizontal ppem
        let advance = self.swash_font.glyph_metrics(&[]).advance_width(glyph_id)
            * self.width_px as f32
            / self.units_per_em;
        let advance_x = (advance * 64.0).round() as i32;

        let mut render = Render::new(&[Source::Outline, Source::Bitmap(StrikeWith::BestFit)]);
        render.format(Format::Alpha);
        if self.width_px != self.height_px {
            render.transform(Some(Transform::scale(x_scale, 1.0)));
        }

        let Some(image) = render.render(&mut scaler, glyph_id) else {
            // Empty glyph (like space) - no bitmap but has advance
            return Ok(RasterGlyph {
                advance_x,
                ..RasterGlyph::default()
            });
        };

        let width = image.placement.width;
        let height = image.placement.height;
        if width == 0 || height == 0 {
            return Ok(RasterGlyph {
                advance_x,
                ..RasterGlyph::default()
            });
        }

        let pixels = (width * height) as usize;
        let coverage = match image.content {
            Content::Mask => image.data,
            // Keep only the alpha channel of color strikes
            Content::Color => image.data.chunks_exact(4).map(|px| px[3]).collect(),
            Content::SubpixelMask => image
                .data
                .chunks_exact(4)
                .map(|px| px[0].max(px[1]).max(px[2]))
                .collect(),
        };
        if coverage.len() < pixels {
            return Err(FontpackError::GlyphRaster {
                code_point,
                reason: format!(
                    "bitmap buffer holds {} bytes, expected {}",
                    coverage.len(),
                    pixels
                ),
            });
        }

        Ok(RasterGlyph {
            width,
            height,
            coverage,
            bearing_x: image.placement.left,
            bearing_y: image.placement.top,
            advance_x,
            advance_y: 0,
        })
    }
}
