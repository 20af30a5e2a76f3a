//! Glyph atlas packing
//!
//! Lays glyphs out on a uniform grid inside a square, power-of-two RGBA
//! texture. Every cell is the size of the largest glyph bitmap; glyphs are
//! aligned on a shared baseline within their cell. Coverage goes into the
//! alpha channel with white RGB so renderers can tint by multiplication.

use crate::charset::CharSet;
use crate::rasterizer::{GlyphSource, RasterGlyph};
use crate::{FontpackError, Result};
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest atlas side length
pub const MIN_ATLAS_DIMENSION: u32 = 128;

/// Largest atlas side length (a 1 GiB RGBA texture)
pub const MAX_ATLAS_DIMENSION: u32 = 16384;

/// Nominal cell size and spacing for a packing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasParams {
    /// Nominal glyph width in pixels
    pub cell_width: u32,
    /// Nominal glyph height in pixels
    pub cell_height: u32,
    /// Gap added after each column
    pub padding: u32,
}

impl AtlasParams {
    /// Params with no padding; a `cell_height` of zero means "same as width"
    pub fn new(cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width,
            cell_height: if cell_height == 0 { cell_width } else { cell_height },
            padding: 0,
        }
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(FontpackError::InvalidArgument(format!(
                "cell size must be positive, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        Ok(())
    }
}

/// Normalized texture coordinates of a glyph cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl UvRect {
    /// UV bounds of a pixel rectangle in a square atlas of side `dimension`
    pub fn from_pixels(x: u32, y: u32, width: u32, height: u32, dimension: u32) -> Self {
        let dim = dimension as f32;
        Self {
            left: x as f32 / dim,
            top: y as f32 / dim,
            right: (x + width) as f32 / dim,
            bottom: (y + height) as f32 / dim,
        }
    }

    /// Whether the rectangle has no area (whitespace glyphs)
    pub fn is_degenerate(&self) -> bool {
        self.left == self.right || self.top == self.bottom
    }
}

/// Placement and typographic metrics of one packed glyph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphMetric {
    pub uv: UvRect,
    /// Cell origin in atlas pixels
    pub x: u32,
    pub y: u32,
    /// Glyph bitmap size in pixels
    pub width: u32,
    pub height: u32,
    /// Pen advance in pixels
    pub advance_x: f32,
    pub advance_y: f32,
    /// Bitmap offset from pen position / baseline in pixels
    pub bearing_x: i32,
    pub bearing_y: i32,
}

/// Finished atlas: texture plus per-code-point metrics
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    image: RgbaImage,
    dimension: u32,
    box_width: u32,
    box_height: u32,
    params: AtlasParams,
    glyphs: IndexMap<u32, GlyphMetric>,
}

impl PackedAtlas {
    /// Side length of the square texture
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Largest glyph bitmap size, i.e. the grid cell size
    pub fn box_size(&self) -> (u32, u32) {
        (self.box_width, self.box_height)
    }

    pub fn params(&self) -> &AtlasParams {
        &self.params
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Metrics for every packed code point, in packing order
    pub fn glyphs(&self) -> &IndexMap<u32, GlyphMetric> {
        &self.glyphs
    }

    pub fn metric(&self, code_point: u32) -> Option<&GlyphMetric> {
        self.glyphs.get(&code_point)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Encode the texture as PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| FontpackError::ImageSave(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Wrote {}x{} atlas to {}", self.dimension, self.dimension, path.display());
        Ok(())
    }
}

/// Smallest power-of-two side length (at least 128) whose area holds
/// `glyph_count` square cells of side `max_cell_dim`
///
/// Returns `None` when that side would exceed [`MAX_ATLAS_DIMENSION`].
pub fn atlas_dimension(max_cell_dim: u32, glyph_count: usize) -> Option<u32> {
    let required = (max_cell_dim as u64)
        .pow(2)
        .checked_mul(glyph_count as u64)?;
    let mut dim = MIN_ATLAS_DIMENSION as u64;
    while dim * dim < required {
        if dim >= MAX_ATLAS_DIMENSION as u64 {
            return None;
        }
        dim *= 2;
    }
    Some(dim as u32)
}

/// Grid cursor: columns advance by box width plus padding, rows by box
/// height alone, and wrapped rows restart at x = 0.
///
/// Coordinates are kept in u64 so large paddings cannot overflow.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    x: u64,
    y: u64,
    box_width: u64,
    box_height: u64,
    padding: u64,
    dimension: u64,
}

impl Cursor {
    fn new(box_width: u32, box_height: u32, padding: u32, dimension: u32) -> Self {
        Self {
            x: padding as u64,
            y: padding as u64,
            box_width: box_width as u64,
            box_height: box_height as u64,
            padding: padding as u64,
            dimension: dimension as u64,
        }
    }

    /// Current position; only valid once `cell_fits` holds
    fn position(&self) -> (u32, u32) {
        (self.x as u32, self.y as u32)
    }

    fn advance(&mut self) {
        self.x += self.box_width + self.padding;
        if self.x + self.box_width > self.dimension {
            self.x = 0;
            self.y += self.box_height;
        }
    }

    /// Whether a full cell at the current position stays inside the atlas
    fn cell_fits(&self) -> bool {
        self.x + self.box_width <= self.dimension && self.y + self.box_height <= self.dimension
    }
}

/// Whether `count` cells laid out by the cursor rule all fit in `dimension`
fn grid_fits(box_width: u32, box_height: u32, padding: u32, count: usize, dimension: u32) -> bool {
    let mut cursor = Cursor::new(box_width, box_height, padding, dimension);
    for _ in 0..count {
        if !cursor.cell_fits() {
            return false;
        }
        cursor.advance();
    }
    true
}

/// Rasterize every code point in `code_points` and pack them into one atlas
///
/// Runs two passes over the request: the first measures every glyph to size
/// the grid, the second rasterizes again and blits. Any rasterization
/// failure aborts the whole build.
pub fn build_atlas<S: GlyphSource + ?Sized>(
    source: &mut S,
    params: &AtlasParams,
    code_points: &CharSet,
) -> Result<PackedAtlas> {
    params.validate()?;
    if code_points.is_empty() {
        return Err(FontpackError::InvalidArgument(
            "no code points requested".to_string(),
        ));
    }
    let padding = params.padding;

    // Pass 1: measure
    let mut max_char_width = 0u32;
    let mut max_char_height = 0u32;
    let mut total_width = 0u64;
    for code_point in code_points.iter() {
        let glyph = rasterize_checked(source, code_point)?;
        max_char_width = max_char_width.max(glyph.width);
        max_char_height = max_char_height.max(glyph.height);
        total_width += glyph.width as u64 + padding as u64;
    }
    tracing::debug!(
        "Measured {} glyphs, single-row width would be {}px",
        code_points.len(),
        total_width + padding as u64
    );

    let max_cell_dim = max_char_width.max(max_char_height);
    let too_large = || {
        FontpackError::InvalidArgument(format!(
            "{} cells of {}x{} with padding {} do not fit in a {}x{} atlas",
            code_points.len(),
            max_char_width,
            max_char_height,
            padding,
            MAX_ATLAS_DIMENSION,
            MAX_ATLAS_DIMENSION
        ))
    };
    let mut dimension = atlas_dimension(max_cell_dim, code_points.len()).ok_or_else(too_large)?;
    while !grid_fits(max_char_width, max_char_height, padding, code_points.len(), dimension) {
        dimension = dimension
            .checked_mul(2)
            .filter(|d| *d <= MAX_ATLAS_DIMENSION)
            .ok_or_else(too_large)?;
    }
    tracing::info!("atlas size {}x{}", dimension, dimension);
    tracing::info!("box_size {}x{}", max_char_width, max_char_height);

    let mut image = RgbaImage::from_pixel(dimension, dimension, Rgba([0, 0, 0, 0]));
    let mut glyphs = IndexMap::with_capacity(code_points.len());
    let mut cursor = Cursor::new(max_char_width, max_char_height, padding, dimension);

    // Pass 2: place and blit
    for code_point in code_points.iter() {
        let glyph = rasterize_checked(source, code_point)?;
        let (cell_x, cell_y) = cursor.position();
        if glyph.width > max_char_width || glyph.height > max_char_height {
            return Err(FontpackError::GlyphRaster {
                code_point,
                reason: format!(
                    "bitmap grew to {}x{} after measuring",
                    glyph.width, glyph.height
                ),
            });
        }

        let (width, height) = if glyph.is_empty() {
            (0, 0)
        } else {
            (glyph.width, glyph.height)
        };

        if glyph.is_empty() {
            tracing::trace!("U+{:04X} has no pixels, skipping blit", code_point);
        } else {
            let tile = coverage_tile(&glyph);
            // Baseline alignment within the cell; the -1 keeps parity with
            // existing atlases.
            let offset_x = cell_x as i64 + glyph.bearing_x as i64;
            let offset_y = cell_y as i64 + (max_char_height as i64 - glyph.bearing_y as i64) - 1;
            // Source-over paste, clipped to the atlas
            imageops::overlay(&mut image, &tile, offset_x, offset_y);
            tracing::debug!(
                "U+{:04X} {}x{} at cell ({}, {}), blit ({}, {})",
                code_point,
                width,
                height,
                cell_x,
                cell_y,
                offset_x,
                offset_y
            );
        }

        glyphs.insert(
            code_point,
            GlyphMetric {
                uv: UvRect::from_pixels(cell_x, cell_y, width, height, dimension),
                x: cell_x,
                y: cell_y,
                width,
                height,
                advance_x: glyph.advance_x as f32 / 64.0,
                advance_y: glyph.advance_y as f32 / 64.0,
                bearing_x: glyph.bearing_x,
                bearing_y: glyph.bearing_y,
            },
        );

        cursor.advance();
    }

    Ok(PackedAtlas {
        image,
        dimension,
        box_width: max_char_width,
        box_height: max_char_height,
        params: *params,
        glyphs,
    })
}

fn rasterize_checked<S: GlyphSource + ?Sized>(source: &mut S, code_point: u32) -> Result<RasterGlyph> {
    let glyph = source.rasterize(code_point)?;
    let expected = glyph.width as usize * glyph.height as usize;
    if glyph.coverage.len() < expected {
        return Err(FontpackError::GlyphRaster {
            code_point,
            reason: format!(
                "bitmap buffer holds {} bytes, expected {}",
                glyph.coverage.len(),
                expected
            ),
        });
    }
    Ok(glyph)
}

/// White RGBA tile whose alpha is the glyph's coverage
fn coverage_tile(glyph: &RasterGlyph) -> RgbaImage {
    let width = glyph.width;
    RgbaImage::from_fn(glyph.width, glyph.height, |x, y| {
        Rgba([255, 255, 255, glyph.coverage[(y * width + x) as usize]])
    })
}
