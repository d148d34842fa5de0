//! Glyph rasterization adapter.
//!
//! Wraps a [`FontFace`] and turns one code point at a time into a
//! luminance + alpha pixel buffer plus floating-point metrics. Whether a code
//! point is missing from the font (`None`) is kept distinct from a glyph that
//! maps but has no ink, such as a space (empty pixels, valid metrics).

use tracing::{trace, warn};

use crate::engine::{BitmapFormat, FontFace, RenderMode, RenderedBitmap};
use crate::logging::targets;
use crate::pixels::GlyphPixels;

/// Per-glyph metrics in text units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    /// Outline width.
    pub width: f32,
    /// Outline height.
    pub height: f32,
    /// Horizontal distance from the pen to the outline's left edge.
    pub bearing_x: f32,
    /// Vertical distance from the baseline to the outline's top edge.
    pub bearing_y: f32,
    /// Horizontal pen advance.
    pub advance: f32,
    /// Left edge of the quad, relative to the pen.
    pub xmin: f32,
    /// Right edge of the quad, relative to the pen.
    pub xmax: f32,
    /// Top edge of the quad relative to the baseline, y pointing down.
    pub ymin: f32,
    /// Bottom edge of the quad relative to the baseline, y pointing down.
    pub ymax: f32,
}

/// A rasterized glyph: pixels ready for packing plus its metrics.
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    pub pixels: GlyphPixels,
    pub metrics: GlyphMetrics,
}

impl RasterizedGlyph {
    /// Check if the glyph needs no texture space.
    pub fn is_blank(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Face-wide line metrics in text units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    pub line_height: f32,
    pub ascender: f32,
    pub descender: f32,
}

/// Counters for rasterization work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterStats {
    /// Glyphs the engine rendered.
    pub rasterized: u64,
    /// Lookups for code points the face does not map.
    pub not_found: u64,
    /// Glyphs the engine failed to render.
    pub failures: u64,
}

/// Rasterizes single code points from one face at one size.
///
/// Rendering mutates the face's glyph slot, so the rasterizer is neither
/// reentrant nor `Sync`.
pub struct GlyphRasterizer {
    face: Box<dyn FontFace>,
    mode: RenderMode,
    point_size: u32,
    stats: RasterStats,
}

impl GlyphRasterizer {
    /// Wrap an opened face and set its character size.
    pub fn new(mut face: Box<dyn FontFace>, point_size: u32, dpi: u32, mode: RenderMode) -> Self {
        face.set_char_size(point_size, dpi);
        Self {
            face,
            mode,
            point_size,
            stats: RasterStats::default(),
        }
    }

    /// Render mode used for every glyph.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Rasterization counters.
    pub fn stats(&self) -> &RasterStats {
        &self.stats
    }

    /// Whether the face maps `code_point` to a glyph.
    pub fn maps_code_point(&self, code_point: u32) -> bool {
        self.face.glyph_index(code_point) != 0
    }

    /// Scaled line metrics of the face.
    pub fn line_metrics(&self) -> LineMetrics {
        let metrics = self.face.size_metrics();
        LineMetrics {
            line_height: metrics.height.to_f32(),
            ascender: metrics.ascender.to_f32(),
            descender: metrics.descender.to_f32(),
        }
    }

    /// Advance of the space character.
    ///
    /// Falls back to half the point size when the face has no usable space.
    pub fn space_advance(&mut self) -> f32 {
        let fallback = self.point_size as f32 * 0.5;
        let index = self.face.glyph_index(u32::from(' '));
        if index == 0 {
            return fallback;
        }
        match self.face.load_glyph(index) {
            Ok(metrics) => metrics.hori_advance.to_f32(),
            Err(err) => {
                warn!(target: targets::RASTER, error = %err, "space glyph failed to load");
                fallback
            }
        }
    }

    /// Whether the face carries kerning data.
    pub fn has_kerning(&self) -> bool {
        self.face.has_kerning()
    }

    /// Kerning between two code points, or zero when the face has none.
    pub fn kerning(&self, left: u32, right: u32) -> f32 {
        if !self.face.has_kerning() {
            return 0.0;
        }
        let left = self.face.glyph_index(left);
        let right = self.face.glyph_index(right);
        self.face.kerning(left, right).to_f32()
    }

    /// Rasterize one code point.
    ///
    /// Returns `None` when the face has no glyph for it or the engine fails
    /// to render it.
    pub fn rasterize(&mut self, code_point: u32) -> Option<RasterizedGlyph> {
        let index = self.face.glyph_index(code_point);
        if index == 0 {
            self.stats.not_found += 1;
            trace!(target: targets::RASTER, code_point, "no glyph mapped");
            return None;
        }

        let rendered = match self.face.render_glyph(index, self.mode) {
            Ok(rendered) => rendered,
            Err(err) => {
                self.stats.failures += 1;
                warn!(target: targets::RASTER, code_point, error = %err, "glyph failed to load");
                return None;
            }
        };
        self.stats.rasterized += 1;

        let slot = rendered.metrics;
        let bitmap = &rendered.bitmap;
        let width = slot.width.to_f32();
        let height = slot.height.to_f32();
        let xmin = bitmap.left as f32;
        // Engine rows grow upward from the baseline; quads grow downward.
        let ymin = -(bitmap.top as f32);
        let metrics = GlyphMetrics {
            width,
            height,
            bearing_x: slot.hori_bearing_x.to_f32(),
            bearing_y: slot.hori_bearing_y.to_f32(),
            advance: slot.hori_advance.to_f32(),
            xmin,
            xmax: xmin + width,
            ymin,
            ymax: ymin + height,
        };

        Some(RasterizedGlyph {
            pixels: expand_bitmap(bitmap),
            metrics,
        })
    }
}

impl std::fmt::Debug for GlyphRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphRasterizer")
            .field("mode", &self.mode)
            .field("point_size", &self.point_size)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Convert an engine bitmap to white pixels with coverage in alpha.
pub fn expand_bitmap(bitmap: &RenderedBitmap) -> GlyphPixels {
    if bitmap.width == 0 || bitmap.rows == 0 {
        return GlyphPixels::empty();
    }
    let mut pixels = GlyphPixels::new(bitmap.width, bitmap.rows);
    for y in 0..bitmap.rows {
        let row = y as usize * bitmap.pitch;
        for x in 0..bitmap.width {
            let alpha = match bitmap.format {
                BitmapFormat::Gray8 => byte_at(&bitmap.buffer, row + x as usize),
                BitmapFormat::Mono1 => {
                    let byte = byte_at(&bitmap.buffer, row + x as usize / 8);
                    if byte & (0x80 >> (x % 8)) != 0 { 255 } else { 0 }
                }
            };
            pixels.set_coverage(x, y, alpha);
        }
    }
    pixels
}

fn byte_at(buffer: &[u8], index: usize) -> u8 {
    buffer.get(index).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FontEngine;
    use crate::testing::MockFontEngine;
    use std::path::Path;

    fn rasterizer(engine: &MockFontEngine, mode: RenderMode) -> GlyphRasterizer {
        let face = engine.open_face(Path::new("mock.ttf")).unwrap();
        GlyphRasterizer::new(face, 16, 96, mode)
    }

    #[test]
    fn gray_coverage_goes_to_alpha() {
        let bitmap = RenderedBitmap {
            width: 2,
            rows: 2,
            pitch: 3,
            format: BitmapFormat::Gray8,
            buffer: vec![10, 20, 99, 30, 40, 99],
            left: 0,
            top: 0,
        };
        let pixels = expand_bitmap(&bitmap);
        assert_eq!(pixels.pixel(0, 0), [255, 10]);
        assert_eq!(pixels.pixel(1, 0), [255, 20]);
        assert_eq!(pixels.pixel(0, 1), [255, 30]);
        assert_eq!(pixels.pixel(1, 1), [255, 40]);
    }

    #[test]
    fn mono_unpacks_msb_first() {
        let bitmap = RenderedBitmap {
            width: 10,
            rows: 1,
            pitch: 2,
            format: BitmapFormat::Mono1,
            buffer: vec![0b1010_0000, 0b0100_0000],
            left: 0,
            top: 0,
        };
        let pixels = expand_bitmap(&bitmap);
        let alphas: Vec<u8> = (0..10).map(|x| pixels.pixel(x, 0)[1]).collect();
        assert_eq!(alphas, vec![255, 0, 255, 0, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn unmapped_code_point_is_not_found() {
        let engine = MockFontEngine::new();
        let mut raster = rasterizer(&engine, RenderMode::Antialiased);
        assert!(raster.rasterize(0xE000).is_none());
        assert_eq!(raster.stats().not_found, 1);
        assert_eq!(engine.rasterizations(), 0);
    }

    #[test]
    fn space_is_blank_with_metrics() {
        let engine = MockFontEngine::new();
        let mut raster = rasterizer(&engine, RenderMode::Antialiased);
        let space = raster.rasterize(u32::from(' ')).unwrap();
        assert!(space.is_blank());
        assert!(space.metrics.advance > 0.0);
    }

    #[test]
    fn bounding_box_is_derived_from_bitmap_placement() {
        let engine = MockFontEngine::new().glyph_size(8, 12);
        let mut raster = rasterizer(&engine, RenderMode::Antialiased);
        let glyph = raster.rasterize(u32::from('A')).unwrap();
        let m = glyph.metrics;
        assert_eq!(m.xmin, 1.0);
        assert_eq!(m.xmax, m.xmin + m.width);
        assert_eq!(m.ymin, -12.0);
        assert_eq!(m.ymax, 0.0);
        assert_eq!(glyph.pixels.width(), 8);
        assert_eq!(glyph.pixels.height(), 12);
    }

    #[test]
    fn mono_mode_produces_binary_alpha() {
        let engine = MockFontEngine::new();
        let mut raster = rasterizer(&engine, RenderMode::Mono);
        let glyph = raster.rasterize(u32::from('B')).unwrap();
        let bytes = glyph.pixels.as_bytes();
        assert!(bytes.chunks_exact(2).all(|p| p[0] == 255 && (p[1] == 0 || p[1] == 255)));
    }

    #[test]
    fn kerning_is_zero_without_table() {
        let engine = MockFontEngine::new();
        let raster = rasterizer(&engine, RenderMode::Antialiased);
        assert!(!raster.has_kerning());
        assert_eq!(raster.kerning(u32::from('A'), u32::from('V')), 0.0);

        let kerned = MockFontEngine::new().kerning_pair('A', 'V', -2.0);
        let raster = rasterizer(&kerned, RenderMode::Antialiased);
        assert_eq!(raster.kerning(u32::from('A'), u32::from('V')), -2.0);
        assert_eq!(raster.kerning(u32::from('V'), u32::from('A')), 0.0);
    }

    #[test]
    fn space_advance_falls_back_to_half_point_size() {
        let engine = MockFontEngine::new().without_space();
        let mut raster = rasterizer(&engine, RenderMode::Antialiased);
        assert_eq!(raster.space_advance(), 8.0);
    }
}
