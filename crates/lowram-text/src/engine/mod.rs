//! Font engine interface consumed by the rasterizer.
//!
//! A [`FontEngine`] is the library handle: it opens font files and hands out
//! [`FontFace`]s. Faces keep their engine's shared state alive, so a cache
//! that owns faces can be dropped in any order relative to the engine value
//! it was created with.
//!
//! Metric values cross this boundary in 26.6 fixed point, the unit most
//! native engines report in. The [`GlyphRasterizer`](crate::GlyphRasterizer)
//! converts them to floating point.

mod swash_engine;

use std::path::Path;

use crate::error::FontEngineError;

pub use swash_engine::SwashEngine;

/// A 26.6 fixed-point value (1/64 units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed26Dot6(pub i64);

impl Fixed26Dot6 {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Convert from floating point, rounding to the nearest 1/64.
    pub fn from_f32(value: f32) -> Self {
        Self((value * 64.0).round() as i64)
    }

    /// Convert from whole pixels.
    pub const fn from_int(value: i32) -> Self {
        Self((value as i64) << 6)
    }

    /// Convert to floating point.
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 64.0
    }
}

/// How a glyph is rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// 8-bit coverage per pixel.
    #[default]
    Antialiased,
    /// 1-bit coverage per pixel, packed most significant bit first.
    Mono,
}

impl RenderMode {
    /// The mode matching an antialiasing flag.
    pub fn from_antialiased(antialiased: bool) -> Self {
        if antialiased {
            RenderMode::Antialiased
        } else {
            RenderMode::Mono
        }
    }
}

/// Layout of the bytes in a [`RenderedBitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitmapFormat {
    /// One coverage byte per pixel.
    Gray8,
    /// One coverage bit per pixel, MSB first within each byte.
    Mono1,
}

/// A bitmap produced by the engine for one glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBitmap {
    /// Width in pixels.
    pub width: u32,
    /// Number of rows.
    pub rows: u32,
    /// Bytes per row in `buffer`.
    pub pitch: usize,
    /// Pixel layout.
    pub format: BitmapFormat,
    /// Row-major coverage data.
    pub buffer: Vec<u8>,
    /// Distance from the pen position to the leftmost bitmap column.
    pub left: i32,
    /// Distance from the baseline up to the topmost bitmap row.
    pub top: i32,
}

impl RenderedBitmap {
    /// A zero-sized bitmap, as produced for whitespace.
    pub fn empty(format: BitmapFormat) -> Self {
        Self {
            width: 0,
            rows: 0,
            pitch: 0,
            format,
            buffer: Vec::new(),
            left: 0,
            top: 0,
        }
    }
}

/// Per-glyph metrics as loaded into the engine's glyph slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotMetrics {
    pub width: Fixed26Dot6,
    pub height: Fixed26Dot6,
    pub hori_bearing_x: Fixed26Dot6,
    pub hori_bearing_y: Fixed26Dot6,
    pub hori_advance: Fixed26Dot6,
}

/// Output of [`FontFace::render_glyph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGlyph {
    pub bitmap: RenderedBitmap,
    pub metrics: SlotMetrics,
}

/// Scaled face-wide metrics for the current character size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeMetrics {
    /// Baseline-to-baseline distance.
    pub height: Fixed26Dot6,
    /// Distance from the baseline to the top of the tallest glyphs.
    pub ascender: Fixed26Dot6,
    /// Distance from the baseline to the bottom of the lowest glyphs (negative).
    pub descender: Fixed26Dot6,
    /// Pixels per em vertically.
    pub y_ppem: u16,
}

/// A font engine library handle.
pub trait FontEngine {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Open the first face of the font file at `path`.
    fn open_face(&self, path: &Path) -> Result<Box<dyn FontFace>, FontEngineError>;
}

/// One opened font face.
///
/// Rendering mutates the face's internal glyph slot, so faces are neither
/// reentrant nor shareable across threads.
pub trait FontFace {
    /// Set the character size in points at the given DPI.
    fn set_char_size(&mut self, point_size: u32, dpi: u32);

    /// Face-wide metrics at the current size.
    fn size_metrics(&self) -> SizeMetrics;

    /// Glyph index for a code point; `0` when the face has no mapping.
    fn glyph_index(&self, code_point: u32) -> u32;

    /// Load a glyph's metrics without rendering it. Hinting is off.
    fn load_glyph(&mut self, glyph_index: u32) -> Result<SlotMetrics, FontEngineError>;

    /// Load and render a glyph. Hinting is off.
    fn render_glyph(
        &mut self,
        glyph_index: u32,
        mode: RenderMode,
    ) -> Result<RenderedGlyph, FontEngineError>;

    /// Whether the face carries horizontal kerning data.
    fn has_kerning(&self) -> bool;

    /// Unfitted horizontal kerning between two glyph indices.
    fn kerning(&self, left: u32, right: u32) -> Fixed26Dot6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_conversion() {
        assert_eq!(Fixed26Dot6(64).to_f32(), 1.0);
        assert_eq!(Fixed26Dot6(-96).to_f32(), -1.5);
        assert_eq!(Fixed26Dot6::from_f32(2.25), Fixed26Dot6(144));
        assert_eq!(Fixed26Dot6::from_int(3), Fixed26Dot6(192));
    }

    #[test]
    fn render_mode_from_flag() {
        assert_eq!(RenderMode::from_antialiased(true), RenderMode::Antialiased);
        assert_eq!(RenderMode::from_antialiased(false), RenderMode::Mono);
    }
}
