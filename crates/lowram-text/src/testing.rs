//! Test doubles for the font engine.
//!
//! [`MockFontEngine`] produces deterministic box glyphs without reading any
//! font data. Every glyph's coverage follows [`MockFontEngine::expected_alpha`],
//! so tests can check that pixels survive packing and page growth.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::engine::{
    BitmapFormat, Fixed26Dot6, FontEngine, FontFace, RenderMode, RenderedBitmap, RenderedGlyph,
    SizeMetrics, SlotMetrics,
};
use crate::error::FontEngineError;

/// First code point of the Basic Multilingual Plane private use area.
pub const PRIVATE_USE_START: u32 = 0xE000;
/// Last code point of the Basic Multilingual Plane private use area.
pub const PRIVATE_USE_END: u32 = 0xF8FF;

#[derive(Debug, Clone)]
struct MockConfig {
    glyph_width: u32,
    glyph_height: u32,
    sized: Vec<(u32, u32, u32)>,
    space_advance: f32,
    map_space: bool,
    unmapped: Vec<u32>,
    failing_glyphs: Vec<u32>,
    failing_files: Vec<PathBuf>,
    kerning: Vec<(u32, u32, f32)>,
}

#[derive(Debug, Default)]
struct MockCounters {
    rasterizations: Cell<u64>,
    faces_opened: Cell<u64>,
    live_faces: Cell<usize>,
}

/// Font engine producing synthetic glyphs.
///
/// - Code points in the private use area are unmapped.
/// - Whitespace maps to glyphs without pixels.
/// - Every other code point maps to a `glyph_width × glyph_height` box.
///
/// Clones share counters, so a clone kept by a test observes the work done
/// by the clone handed to a cache.
#[derive(Debug, Clone)]
pub struct MockFontEngine {
    config: MockConfig,
    counters: Rc<MockCounters>,
}

impl Default for MockFontEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFontEngine {
    pub fn new() -> Self {
        Self {
            config: MockConfig {
                glyph_width: 10,
                glyph_height: 14,
                sized: Vec::new(),
                space_advance: 5.0,
                map_space: true,
                unmapped: Vec::new(),
                failing_glyphs: Vec::new(),
                failing_files: Vec::new(),
                kerning: Vec::new(),
            },
            counters: Rc::new(MockCounters::default()),
        }
    }

    /// Pixel size of every non-blank glyph.
    #[must_use]
    pub fn glyph_size(mut self, width: u32, height: u32) -> Self {
        self.config.glyph_width = width;
        self.config.glyph_height = height;
        self
    }

    /// Pixel size of one character's glyph, overriding [`glyph_size`](Self::glyph_size).
    #[must_use]
    pub fn glyph_size_for(mut self, ch: char, width: u32, height: u32) -> Self {
        self.config.sized.push((u32::from(ch), width, height));
        self
    }

    /// Leave the space character unmapped.
    #[must_use]
    pub fn without_space(mut self) -> Self {
        self.config.map_space = false;
        self
    }

    /// Leave a character unmapped.
    #[must_use]
    pub fn unmapped(mut self, ch: char) -> Self {
        self.config.unmapped.push(u32::from(ch));
        self
    }

    /// Make rendering a character fail.
    #[must_use]
    pub fn failing_glyph(mut self, ch: char) -> Self {
        self.config.failing_glyphs.push(u32::from(ch));
        self
    }

    /// Make opening any file with this name fail.
    #[must_use]
    pub fn failing_file(mut self, file_name: impl Into<PathBuf>) -> Self {
        self.config.failing_files.push(file_name.into());
        self
    }

    /// Add a kerning pair in pixels.
    #[must_use]
    pub fn kerning_pair(mut self, left: char, right: char, offset: f32) -> Self {
        self.config
            .kerning
            .push((u32::from(left), u32::from(right), offset));
        self
    }

    /// Glyphs rendered by all faces of this engine.
    pub fn rasterizations(&self) -> u64 {
        self.counters.rasterizations.get()
    }

    /// Faces opened over the engine's lifetime.
    pub fn faces_opened(&self) -> u64 {
        self.counters.faces_opened.get()
    }

    /// Faces currently alive.
    pub fn live_faces(&self) -> usize {
        self.counters.live_faces.get()
    }

    /// Coverage the mock writes at `(x, y)` of a code point's bitmap. Never zero.
    pub fn expected_alpha(code_point: u32, x: u32, y: u32) -> u8 {
        let mix = code_point
            .wrapping_mul(31)
            .wrapping_add(x * 7)
            .wrapping_add(y * 13);
        (1 + mix % 255) as u8
    }
}

impl FontEngine for MockFontEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn open_face(&self, path: &Path) -> Result<Box<dyn FontFace>, FontEngineError> {
        let failing = path
            .file_name()
            .is_some_and(|name| self.config.failing_files.iter().any(|f| f.as_os_str() == name));
        if failing {
            return Err(FontEngineError::InvalidFormat(format!(
                "mock refuses {}",
                path.display()
            )));
        }
        let counters = &self.counters;
        counters.faces_opened.set(counters.faces_opened.get() + 1);
        counters.live_faces.set(counters.live_faces.get() + 1);
        Ok(Box::new(MockFace {
            config: self.config.clone(),
            counters: Rc::clone(&self.counters),
            pixel_size: 0.0,
        }))
    }
}

struct MockFace {
    config: MockConfig,
    counters: Rc<MockCounters>,
    pixel_size: f32,
}

impl Drop for MockFace {
    fn drop(&mut self) {
        let live = &self.counters.live_faces;
        live.set(live.get().saturating_sub(1));
    }
}

impl MockFace {
    fn code_point(glyph_index: u32) -> u32 {
        glyph_index.wrapping_sub(1)
    }

    fn is_blank(code_point: u32) -> bool {
        char::from_u32(code_point).is_some_and(char::is_whitespace)
    }

    fn size_of(&self, code_point: u32) -> (u32, u32) {
        self.config
            .sized
            .iter()
            .find(|(cp, _, _)| *cp == code_point)
            .map(|&(_, w, h)| (w, h))
            .unwrap_or((self.config.glyph_width, self.config.glyph_height))
    }

    fn metrics(&self, code_point: u32) -> SlotMetrics {
        if Self::is_blank(code_point) {
            return SlotMetrics {
                hori_advance: Fixed26Dot6::from_f32(self.config.space_advance),
                ..SlotMetrics::default()
            };
        }
        let (w, h) = self.size_of(code_point);
        let (w, h) = (w as i32, h as i32);
        SlotMetrics {
            width: Fixed26Dot6::from_int(w),
            height: Fixed26Dot6::from_int(h),
            hori_bearing_x: Fixed26Dot6::from_int(1),
            hori_bearing_y: Fixed26Dot6::from_int(h),
            hori_advance: Fixed26Dot6::from_int(w + 2),
        }
    }

    fn bitmap(&self, code_point: u32, mode: RenderMode) -> RenderedBitmap {
        let format = match mode {
            RenderMode::Antialiased => BitmapFormat::Gray8,
            RenderMode::Mono => BitmapFormat::Mono1,
        };
        if Self::is_blank(code_point) {
            return RenderedBitmap::empty(format);
        }
        let (width, rows) = self.size_of(code_point);
        let pitch = match format {
            BitmapFormat::Gray8 => width as usize,
            BitmapFormat::Mono1 => (width as usize).div_ceil(8),
        };
        let mut buffer = vec![0u8; pitch * rows as usize];
        for y in 0..rows {
            for x in 0..width {
                let alpha = MockFontEngine::expected_alpha(code_point, x, y);
                let row = y as usize * pitch;
                match format {
                    BitmapFormat::Gray8 => buffer[row + x as usize] = alpha,
                    BitmapFormat::Mono1 if alpha >= 128 => {
                        buffer[row + x as usize / 8] |= 0x80 >> (x % 8);
                    }
                    BitmapFormat::Mono1 => {}
                }
            }
        }
        RenderedBitmap {
            width,
            rows,
            pitch,
            format,
            buffer,
            left: 1,
            top: rows as i32,
        }
    }
}

impl FontFace for MockFace {
    fn set_char_size(&mut self, point_size: u32, dpi: u32) {
        self.pixel_size = point_size as f32 * dpi as f32 / 72.0;
    }

    fn size_metrics(&self) -> SizeMetrics {
        SizeMetrics {
            height: Fixed26Dot6::from_f32((self.pixel_size * 1.2).round()),
            ascender: Fixed26Dot6::from_f32((self.pixel_size * 0.8).ceil()),
            descender: Fixed26Dot6::from_f32(-(self.pixel_size * 0.2).ceil()),
            y_ppem: self.pixel_size.round() as u16,
        }
    }

    fn glyph_index(&self, code_point: u32) -> u32 {
        let unmapped = (PRIVATE_USE_START..=PRIVATE_USE_END).contains(&code_point)
            || (code_point == u32::from(' ') && !self.config.map_space)
            || self.config.unmapped.contains(&code_point)
            || char::from_u32(code_point).is_none();
        if unmapped { 0 } else { code_point + 1 }
    }

    fn load_glyph(&mut self, glyph_index: u32) -> Result<SlotMetrics, FontEngineError> {
        Ok(self.metrics(Self::code_point(glyph_index)))
    }

    fn render_glyph(
        &mut self,
        glyph_index: u32,
        mode: RenderMode,
    ) -> Result<RenderedGlyph, FontEngineError> {
        let code_point = Self::code_point(glyph_index);
        if self.config.failing_glyphs.contains(&code_point) {
            return Err(FontEngineError::GlyphLoad {
                glyph_index,
                reason: "mock failure".to_string(),
            });
        }
        let counter = &self.counters.rasterizations;
        counter.set(counter.get() + 1);
        Ok(RenderedGlyph {
            bitmap: self.bitmap(code_point, mode),
            metrics: self.metrics(code_point),
        })
    }

    fn has_kerning(&self) -> bool {
        !self.config.kerning.is_empty()
    }

    fn kerning(&self, left: u32, right: u32) -> Fixed26Dot6 {
        let (left, right) = (Self::code_point(left), Self::code_point(right));
        self.config
            .kerning
            .iter()
            .find(|(l, r, _)| *l == left && *r == right)
            .map(|(_, _, offset)| Fixed26Dot6::from_f32(*offset))
            .unwrap_or(Fixed26Dot6::ZERO)
    }
}
