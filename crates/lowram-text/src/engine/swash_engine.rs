//! Font engine backed by ttf-parser (tables) and swash (outline scaling).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use swash::CacheKey;
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use tracing::debug;

use super::{
    BitmapFormat, Fixed26Dot6, FontEngine, FontFace, RenderMode, RenderedBitmap, RenderedGlyph,
    SizeMetrics, SlotMetrics,
};
use crate::error::FontEngineError;
use crate::logging::targets;

/// Coverage at or above this value becomes an "on" pixel in mono mode.
const MONO_THRESHOLD: u8 = 128;

/// Font engine library handle.
///
/// Owns the swash scaling context shared by every face it opens. Faces hold
/// a reference to the context, so the context lives until the last face is
/// dropped.
#[derive(Clone, Default)]
pub struct SwashEngine {
    context: Rc<RefCell<ScaleContext>>,
}

impl SwashEngine {
    /// Create a new engine with an empty scaling cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live references to the scaling context (engine + faces).
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.context)
    }
}

impl FontEngine for SwashEngine {
    fn name(&self) -> &str {
        "swash"
    }

    fn open_face(&self, path: &Path) -> Result<Box<dyn FontFace>, FontEngineError> {
        let data = std::fs::read(path).map_err(|e| FontEngineError::Io(e.to_string()))?;
        let face = SwashFace::from_data(data, Rc::clone(&self.context))?;
        debug!(
            target: targets::RASTER,
            path = %path.display(),
            units_per_em = face.units.units_per_em,
            "opened font face"
        );
        Ok(Box::new(face))
    }
}

impl std::fmt::Debug for SwashEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashEngine")
            .field("handles", &self.handle_count())
            .finish()
    }
}

/// Vertical face metrics in font units, read once when the face is opened.
#[derive(Debug, Clone, Copy)]
struct FaceUnits {
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
    has_kerning: bool,
}

/// A face opened by [`SwashEngine`].
struct SwashFace {
    data: Vec<u8>,
    units: FaceUnits,
    /// Table directory offset and scaler cache key for `data`. The key must
    /// stay the same across renders for the shared context to reuse its
    /// per-font state.
    offset: u32,
    key: CacheKey,
    pixel_size: f32,
    context: Rc<RefCell<ScaleContext>>,
    glyph_indices: RefCell<HashMap<u32, u32>>,
    kerning_pairs: RefCell<HashMap<(u16, u16), i16>>,
}

impl SwashFace {
    fn from_data(
        data: Vec<u8>,
        context: Rc<RefCell<ScaleContext>>,
    ) -> Result<Self, FontEngineError> {
        let units = {
            let face = ttf_parser::Face::parse(&data, 0)
                .map_err(|e| FontEngineError::InvalidFormat(e.to_string()))?;
            FaceUnits {
                units_per_em: face.units_per_em().max(1),
                ascender: face.ascender(),
                descender: face.descender(),
                line_gap: face.line_gap(),
                has_kerning: face.tables().kern.is_some(),
            }
        };
        let (offset, key) = match swash::FontRef::from_index(&data, 0) {
            Some(font) => (font.offset, font.key),
            None => {
                return Err(FontEngineError::InvalidFormat(
                    "no scalable face at index 0".to_string(),
                ));
            }
        };
        Ok(Self {
            data,
            units,
            offset,
            key,
            pixel_size: 0.0,
            context,
            glyph_indices: RefCell::new(HashMap::new()),
            kerning_pairs: RefCell::new(HashMap::new()),
        })
    }

    /// Parsed table view. The data was validated when the face was opened.
    fn tables(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, 0).ok()
    }

    /// Scaler view of the face, reusing the key assigned at open.
    fn font_ref(&self) -> swash::FontRef<'_> {
        swash::FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        }
    }

    /// Horizontal `kern` table adjustment for a glyph pair, in font units.
    fn kerning_units(&self, left: u16, right: u16) -> i16 {
        let Some(kern) = self.tables().and_then(|face| face.tables().kern) else {
            return 0;
        };
        kern.subtables
            .into_iter()
            .filter(|subtable| subtable.horizontal && !subtable.variable)
            .find_map(|subtable| {
                subtable.glyphs_kerning(ttf_parser::GlyphId(left), ttf_parser::GlyphId(right))
            })
            .unwrap_or(0)
    }

    fn scale(&self) -> f32 {
        self.pixel_size / self.units.units_per_em as f32
    }

    fn glyph_id(glyph_index: u32) -> Result<u16, FontEngineError> {
        u16::try_from(glyph_index).map_err(|_| FontEngineError::GlyphLoad {
            glyph_index,
            reason: "glyph index out of range".to_string(),
        })
    }

    fn slot_metrics(&self, glyph_id: u16) -> Result<SlotMetrics, FontEngineError> {
        let face = self.tables().ok_or_else(|| FontEngineError::GlyphLoad {
            glyph_index: glyph_id as u32,
            reason: "font tables unreadable".to_string(),
        })?;
        let id = ttf_parser::GlyphId(glyph_id);
        let scale = self.scale();
        let advance = face.glyph_hor_advance(id).unwrap_or(0) as f32 * scale;

        let metrics = match face.glyph_bounding_box(id) {
            Some(bbox) => SlotMetrics {
                width: Fixed26Dot6::from_f32(bbox.width() as f32 * scale),
                height: Fixed26Dot6::from_f32(bbox.height() as f32 * scale),
                hori_bearing_x: Fixed26Dot6::from_f32(bbox.x_min as f32 * scale),
                hori_bearing_y: Fixed26Dot6::from_f32(bbox.y_max as f32 * scale),
                hori_advance: Fixed26Dot6::from_f32(advance),
            },
            None => SlotMetrics {
                hori_advance: Fixed26Dot6::from_f32(advance),
                ..SlotMetrics::default()
            },
        };
        Ok(metrics)
    }
}

impl FontFace for SwashFace {
    fn set_char_size(&mut self, point_size: u32, dpi: u32) {
        self.pixel_size = point_size as f32 * dpi as f32 / 72.0;
    }

    fn size_metrics(&self) -> SizeMetrics {
        let units = &self.units;
        let scale = self.scale();
        let ascender = (units.ascender as f32 * scale).ceil();
        let descender = (units.descender as f32 * scale).floor();
        let height = ((units.ascender as f32 - units.descender as f32 + units.line_gap as f32)
            * scale)
            .round();
        SizeMetrics {
            height: Fixed26Dot6::from_f32(height),
            ascender: Fixed26Dot6::from_f32(ascender),
            descender: Fixed26Dot6::from_f32(descender),
            y_ppem: self.pixel_size.round() as u16,
        }
    }

    fn glyph_index(&self, code_point: u32) -> u32 {
        if let Some(&index) = self.glyph_indices.borrow().get(&code_point) {
            return index;
        }
        let index = char::from_u32(code_point)
            .and_then(|ch| self.tables()?.glyph_index(ch))
            .map(|id| id.0 as u32)
            .unwrap_or(0);
        self.glyph_indices.borrow_mut().insert(code_point, index);
        index
    }

    fn load_glyph(&mut self, glyph_index: u32) -> Result<SlotMetrics, FontEngineError> {
        self.slot_metrics(Self::glyph_id(glyph_index)?)
    }

    fn render_glyph(
        &mut self,
        glyph_index: u32,
        mode: RenderMode,
    ) -> Result<RenderedGlyph, FontEngineError> {
        let glyph_id = Self::glyph_id(glyph_index)?;
        let metrics = self.slot_metrics(glyph_id)?;

        let image = {
            let mut context = self.context.borrow_mut();
            let mut scaler = context
                .builder(self.font_ref())
                .size(self.pixel_size)
                .hint(false)
                .build();
            Render::new(&[Source::Outline])
                .format(Format::Alpha)
                .render(&mut scaler, glyph_id)
        };

        let format = match mode {
            RenderMode::Antialiased => BitmapFormat::Gray8,
            RenderMode::Mono => BitmapFormat::Mono1,
        };

        // Glyphs without an outline (spaces) come back as `None` or zero-sized.
        let bitmap = match image {
            Some(image) if image.placement.width > 0 && image.placement.height > 0 => {
                let width = image.placement.width;
                let rows = image.placement.height;
                let (pitch, buffer) = match mode {
                    RenderMode::Antialiased => (width as usize, image.data),
                    RenderMode::Mono => pack_mono(&image.data, width as usize, rows as usize),
                };
                RenderedBitmap {
                    width,
                    rows,
                    pitch,
                    format,
                    buffer,
                    left: image.placement.left,
                    top: image.placement.top,
                }
            }
            _ => RenderedBitmap::empty(format),
        };

        Ok(RenderedGlyph { bitmap, metrics })
    }

    fn has_kerning(&self) -> bool {
        self.units.has_kerning
    }

    fn kerning(&self, left: u32, right: u32) -> Fixed26Dot6 {
        if !self.units.has_kerning {
            return Fixed26Dot6::ZERO;
        }
        let (Ok(left), Ok(right)) = (u16::try_from(left), u16::try_from(right)) else {
            return Fixed26Dot6::ZERO;
        };
        let cached = self.kerning_pairs.borrow().get(&(left, right)).copied();
        let units = match cached {
            Some(units) => units,
            None => {
                let units = self.kerning_units(left, right);
                self.kerning_pairs.borrow_mut().insert((left, right), units);
                units
            }
        };
        Fixed26Dot6::from_f32(units as f32 * self.scale())
    }
}

/// Threshold 8-bit coverage into 1-bit rows, MSB first.
fn pack_mono(coverage: &[u8], width: usize, rows: usize) -> (usize, Vec<u8>) {
    let pitch = width.div_ceil(8);
    let mut packed = vec![0u8; pitch * rows];
    for y in 0..rows {
        for x in 0..width {
            if coverage[y * width + x] >= MONO_THRESHOLD {
                packed[y * pitch + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    (pitch, packed)
}
