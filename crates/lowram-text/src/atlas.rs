//! Growable glyph atlas pages with lazy glyph population.
//!
//! An [`AtlasManager`] owns one font face at one size and rendering mode,
//! plus an ordered list of [`AtlasPage`]s. Glyphs are rasterized the first
//! time they are requested and packed row by row into the last page:
//!
//! ```text
//!  border
//!   v
//!  +-----------------------------+
//!  | [A] [B] [C]  [D]            |  <- row 0, height = tallest glyph
//!  | [E]  [F] [G]                |  <- row 1
//!  | ^cursor                     |
//!  +-----------------------------+
//! ```
//!
//! When a glyph does not fit below the current row, the page doubles in
//! both directions. The old pixels keep their top-left position, and the
//! normalized texture rectangles of that page's glyphs are rescaled to the
//! new size. Once doubling would exceed the platform texture limit, a new
//! page of the same size is started instead. Pages never shrink and glyphs
//! are never evicted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::cache::FontIdentity;
use crate::config::AtlasConfig;
use crate::engine::{FontEngine, RenderMode};
use crate::error::{AtlasError, AtlasResult};
use crate::locator::FontLocator;
use crate::logging::targets;
use crate::pixels::{BYTES_PER_PIXEL, GlyphPixels};
use crate::raster::{GlyphMetrics, GlyphRasterizer, RasterStats, RasterizedGlyph};
use crate::texture::{FilterMode, TextureAllocator, TextureFormat, TextureResource};
use crate::types::PixelRect;

/// Normalized texture rectangle of a glyph, in `[0, 1]` page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexRect {
    /// Left edge (u of the first column).
    pub left: f32,
    /// Right edge (u one past the last column).
    pub right: f32,
    /// Top edge (v of the first row).
    pub top: f32,
    /// Bottom edge (v one past the last row).
    pub bottom: f32,
}

impl TexRect {
    /// Degenerate rectangle used by glyphs without pixels.
    pub const ZERO: Self = Self {
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
    };

    /// Normalize a pixel rectangle against a page size.
    pub fn from_pixels(rect: PixelRect, page_width: u32, page_height: u32) -> Self {
        let w = page_width as f32;
        let h = page_height as f32;
        Self {
            left: rect.x as f32 / w,
            right: rect.right() as f32 / w,
            top: rect.y as f32 / h,
            bottom: rect.bottom() as f32 / h,
        }
    }

    /// Re-express the rectangle after its page was resized.
    ///
    /// Pixel content is anchored at the top-left, so each coordinate keeps
    /// its pixel position: `new = old * old_dim / new_dim`.
    pub fn rescale(&mut self, old: (u32, u32), new: (u32, u32)) {
        let sx = old.0 as f32 / new.0 as f32;
        let sy = old.1 as f32 / new.1 as f32;
        self.left *= sx;
        self.right *= sx;
        self.top *= sy;
        self.bottom *= sy;
    }
}

/// Everything known about one loaded code point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRecord {
    /// Index of the page holding the glyph's pixels.
    pub page: usize,
    /// Normalized location within the page.
    pub tex: TexRect,
    /// Metrics in text units.
    pub metrics: GlyphMetrics,
    /// Width of the packed bitmap in pixels.
    pub pixel_width: u32,
    /// Height of the packed bitmap in pixels.
    pub pixel_height: u32,
}

impl GlyphRecord {
    /// Check if the glyph has no pixels (and no atlas placement).
    pub fn is_blank(&self) -> bool {
        self.pixel_width == 0 || self.pixel_height == 0
    }

    /// Pixel rectangle of the glyph on a page of the given size.
    pub fn pixel_rect(&self, page_width: u32, page_height: u32) -> PixelRect {
        let x = (self.tex.left * page_width as f32).round() as u32;
        let y = (self.tex.top * page_height as f32).round() as u32;
        PixelRect::new(x, y, self.pixel_width, self.pixel_height)
    }
}

/// One texture page and its CPU mirror.
pub struct AtlasPage {
    texture: Box<dyn TextureResource>,
    pixels: GlyphPixels,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl AtlasPage {
    fn new(
        textures: &dyn TextureAllocator,
        width: u32,
        height: u32,
        filter: FilterMode,
        border: u32,
    ) -> AtlasResult<Self> {
        let mut texture = textures.allocate(width, height, TextureFormat::LuminanceAlpha8)?;
        texture.set_filter(filter);
        let pixels = GlyphPixels::new(width, height);
        texture.upload(&pixels)?;
        Ok(Self {
            texture,
            pixels,
            cursor_x: border,
            cursor_y: border,
            row_height: 0,
        })
    }

    /// Page width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Page height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The page's texture.
    pub fn texture(&self) -> &(dyn TextureResource + 'static) {
        self.texture.as_ref()
    }

    /// The CPU copy of the page's texels.
    pub fn pixels(&self) -> &GlyphPixels {
        &self.pixels
    }

    /// Next write position `(x, y)`.
    pub fn cursor(&self) -> (u32, u32) {
        (self.cursor_x, self.cursor_y)
    }

    /// Height of the tallest glyph in the current row.
    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    fn is_untouched(&self, border: u32) -> bool {
        self.cursor_x == border && self.cursor_y == border && self.row_height == 0
    }

    fn wrap_row(&mut self, border: u32) {
        self.cursor_x = border;
        self.cursor_y += self.row_height + border;
        self.row_height = 0;
    }

    fn fits(&self, width: u32, height: u32, border: u32) -> bool {
        self.cursor_x + width + border <= self.width()
            && self.cursor_y + height + border <= self.height()
    }

    fn byte_size(&self) -> usize {
        self.width() as usize * self.height() as usize * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for AtlasPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasPage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("cursor", &self.cursor())
            .field("row_height", &self.row_height)
            .finish()
    }
}

/// Counters for atlas activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtlasStats {
    /// Lookups answered from the glyph map.
    pub hits: u64,
    /// Lookups that had to rasterize.
    pub misses: u64,
    /// Page doublings.
    pub growths: u64,
    /// Pages created after the first.
    pub extra_pages: u64,
}

/// Lazily populated glyph atlas for one font, size, mode and DPI.
pub struct AtlasManager {
    pages: Vec<AtlasPage>,
    glyphs: HashMap<u32, GlyphRecord>,
    rasterizer: GlyphRasterizer,
    textures: Rc<dyn TextureAllocator>,
    font_path: PathBuf,
    font_size: u32,
    antialiased: bool,
    dpi: u32,
    border: u32,
    filter: FilterMode,
    line_height: f32,
    ascender: f32,
    descender: f32,
    space_advance: f32,
    min_page_size: u32,
    max_page_size: u32,
    stats: AtlasStats,
}

impl AtlasManager {
    /// Resolve and open the font, compute its metrics and create the first page.
    ///
    /// A DPI of `0` in `identity` selects the configured default.
    pub fn setup(
        engine: &dyn FontEngine,
        locator: &FontLocator,
        textures: Rc<dyn TextureAllocator>,
        identity: &FontIdentity,
        config: &AtlasConfig,
    ) -> AtlasResult<Self> {
        if identity.size == 0 {
            return Err(AtlasError::InvalidSize(identity.size));
        }
        let dpi = config.effective_dpi(identity.dpi);
        let max_page_size = config.effective_max_texture_size(textures.max_texture_dimension());
        let min_page_size = config
            .initial_page_size(identity.size)
            .ok_or(AtlasError::InvalidSize(identity.size))?
            .min(max_page_size);

        let font_path = locator
            .resolve(&identity.path)
            .ok_or_else(|| AtlasError::FontNotFound {
                requested: identity.path.clone(),
            })?;
        let face = engine
            .open_face(&font_path)
            .map_err(|source| AtlasError::FontOpen {
                path: font_path.clone(),
                source,
            })?;

        let mut rasterizer = GlyphRasterizer::new(
            face,
            identity.size,
            dpi,
            RenderMode::from_antialiased(identity.antialiased),
        );
        let line = rasterizer.line_metrics();
        let space_advance = rasterizer.space_advance();
        let filter = FilterMode::for_font(
            identity.antialiased,
            identity.size,
            config.linear_filter_threshold,
        );

        let mut manager = Self {
            pages: Vec::new(),
            glyphs: HashMap::new(),
            rasterizer,
            textures,
            font_path,
            font_size: identity.size,
            antialiased: identity.antialiased,
            dpi,
            border: config.border,
            filter,
            line_height: line.line_height,
            ascender: line.ascender,
            descender: line.descender,
            space_advance,
            min_page_size,
            max_page_size,
            stats: AtlasStats::default(),
        };
        manager.create_page()?;

        info!(
            target: targets::ATLAS,
            path = %manager.font_path.display(),
            engine = engine.name(),
            size = manager.font_size,
            dpi,
            antialiased = manager.antialiased,
            initial_page = min_page_size,
            max_page = max_page_size,
            "atlas ready"
        );
        Ok(manager)
    }

    /// Return the record for `code_point`, rasterizing and packing it on first use.
    ///
    /// Returns `None` when the font has no glyph for the code point or the
    /// glyph cannot be placed. Neither case is cached, and neither is fatal.
    pub fn get_or_load_glyph(&mut self, code_point: u32) -> Option<&GlyphRecord> {
        if self.glyphs.contains_key(&code_point) {
            self.stats.hits += 1;
            return self.glyphs.get(&code_point);
        }

        let glyph = self.rasterizer.rasterize(code_point)?;
        self.stats.misses += 1;
        let record = match self.place(glyph) {
            Ok(record) => record,
            Err(err) => {
                warn!(target: targets::ATLAS, code_point, error = %err, "glyph not placed");
                return None;
            }
        };
        Some(self.glyphs.entry(code_point).or_insert(record))
    }

    /// The record for an already loaded code point. Never rasterizes.
    pub fn glyph(&self, code_point: u32) -> Option<&GlyphRecord> {
        self.glyphs.get(&code_point)
    }

    /// Check if a code point has been loaded.
    pub fn has_glyph(&self, code_point: u32) -> bool {
        self.glyphs.contains_key(&code_point)
    }

    /// Check if the font maps a code point, without loading it.
    pub fn maps_code_point(&self, code_point: u32) -> bool {
        self.rasterizer.maps_code_point(code_point)
    }

    /// Texture of a page.
    pub fn texture(&self, page: usize) -> Option<&(dyn TextureResource + 'static)> {
        self.pages.get(page).map(AtlasPage::texture)
    }

    /// A page by index.
    pub fn page(&self, page: usize) -> Option<&AtlasPage> {
        self.pages.get(page)
    }

    /// All pages, oldest first. The last one receives new glyphs.
    pub fn pages(&self) -> &[AtlasPage] {
        &self.pages
    }

    /// Number of pages.
    pub fn atlas_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of loaded code points, including blank ones.
    pub fn loaded_glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Iterate over loaded code points and their records.
    pub fn glyphs(&self) -> impl Iterator<Item = (u32, &GlyphRecord)> {
        self.glyphs.iter().map(|(cp, record)| (*cp, record))
    }

    /// Estimated bytes held: CPU mirror plus GPU copy of every page, and the glyph map.
    pub fn memory_usage(&self) -> usize {
        let pages: usize = self.pages.iter().map(|p| p.byte_size() * 2).sum();
        pages + self.glyphs.len() * std::mem::size_of::<GlyphRecord>()
    }

    /// Kerning between two code points, or zero when the font has none. Not cached.
    pub fn kerning(&self, left: u32, right: u32) -> f32 {
        self.rasterizer.kerning(left, right)
    }

    /// Baseline-to-baseline distance.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn ascender_height(&self) -> f32 {
        self.ascender
    }

    pub fn descender_height(&self) -> f32 {
        self.descender
    }

    /// Advance of the space character.
    pub fn space_advance(&self) -> f32 {
        self.space_advance
    }

    /// Side length of the first page.
    pub fn min_page_size(&self) -> u32 {
        self.min_page_size
    }

    /// Largest side a page may grow to.
    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Gap kept around every glyph.
    pub fn border(&self) -> u32 {
        self.border
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn is_antialiased(&self) -> bool {
        self.antialiased
    }

    /// Resolved path of the font file.
    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    /// Filter applied to every page texture.
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    /// Atlas activity counters.
    pub fn stats(&self) -> &AtlasStats {
        &self.stats
    }

    /// Rasterization counters.
    pub fn raster_stats(&self) -> &RasterStats {
        self.rasterizer.stats()
    }

    /// Pack a rasterized glyph into the active page, growing or adding pages as needed.
    fn place(&mut self, glyph: RasterizedGlyph) -> AtlasResult<GlyphRecord> {
        let width = glyph.pixels.width();
        let height = glyph.pixels.height();
        if glyph.is_blank() {
            return Ok(GlyphRecord {
                page: 0,
                tex: TexRect::ZERO,
                metrics: glyph.metrics,
                pixel_width: width,
                pixel_height: height,
            });
        }

        let border = self.border;
        let too_large = AtlasError::GlyphTooLarge {
            width,
            height,
            max: self.max_page_size,
        };
        if width + 2 * border > self.max_page_size || height + 2 * border > self.max_page_size {
            return Err(too_large);
        }

        let mut index = self.active_page()?;
        loop {
            let page = &mut self.pages[index];
            if page.cursor_x > border && page.cursor_x + width + border > page.width() {
                page.wrap_row(border);
            }
            if page.fits(width, height, border) {
                break;
            }
            if self.grow_page(index)? {
                continue;
            }
            if self.pages[index].is_untouched(border) {
                return Err(too_large);
            }
            index = self.create_page()?;
        }

        let page = &mut self.pages[index];
        let (x, y) = page.cursor();
        glyph.pixels.blit_into(&mut page.pixels, x, y);
        page.cursor_x += width + border;
        page.row_height = page.row_height.max(height);
        page.texture.upload(&page.pixels)?;

        let rect = PixelRect::new(x, y, width, height);
        Ok(GlyphRecord {
            page: index,
            tex: TexRect::from_pixels(rect, page.width(), page.height()),
            metrics: glyph.metrics,
            pixel_width: width,
            pixel_height: height,
        })
    }

    fn active_page(&mut self) -> AtlasResult<usize> {
        match self.pages.len() {
            0 => self.create_page(),
            n => Ok(n - 1),
        }
    }

    /// Double a page in place. Returns `false` when the platform limit refuses it.
    fn grow_page(&mut self, index: usize) -> AtlasResult<bool> {
        let page = &self.pages[index];
        let old = (page.width(), page.height());
        let new = (old.0 * 2, old.1 * 2);
        if new.0 > self.max_page_size || new.1 > self.max_page_size {
            warn!(
                target: targets::ATLAS,
                page = index,
                size = old.0,
                max = self.max_page_size,
                "page at maximum size, starting a new page"
            );
            return Ok(false);
        }

        let mut texture = self
            .textures
            .allocate(new.0, new.1, TextureFormat::LuminanceAlpha8)?;
        texture.set_filter(self.filter);
        let pixels = page.pixels.grown(new.0, new.1);
        texture.upload(&pixels)?;

        let page = &mut self.pages[index];
        page.texture = texture;
        page.pixels = pixels;
        for record in self.glyphs.values_mut().filter(|r| r.page == index) {
            record.tex.rescale(old, new);
        }
        self.stats.growths += 1;

        info!(
            target: targets::ATLAS,
            page = index,
            "page grown {}x{} -> {}x{}",
            old.0,
            old.1,
            new.0,
            new.1
        );
        Ok(true)
    }

    /// Append a page sized like the active one (or the minimum size) and make it active.
    fn create_page(&mut self) -> AtlasResult<usize> {
        let (width, height) = self
            .pages
            .last()
            .map(|page| (page.width(), page.height()))
            .unwrap_or((self.min_page_size, self.min_page_size));
        let page = AtlasPage::new(
            self.textures.as_ref(),
            width,
            height,
            self.filter,
            self.border,
        )?;
        self.pages.push(page);
        let index = self.pages.len() - 1;

        if index > 0 {
            self.stats.extra_pages += 1;
            info!(target: targets::ATLAS, page = index, width, height, "new page");
        } else {
            debug!(target: targets::ATLAS, width, height, filter = ?self.filter, "first page");
        }
        Ok(index)
    }
}

impl std::fmt::Debug for AtlasManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasManager")
            .field("font_path", &self.font_path)
            .field("font_size", &self.font_size)
            .field("antialiased", &self.antialiased)
            .field("dpi", &self.dpi)
            .field("pages", &self.pages)
            .field("glyph_count", &self.glyphs.len())
            .field("memory_usage", &self.memory_usage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FontLocatorConfig;
    use crate::testing::MockFontEngine;
    use crate::texture::HeadlessTextures;

    struct Fixture {
        _dir: tempfile::TempDir,
        locator: FontLocator,
        textures: Rc<HeadlessTextures>,
    }

    fn fixture(max_texture: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mock.ttf"), b"mock").unwrap();
        let locator =
            FontLocator::new(FontLocatorConfig::new().data_dir(dir.path()).system_fonts(false));
        Fixture {
            _dir: dir,
            locator,
            textures: Rc::new(HeadlessTextures::new(max_texture)),
        }
    }

    fn manager(engine: &MockFontEngine, fx: &Fixture, size: u32) -> AtlasManager {
        AtlasManager::setup(
            engine,
            &fx.locator,
            fx.textures.clone(),
            &FontIdentity::new("mock.ttf", size, true),
            &AtlasConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn tex_rect_rescale_preserves_pixels() {
        let mut rect = TexRect::from_pixels(PixelRect::new(10, 20, 5, 7), 64, 64);
        rect.rescale((64, 64), (128, 128));
        assert_eq!(rect, TexRect::from_pixels(PixelRect::new(10, 20, 5, 7), 128, 128));
    }

    #[test]
    fn setup_reports_metrics_and_first_page() {
        let engine = MockFontEngine::new();
        let fx = fixture(4096);
        let atlas = manager(&engine, &fx, 16);

        assert_eq!(atlas.atlas_count(), 1);
        assert_eq!(atlas.min_page_size(), 64);
        assert_eq!(atlas.page(0).unwrap().width(), 64);
        assert_eq!(atlas.dpi(), 96);
        assert_eq!(atlas.filter(), FilterMode::Nearest);
        assert!(atlas.line_height() > 0.0);
        assert!(atlas.space_advance() > 0.0);
        assert_eq!(atlas.memory_usage(), 64 * 64 * 2 * 2);
        assert_eq!(fx.textures.stats().live, 1);
    }

    #[test]
    fn setup_rejects_zero_size() {
        let engine = MockFontEngine::new();
        let fx = fixture(4096);
        let result = AtlasManager::setup(
            &engine,
            &fx.locator,
            fx.textures.clone(),
            &FontIdentity::new("mock.ttf", 0, true),
            &AtlasConfig::default(),
        );
        assert!(matches!(result, Err(AtlasError::InvalidSize(0))));
    }

    #[test]
    fn first_glyph_lands_inside_border() {
        let engine = MockFontEngine::new().glyph_size(10, 14);
        let fx = fixture(4096);
        let mut atlas = manager(&engine, &fx, 16);

        let record = *atlas.get_or_load_glyph(u32::from('A')).unwrap();
        assert_eq!(record.page, 0);
        assert_eq!(record.pixel_rect(64, 64), PixelRect::new(1, 1, 10, 14));
        assert_eq!(atlas.page(0).unwrap().cursor(), (12, 1));
        assert_eq!(atlas.page(0).unwrap().pixels().pixel(0, 0), [255, 0]);
    }

    #[test]
    fn rows_wrap_when_width_is_exhausted() {
        let engine = MockFontEngine::new().glyph_size(20, 10);
        let fx = fixture(4096);
        let mut atlas = manager(&engine, &fx, 16);

        // 1 + 3 * 21 = 64: three glyphs fill the first row exactly.
        for ch in ['a', 'b', 'c', 'd'] {
            atlas.get_or_load_glyph(u32::from(ch)).unwrap();
        }
        let d = atlas.glyph(u32::from('d')).unwrap();
        assert_eq!(d.pixel_rect(64, 64), PixelRect::new(1, 12, 20, 10));
    }

    #[test]
    fn growth_rescales_existing_records() {
        let engine = MockFontEngine::new().glyph_size(30, 40);
        let fx = fixture(4096);
        let mut atlas = manager(&engine, &fx, 16);

        let a = *atlas.get_or_load_glyph(u32::from('a')).unwrap();
        let before = a.pixel_rect(64, 64);
        atlas.get_or_load_glyph(u32::from('b')).unwrap();
        // The third glyph needs a second row that a 64px page cannot hold.
        atlas.get_or_load_glyph(u32::from('c')).unwrap();

        assert_eq!(atlas.atlas_count(), 1);
        assert_eq!(atlas.page(0).unwrap().width(), 128);
        assert_eq!(atlas.stats().growths, 1);
        let after = atlas.glyph(u32::from('a')).unwrap().pixel_rect(128, 128);
        assert_eq!(before, after);
    }

    #[test]
    fn refused_growth_starts_a_page_of_equal_size() {
        let engine = MockFontEngine::new().glyph_size(30, 40);
        let fx = fixture(64);
        let mut atlas = manager(&engine, &fx, 16);

        for ch in ['a', 'b', 'c'] {
            atlas.get_or_load_glyph(u32::from(ch)).unwrap();
        }
        assert_eq!(atlas.atlas_count(), 2);
        assert_eq!(atlas.page(1).unwrap().width(), 64);
        assert_eq!(atlas.glyph(u32::from('c')).unwrap().page, 1);
        assert_eq!(atlas.glyph(u32::from('a')).unwrap().page, 0);
        assert_eq!(atlas.stats().extra_pages, 1);
    }

    #[test]
    fn oversized_glyph_is_rejected_without_new_pages() {
        let engine = MockFontEngine::new().glyph_size(70, 10);
        let fx = fixture(64);
        let mut atlas = manager(&engine, &fx, 16);

        assert!(atlas.get_or_load_glyph(u32::from('W')).is_none());
        assert!(!atlas.has_glyph(u32::from('W')));
        assert_eq!(atlas.atlas_count(), 1);
    }

    #[test]
    fn linear_filter_for_large_antialiased_text() {
        let engine = MockFontEngine::new();
        let fx = fixture(4096);
        let atlas = manager(&engine, &fx, 24);
        assert_eq!(atlas.filter(), FilterMode::Linear);
        assert_eq!(atlas.texture(0).unwrap().filter(), FilterMode::Linear);
        assert!(atlas.texture(1).is_none());
    }
}
