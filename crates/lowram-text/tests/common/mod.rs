//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use lowram_text::testing::MockFontEngine;
use lowram_text::{
    AtlasConfig, AtlasManager, FontCache, FontIdentity, FontLocator, FontLocatorConfig,
    GlyphRecord, HeadlessTexture, HeadlessTextures, SharedAtlas,
};
use tempfile::TempDir;

/// Font file names present in every harness data directory.
pub const FONT: &str = "mock.ttf";
pub const OTHER_FONT: &str = "other.ttf";
/// Present on disk, but the mock engine refuses to open it.
pub const BROKEN_FONT: &str = "broken.ttf";

/// A cache over the mock engine, with font files in a temporary data directory.
pub struct Harness {
    pub engine: MockFontEngine,
    pub textures: Rc<HeadlessTextures>,
    pub cache: FontCache,
    _data: TempDir,
}

impl Harness {
    pub fn new(engine: MockFontEngine) -> Self {
        Self::with_config(engine, AtlasConfig::default(), 4096)
    }

    pub fn with_config(engine: MockFontEngine, config: AtlasConfig, max_texture: u32) -> Self {
        let data = tempfile::tempdir().expect("create data dir");
        for name in [FONT, OTHER_FONT, BROKEN_FONT] {
            std::fs::write(data.path().join(name), b"not really a font").expect("write font");
        }
        let engine = engine.failing_file(BROKEN_FONT);
        let textures = Rc::new(HeadlessTextures::new(max_texture));
        let locator = FontLocator::new(
            FontLocatorConfig::new()
                .data_dir(data.path())
                .system_fonts(false),
        );
        let cache = FontCache::new(Rc::new(engine.clone()), textures.clone())
            .with_locator(locator)
            .with_config(config);
        Self {
            engine,
            textures,
            cache,
            _data: data,
        }
    }

    /// The shared manager for the default mock font.
    pub fn atlas(&mut self, size: u32) -> SharedAtlas {
        self.cache
            .get_or_create(&FontIdentity::new(FONT, size, true))
            .expect("mock atlas setup")
    }
}

/// Assert that the page mirror and the uploaded texture both hold the mock's
/// pixels for `code_point` at the record's current location.
pub fn assert_glyph_pixels(atlas: &AtlasManager, code_point: u32, record: &GlyphRecord) {
    let page = atlas.page(record.page).expect("record page exists");
    let rect = record.pixel_rect(page.width(), page.height());
    for y in 0..rect.height {
        for x in 0..rect.width {
            let expected = MockFontEngine::expected_alpha(code_point, x, y);
            assert_eq!(
                page.pixels().pixel(rect.x + x, rect.y + y),
                [255, expected],
                "code point {code_point:#x} at ({x}, {y})"
            );
        }
    }

    let uploaded = page
        .texture()
        .as_any()
        .downcast_ref::<HeadlessTexture>()
        .expect("headless texture");
    assert_eq!(uploaded.contents(), page.pixels());
}
