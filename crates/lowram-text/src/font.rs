//! Font handles backed by shared lazy atlases.
//!
//! A [`LazyFont`] is a cheap handle: a shared reference to an
//! [`AtlasManager`] plus a few presentation settings. Cloning a handle
//! shares the manager. All string operations are built on one walk over
//! the string's code points:
//!
//! - a newline moves the pen to the start of the next line and clears the
//!   kerning context,
//! - a tab advances four space widths and a space one, neither touching the
//!   atlas,
//! - any other character is fetched (and rasterized on first use), kerned
//!   against the previous glyph, and advanced past.
//!
//! ```no_run
//! use std::rc::Rc;
//! use lowram_text::{FontCache, HeadlessTextures, LazyFont, SwashEngine, TextFont};
//!
//! let mut cache = FontCache::new(Rc::new(SwashEngine::new()), Rc::new(HeadlessTextures::default()));
//! let mut font = LazyFont::new();
//! font.load(&mut cache, "sans-serif", 24, true)?;
//! let width = font.string_width("こんにちは, world");
//! # Ok::<(), lowram_text::AtlasError>(())
//! ```

use std::cell::Ref;
use std::ops::RangeInclusive;

use glam::Vec2;
use tracing::{error, warn};

use crate::atlas::{AtlasManager, GlyphRecord};
use crate::cache::{FontCache, FontIdentity, SharedAtlas};
use crate::error::AtlasResult;
use crate::logging::targets;
use crate::mesh::GlyphMesh;
use crate::texture::TextureResource;
use crate::types::{Rect, TextDirection};

/// A tab advances this many space widths.
pub const TAB_WIDTH: f32 = 4.0;

/// Capability shared by fonts that can measure and mesh strings.
pub trait TextFont {
    /// Whether the font is ready for use.
    fn is_loaded(&self) -> bool;

    /// Baseline-to-baseline distance.
    fn line_height(&self) -> f32;

    fn ascender_height(&self) -> f32;

    fn descender_height(&self) -> f32;

    /// Horizontal extent of a string.
    fn string_width(&self, text: &str) -> f32;

    /// Bounds of a string drawn at `(x, y)`.
    fn string_bounding_box(&self, text: &str, x: f32, y: f32, vflip: bool) -> Rect;

    /// Geometry for drawing a string at `(x, y)`, one mesh per texture page.
    fn string_meshes(&self, text: &str, x: f32, y: f32, vflip: bool) -> Vec<GlyphMesh>;

    /// Estimated bytes held for this font.
    fn memory_usage(&self) -> usize;
}

/// Options accepted by [`LazyFont::load_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Font file path or system font name.
    pub path: String,
    /// Size in points.
    pub size: u32,
    pub antialiased: bool,
    /// Accepted for compatibility. Every glyph is loaded on demand regardless.
    pub full_character_set: bool,
    /// Outline extraction is unsupported; a request is logged and ignored.
    pub make_contours: bool,
    pub simplify_amount: f32,
    /// `0` selects the configured default.
    pub dpi: u32,
    pub direction: TextDirection,
    /// Ignored: glyphs from any range are loaded when first used.
    pub unicode_ranges: Vec<RangeInclusive<u32>>,
}

impl LoadOptions {
    /// Antialiased, default DPI, left to right.
    pub fn new(path: impl Into<String>, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
            antialiased: true,
            full_character_set: true,
            make_contours: false,
            simplify_amount: 0.0,
            dpi: 0,
            direction: TextDirection::default(),
            unicode_ranges: Vec::new(),
        }
    }

    #[must_use]
    pub fn antialiased(mut self, antialiased: bool) -> Self {
        self.antialiased = antialiased;
        self
    }

    #[must_use]
    pub fn full_character_set(mut self, full: bool) -> Self {
        self.full_character_set = full;
        self
    }

    #[must_use]
    pub fn contours(mut self, make_contours: bool, simplify_amount: f32) -> Self {
        self.make_contours = make_contours;
        self.simplify_amount = simplify_amount;
        self
    }

    #[must_use]
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: TextDirection) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn unicode_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.unicode_ranges.push(range);
        self
    }

    /// The sharing key these options map to.
    pub fn identity(&self) -> FontIdentity {
        FontIdentity::new(self.path.clone(), self.size, self.antialiased).with_dpi(self.dpi)
    }
}

/// One stop of the pen during a string walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkStep {
    pub ch: char,
    /// Pen position at which the character is drawn.
    pub pen: Vec2,
    /// Horizontal advance of the character, including letter spacing.
    pub advance: f32,
    /// The glyph, for characters drawn from the atlas. `None` for spaces and tabs.
    pub glyph: Option<GlyphRecord>,
}

/// A font handle sharing a lazily populated atlas.
#[derive(Clone)]
pub struct LazyFont {
    atlas: Option<SharedAtlas>,
    identity: Option<FontIdentity>,
    line_height: f32,
    ascender: f32,
    descender: f32,
    letter_spacing: f32,
    space_size: f32,
    direction: TextDirection,
}

impl Default for LazyFont {
    fn default() -> Self {
        Self {
            atlas: None,
            identity: None,
            line_height: 0.0,
            ascender: 0.0,
            descender: 0.0,
            letter_spacing: 1.0,
            space_size: 1.0,
            direction: TextDirection::default(),
        }
    }
}

impl LazyFont {
    /// An unloaded handle. Every query answers zero or empty until loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a font at the default DPI, left to right.
    pub fn load(
        &mut self,
        cache: &mut FontCache,
        path: &str,
        size: u32,
        antialiased: bool,
    ) -> AtlasResult<()> {
        self.load_with(cache, &LoadOptions::new(path, size).antialiased(antialiased))
    }

    /// Load a font, sharing the atlas of any handle loaded with the same identity.
    ///
    /// On failure the handle is left unloaded.
    pub fn load_with(&mut self, cache: &mut FontCache, options: &LoadOptions) -> AtlasResult<()> {
        if options.make_contours {
            warn!(
                target: targets::FONT,
                simplify = options.simplify_amount,
                "contour extraction is not supported, ignoring"
            );
        }
        if !options.unicode_ranges.is_empty() {
            warn!(
                target: targets::FONT,
                ranges = options.unicode_ranges.len(),
                "unicode ranges are ignored, glyphs load on demand"
            );
        }

        let identity = options.identity();
        let atlas = match cache.get_or_create(&identity) {
            Ok(atlas) => atlas,
            Err(err) => {
                error!(target: targets::FONT, path = %options.path, error = %err, "font load failed");
                *self = Self::default();
                return Err(err);
            }
        };

        {
            let manager = atlas.borrow();
            self.line_height = manager.line_height();
            self.ascender = manager.ascender_height();
            self.descender = manager.descender_height();
        }
        self.atlas = Some(atlas);
        self.identity = Some(identity.normalized(cache.config()));
        self.letter_spacing = 1.0;
        self.space_size = 1.0;
        self.direction = options.direction;
        Ok(())
    }

    /// The shared atlas, when loaded.
    pub fn atlas(&self) -> Option<&SharedAtlas> {
        self.atlas.as_ref()
    }

    /// The identity the handle was loaded with.
    pub fn identity(&self) -> Option<&FontIdentity> {
        self.identity.as_ref()
    }

    pub fn letter_spacing(&self) -> f32 {
        self.letter_spacing
    }

    /// Scale the gap between glyphs. `1.0` is the font's natural spacing.
    pub fn set_letter_spacing(&mut self, spacing: f32) {
        self.letter_spacing = spacing;
    }

    pub fn space_size(&self) -> f32 {
        self.space_size
    }

    /// Scale the width of spaces and tabs.
    pub fn set_space_size(&mut self, size: f32) {
        self.space_size = size;
    }

    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    pub fn set_direction(&mut self, direction: TextDirection) {
        self.direction = direction;
    }

    /// Number of atlas pages.
    pub fn atlas_count(&self) -> usize {
        self.with_manager(0, AtlasManager::atlas_count)
    }

    /// Number of glyphs loaded into the shared atlas, by any handle.
    pub fn loaded_glyph_count(&self) -> usize {
        self.with_manager(0, AtlasManager::loaded_glyph_count)
    }

    /// Check if a code point is already in the shared atlas.
    pub fn has_glyph(&self, ch: char) -> bool {
        self.with_manager(false, |m| m.has_glyph(u32::from(ch)))
    }

    /// Check if a character can be drawn: already loaded or loadable on demand.
    pub fn is_valid_glyph(&self, ch: char) -> bool {
        self.with_manager(false, |m| {
            m.has_glyph(u32::from(ch)) || m.maps_code_point(u32::from(ch))
        })
    }

    /// The record for a character, loading it if needed.
    pub fn glyph(&self, ch: char) -> Option<GlyphRecord> {
        let atlas = self.atlas.as_ref()?;
        atlas.borrow_mut().get_or_load_glyph(u32::from(ch)).copied()
    }

    /// Texture of an atlas page.
    ///
    /// The returned guard borrows the shared atlas; drop it before drawing
    /// strings that may load new glyphs.
    pub fn texture(&self, page: usize) -> Option<Ref<'_, dyn TextureResource>> {
        let manager = self.atlas.as_ref()?.borrow();
        Ref::filter_map(manager, |m| m.texture(page)).ok()
    }

    /// Visit every character of `text` with its pen position.
    ///
    /// With `vflip` the y axis points down and successive lines move down;
    /// otherwise lines move towards negative y.
    pub fn walk(&self, text: &str, x: f32, y: f32, vflip: bool, mut visit: impl FnMut(&WalkStep)) {
        let Some(atlas) = &self.atlas else {
            return;
        };
        let origin = Vec2::new(x, y);
        let sign = self.direction.sign();
        let line_step = if vflip {
            self.line_height
        } else {
            -self.line_height
        };
        let space_advance = atlas.borrow().space_advance();
        let space = space_advance * self.space_size;
        let extra_spacing = space_advance * (self.letter_spacing - 1.0);

        let mut pen = origin;
        let mut previous: Option<u32> = None;
        let mut step = |pen: &mut Vec2, ch: char, advance: f32, glyph: Option<GlyphRecord>| {
            if self.direction == TextDirection::RightToLeft {
                pen.x -= advance;
            }
            visit(&WalkStep {
                ch,
                pen: *pen,
                advance,
                glyph,
            });
            if self.direction == TextDirection::LeftToRight {
                pen.x += advance;
            }
        };

        for ch in text.chars() {
            match ch {
                '\n' => {
                    pen.x = origin.x;
                    pen.y += line_step;
                    previous = None;
                }
                '\t' => {
                    step(&mut pen, ch, space * TAB_WIDTH, None);
                    previous = None;
                }
                ' ' => {
                    step(&mut pen, ch, space, None);
                    previous = None;
                }
                _ => {
                    let code_point = u32::from(ch);
                    // Released before `visit` runs so callbacks may query the atlas.
                    let (record, kerning) = {
                        let mut manager = atlas.borrow_mut();
                        let Some(record) = manager.get_or_load_glyph(code_point).copied() else {
                            continue;
                        };
                        let kerning = match (previous, self.direction) {
                            (None, _) => 0.0,
                            (Some(left), TextDirection::LeftToRight) => {
                                manager.kerning(left, code_point)
                            }
                            (Some(right), TextDirection::RightToLeft) => {
                                manager.kerning(code_point, right)
                            }
                        };
                        (record, kerning)
                    };
                    // Follows the pen direction, so a negative pair tightens RTL text too.
                    pen.x += kerning * sign;
                    step(&mut pen, ch, record.metrics.advance + extra_spacing, Some(record));
                    previous = Some(code_point);
                }
            }
        }
    }

    /// One mesh per atlas page; pages the string does not use get empty meshes
    /// up to the highest page used.
    pub fn string_meshes(&self, text: &str, x: f32, y: f32, vflip: bool) -> Vec<GlyphMesh> {
        let mut meshes: Vec<GlyphMesh> = Vec::new();
        self.walk(text, x, y, vflip, |step| {
            let Some(glyph) = step.glyph.filter(|g| !g.is_blank()) else {
                return;
            };
            let m = glyph.metrics;
            let (mut ymin, mut ymax) = (m.ymin, m.ymax);
            if !vflip {
                ymin = -ymin;
                ymax = -ymax;
            }
            let min = Vec2::new(step.pen.x + m.xmin, step.pen.y + ymin);
            let max = Vec2::new(step.pen.x + m.xmax, step.pen.y + ymax);
            if meshes.len() <= glyph.page {
                meshes.resize_with(glyph.page + 1, GlyphMesh::new);
            }
            meshes[glyph.page].push_quad(min, max, glyph.tex);
        });
        meshes
    }

    /// Mesh for the first atlas page only.
    pub fn string_mesh(&self, text: &str, x: f32, y: f32, vflip: bool) -> GlyphMesh {
        self.string_meshes(text, x, y, vflip)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Height of [`string_bounding_box`](TextFont::string_bounding_box) at the origin.
    pub fn string_height(&self, text: &str) -> f32 {
        TextFont::string_bounding_box(self, text, 0.0, 0.0, false).height
    }

    fn with_manager<T>(&self, unloaded: T, f: impl FnOnce(&AtlasManager) -> T) -> T {
        match &self.atlas {
            Some(atlas) => f(&*atlas.borrow()),
            None => unloaded,
        }
    }
}

impl TextFont for LazyFont {
    fn is_loaded(&self) -> bool {
        self.atlas.is_some()
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn ascender_height(&self) -> f32 {
        self.ascender
    }

    fn descender_height(&self) -> f32 {
        self.descender
    }

    fn string_width(&self, text: &str) -> f32 {
        let ltr = self.direction == TextDirection::LeftToRight;
        let mut width = 0.0_f32;
        self.walk(text, 0.0, 0.0, false, |step| {
            let advance = if ltr { step.advance } else { 0.0 };
            width = width.max((step.pen.x + advance).abs());
        });
        width
    }

    fn string_bounding_box(&self, text: &str, x: f32, y: f32, vflip: bool) -> Rect {
        if self.atlas.is_none() || text.is_empty() {
            return Rect::new(x, y, 0.0, 0.0);
        }
        let ltr = self.direction == TextDirection::LeftToRight;
        let mut min_x = x;
        let mut min_y = y;
        let mut max_y = y;
        let mut width = 0.0_f32;

        self.walk(text, x, y, vflip, |step| {
            let advance = if ltr { step.advance } else { 0.0 };
            width = width.max((step.pen.x - x).abs() + advance);
            min_x = min_x.min(step.pen.x);

            let Some(glyph) = step.glyph else {
                return;
            };
            let m = glyph.metrics;
            if vflip {
                min_y = min_y.min(step.pen.y - (m.ymax - m.ymin));
                max_y = max_y.max(step.pen.y - (m.bearing_y - m.height));
            } else {
                min_y = min_y.min(step.pen.y - m.ymax);
                max_y = max_y.max(step.pen.y - m.ymin);
            }
        });

        Rect::new(min_x, min_y, width, max_y - min_y)
    }

    fn string_meshes(&self, text: &str, x: f32, y: f32, vflip: bool) -> Vec<GlyphMesh> {
        LazyFont::string_meshes(self, text, x, y, vflip)
    }

    fn memory_usage(&self) -> usize {
        self.with_manager(0, AtlasManager::memory_usage)
    }
}

impl std::fmt::Debug for LazyFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyFont")
            .field("identity", &self.identity)
            .field("loaded", &self.atlas.is_some())
            .field("letter_spacing", &self.letter_spacing)
            .field("space_size", &self.space_size)
            .field("direction", &self.direction)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_handle_answers_empty() {
        let font = LazyFont::new();
        assert!(!font.is_loaded());
        assert_eq!(font.string_width("hello"), 0.0);
        assert_eq!(font.string_height("hello"), 0.0);
        assert_eq!(font.string_bounding_box("hi", 3.0, 4.0, true), Rect::new(3.0, 4.0, 0.0, 0.0));
        assert!(font.string_meshes("hi", 0.0, 0.0, false).is_empty());
        assert!(font.string_mesh("hi", 0.0, 0.0, false).is_empty());
        assert_eq!(font.atlas_count(), 0);
        assert_eq!(font.memory_usage(), 0);
        assert_eq!(font.loaded_glyph_count(), 0);
        assert!(!font.is_valid_glyph('a'));
        assert!(font.glyph('a').is_none());
        assert!(font.texture(0).is_none());
    }

    #[test]
    fn load_options_identity() {
        let options = LoadOptions::new("ui.ttf", 18).antialiased(false).dpi(144);
        assert_eq!(
            options.identity(),
            FontIdentity::new("ui.ttf", 18, false).with_dpi(144)
        );
    }
}
