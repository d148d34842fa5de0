//! Lazily populated, shared glyph atlases for large Unicode text.
//!
//! Instead of rasterizing a whole character set up front (prohibitive for
//! CJK fonts), this crate rasterizes each glyph the first time a string
//! uses it and packs it into a growable texture page. Font handles that ask
//! for the same font, size, antialiasing mode and DPI share one atlas.
//!
//! # Building blocks
//!
//! - [`FontEngine`] / [`FontFace`]: the font backend. [`SwashEngine`] reads
//!   TrueType/OpenType files with `ttf-parser` and rasterizes with `swash`.
//! - [`TextureAllocator`] / [`TextureResource`]: the graphics backend.
//!   [`HeadlessTextures`] keeps pages on the CPU; the `lowram-text-wgpu`
//!   crate puts them on the GPU.
//! - [`AtlasManager`]: one font's pages and glyph map.
//! - [`FontCache`]: the registry sharing managers between handles.
//! - [`LazyFont`]: the handle applications measure and mesh strings with.
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use lowram_text::{FontCache, HeadlessTextures, LazyFont, SwashEngine, TextFont};
//!
//! let mut cache = FontCache::new(Rc::new(SwashEngine::new()), Rc::new(HeadlessTextures::default()));
//!
//! let mut body = LazyFont::new();
//! body.load(&mut cache, "NotoSansJP-Regular.otf", 18, true)?;
//! let mut caption = LazyFont::new();
//! caption.load(&mut cache, "NotoSansJP-Regular.otf", 18, true)?;
//!
//! // Both handles draw from the same atlas.
//! let meshes = body.string_meshes("吾輩は猫である", 10.0, 40.0, true);
//! assert_eq!(caption.loaded_glyph_count(), body.loaded_glyph_count());
//! println!("{} pages, {} bytes", meshes.len(), cache.total_memory_usage());
//! # Ok::<(), lowram_text::AtlasError>(())
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded: atlases are shared through
//! `Rc<RefCell<_>>` and texture uploads happen on the calling thread, which
//! must be the thread that owns the graphics context.
//!
//! # Memory
//!
//! Glyphs are never evicted and pages never shrink. A process that streams
//! through an unbounded set of code points grows without bound;
//! [`FontCache::total_memory_usage`] reports the current estimate.

mod atlas;
mod cache;
mod config;
mod engine;
mod error;
mod font;
mod locator;
mod mesh;
mod pixels;
mod raster;
mod texture;
mod types;

pub mod logging;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Atlas and sharing
pub use atlas::{AtlasManager, AtlasPage, AtlasStats, GlyphRecord, TexRect};
pub use cache::{FontCache, FontIdentity, SharedAtlas};
pub use config::{
    AtlasConfig, DEFAULT_DPI, DEFAULT_GLYPH_BORDER, DEFAULT_LINEAR_FILTER_THRESHOLD,
    DEFAULT_MIN_PAGE_FLOOR, FALLBACK_MAX_TEXTURE_SIZE, FontLocatorConfig,
};
pub use error::{AtlasError, AtlasResult, FontEngineError, TextureError};

// Font handles
pub use font::{LazyFont, LoadOptions, TAB_WIDTH, TextFont, WalkStep};
pub use locator::{FontLocator, MONOSPACE, SANS_SERIF, SERIF};
pub use mesh::{GlyphMesh, GlyphVertex};
pub use types::{PixelRect, Rect, TextDirection};

// Backends
pub use engine::{
    BitmapFormat, Fixed26Dot6, FontEngine, FontFace, RenderMode, RenderedBitmap, RenderedGlyph,
    SizeMetrics, SlotMetrics, SwashEngine,
};
pub use pixels::{BACKGROUND, BYTES_PER_PIXEL, GlyphPixels};
pub use raster::{GlyphMetrics, GlyphRasterizer, LineMetrics, RasterStats, RasterizedGlyph};
pub use texture::{
    FilterMode, HeadlessTexture, HeadlessTextures, TextureAllocator, TextureFormat,
    TextureResource, TextureStats, validate_dimensions,
};

// Re-export glam so callers can name pen positions.
pub use glam;
