//! Texture resource interface for atlas pages.
//!
//! The atlas only needs a handful of operations from a graphics backend:
//! allocate a two-channel texture, pick a sampling filter, replace the
//! whole image, and report the largest side the platform accepts. Release
//! is `Drop`.
//!
//! [`HeadlessTextures`] implements the interface on the CPU. It is used for
//! headless runs (measurement, tooling) and by the test suite, which reads
//! back uploaded texels and allocation counters through it.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::FALLBACK_MAX_TEXTURE_SIZE;
use crate::error::TextureError;
use crate::pixels::{BYTES_PER_PIXEL, GlyphPixels};

/// Pixel format of atlas textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Two 8-bit channels: luminance, then alpha.
    #[default]
    LuminanceAlpha8,
}

impl TextureFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::LuminanceAlpha8 => BYTES_PER_PIXEL,
        }
    }
}

/// Sampling filter for minification and magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

impl FilterMode {
    /// Filter for a font: linear only for antialiased text above `threshold` points.
    ///
    /// Small or aliased text stays crisp under nearest sampling.
    pub fn for_font(antialiased: bool, point_size: u32, threshold: u32) -> Self {
        if antialiased && point_size > threshold {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        }
    }
}

/// A texture owned by one atlas page.
pub trait TextureResource {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Pixel format the texture was allocated with.
    fn format(&self) -> TextureFormat;

    /// Current sampling filter.
    fn filter(&self) -> FilterMode;

    /// Change the sampling filter.
    fn set_filter(&mut self, filter: FilterMode);

    /// Replace the texture contents. `pixels` must match [`dimensions`](Self::dimensions).
    fn upload(&mut self, pixels: &GlyphPixels) -> Result<(), TextureError>;

    /// Downcast support for backend-specific access (bind groups, views).
    fn as_any(&self) -> &dyn Any;
}

/// Creates textures for atlas pages.
pub trait TextureAllocator {
    /// Largest side length the platform accepts. `0` means unknown.
    fn max_texture_dimension(&self) -> u32;

    /// Allocate a texture. Contents are undefined until the first upload.
    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureResource>, TextureError>;
}

/// Check requested dimensions against a platform maximum.
pub fn validate_dimensions(width: u32, height: u32, max: u32) -> Result<(), TextureError> {
    if width == 0 || height == 0 || width > max || height > max {
        return Err(TextureError::InvalidDimensions { width, height, max });
    }
    Ok(())
}

/// Counters shared by a [`HeadlessTextures`] allocator and its textures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureStats {
    /// Textures allocated over the allocator's lifetime.
    pub allocations: u64,
    /// Uploads performed.
    pub uploads: u64,
    /// Total bytes uploaded.
    pub bytes_uploaded: u64,
    /// Textures currently alive.
    pub live: usize,
}

/// CPU-only [`TextureAllocator`].
#[derive(Debug, Clone)]
pub struct HeadlessTextures {
    max_dimension: u32,
    stats: Rc<RefCell<TextureStats>>,
}

impl Default for HeadlessTextures {
    fn default() -> Self {
        Self::new(FALLBACK_MAX_TEXTURE_SIZE)
    }
}

impl HeadlessTextures {
    /// Create an allocator reporting `max_dimension` as the platform limit.
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension,
            stats: Rc::new(RefCell::new(TextureStats::default())),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> TextureStats {
        self.stats.borrow().clone()
    }
}

impl TextureAllocator for HeadlessTextures {
    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureResource>, TextureError> {
        let max = if self.max_dimension == 0 {
            FALLBACK_MAX_TEXTURE_SIZE
        } else {
            self.max_dimension
        };
        validate_dimensions(width, height, max)?;
        {
            let mut stats = self.stats.borrow_mut();
            stats.allocations += 1;
            stats.live += 1;
        }
        Ok(Box::new(HeadlessTexture {
            format,
            filter: FilterMode::default(),
            contents: GlyphPixels::new(width, height),
            stats: Rc::clone(&self.stats),
        }))
    }
}

/// A texture created by [`HeadlessTextures`]. Keeps a copy of the last upload.
pub struct HeadlessTexture {
    format: TextureFormat,
    filter: FilterMode,
    contents: GlyphPixels,
    stats: Rc<RefCell<TextureStats>>,
}

impl HeadlessTexture {
    /// Texels as of the last upload.
    pub fn contents(&self) -> &GlyphPixels {
        &self.contents
    }
}

impl TextureResource for HeadlessTexture {
    fn dimensions(&self) -> (u32, u32) {
        (self.contents.width(), self.contents.height())
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn filter(&self) -> FilterMode {
        self.filter
    }

    fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    fn upload(&mut self, pixels: &GlyphPixels) -> Result<(), TextureError> {
        let expected = self.dimensions();
        let actual = (pixels.width(), pixels.height());
        if expected != actual {
            return Err(TextureError::SizeMismatch { expected, actual });
        }
        self.contents.clone_from(pixels);
        let mut stats = self.stats.borrow_mut();
        stats.uploads += 1;
        stats.bytes_uploaded += pixels.byte_len() as u64;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for HeadlessTexture {
    fn drop(&mut self) {
        let mut stats = self.stats.borrow_mut();
        stats.live = stats.live.saturating_sub(1);
    }
}

impl std::fmt::Debug for HeadlessTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessTexture")
            .field("dimensions", &self.dimensions())
            .field("filter", &self.filter)
            .finish()
    }
}
