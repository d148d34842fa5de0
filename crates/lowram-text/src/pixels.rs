//! Luminance + alpha pixel buffers for glyphs and page mirrors.

/// Bytes per pixel: one luminance byte followed by one alpha byte.
pub const BYTES_PER_PIXEL: usize = 2;

/// Background value of every unused atlas pixel: white, fully transparent.
///
/// Bilinear sampling at glyph edges then fades to transparent white
/// instead of pulling in a dark fringe.
pub const BACKGROUND: [u8; BYTES_PER_PIXEL] = [255, 0];

/// A two-channel (luminance, alpha) pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct GlyphPixels {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GlyphPixels {
    /// Allocate a buffer filled with [`BACKGROUND`].
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        let mut data = Vec::with_capacity(len * BYTES_PER_PIXEL);
        for _ in 0..len {
            data.extend_from_slice(&BACKGROUND);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// A zero-sized buffer.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if this buffer has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw interleaved bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the pixel data in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Read the (luminance, alpha) pair at a position.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; BYTES_PER_PIXEL] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1]]
    }

    /// Write a white pixel with the given coverage.
    pub fn set_coverage(&mut self, x: u32, y: u32, alpha: u8) {
        let i = self.offset(x, y);
        self.data[i] = 255;
        self.data[i + 1] = alpha;
    }

    /// Copy this buffer into `dst` with its top-left corner at `(x, y)`.
    ///
    /// Rows or columns that would fall outside `dst` are clipped.
    pub fn blit_into(&self, dst: &mut GlyphPixels, x: u32, y: u32) {
        if x >= dst.width || y >= dst.height {
            return;
        }
        let copy_w = self.width.min(dst.width - x) as usize * BYTES_PER_PIXEL;
        let rows = self.height.min(dst.height - y);
        for row in 0..rows {
            let src = self.offset(0, row);
            let dst_off = dst.offset(x, y + row);
            dst.data[dst_off..dst_off + copy_w].copy_from_slice(&self.data[src..src + copy_w]);
        }
    }

    /// A larger copy of this buffer, anchored at the top-left, unscaled.
    pub fn grown(&self, width: u32, height: u32) -> GlyphPixels {
        let mut grown = GlyphPixels::new(width, height);
        self.blit_into(&mut grown, 0, 0);
        grown
    }
}

impl std::fmt::Debug for GlyphPixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphPixels")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_transparent_white() {
        let pixels = GlyphPixels::new(3, 2);
        assert_eq!(pixels.byte_len(), 12);
        assert!(pixels.as_bytes().chunks_exact(2).all(|p| p == BACKGROUND));
    }

    #[test]
    fn blit_places_and_clips() {
        let mut glyph = GlyphPixels::new(2, 2);
        glyph.set_coverage(0, 0, 10);
        glyph.set_coverage(1, 1, 20);

        let mut page = GlyphPixels::new(4, 4);
        glyph.blit_into(&mut page, 1, 1);
        assert_eq!(page.pixel(1, 1), [255, 10]);
        assert_eq!(page.pixel(2, 2), [255, 20]);
        assert_eq!(page.pixel(0, 0), BACKGROUND);

        // Only the top-left pixel lands inside.
        glyph.blit_into(&mut page, 3, 3);
        assert_eq!(page.pixel(3, 3), [255, 10]);
    }

    #[test]
    fn grown_keeps_content_at_origin() {
        let mut small = GlyphPixels::new(2, 2);
        small.set_coverage(1, 0, 99);
        let big = small.grown(4, 4);
        assert_eq!(big.width(), 4);
        assert_eq!(big.pixel(1, 0), [255, 99]);
        assert_eq!(big.pixel(3, 3), BACKGROUND);
    }
}
