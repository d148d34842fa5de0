//! Configuration for atlas managers and font path resolution.

use std::path::PathBuf;

/// Default gap in pixels kept around every packed glyph.
pub const DEFAULT_GLYPH_BORDER: u32 = 1;

/// Smallest side length a first page may have.
pub const DEFAULT_MIN_PAGE_FLOOR: u32 = 64;

/// DPI used when a caller passes `0`.
pub const DEFAULT_DPI: u32 = 96;

/// Point size above which antialiased pages are sampled with linear filtering.
pub const DEFAULT_LINEAR_FILTER_THRESHOLD: u32 = 20;

/// Fallback when a backend reports a maximum texture dimension of zero.
pub const FALLBACK_MAX_TEXTURE_SIZE: u32 = 4096;

/// Configuration shared by every atlas manager a cache creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Border in pixels around each glyph, and at the page edges.
    pub border: u32,
    /// Lower bound for the first page side, before rounding to a power of two.
    pub min_page_floor: u32,
    /// Caps the backend's reported maximum texture dimension.
    pub max_texture_size_override: Option<u32>,
    /// DPI substituted for a requested DPI of `0`.
    pub default_dpi: u32,
    /// Antialiased fonts larger than this many points use linear filtering.
    pub linear_filter_threshold: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            border: DEFAULT_GLYPH_BORDER,
            min_page_floor: DEFAULT_MIN_PAGE_FLOOR,
            max_texture_size_override: None,
            default_dpi: DEFAULT_DPI,
            linear_filter_threshold: DEFAULT_LINEAR_FILTER_THRESHOLD,
        }
    }
}

impl AtlasConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the border kept around each glyph.
    #[must_use]
    pub fn border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    /// Set the lower bound for the first page side.
    #[must_use]
    pub fn min_page_floor(mut self, floor: u32) -> Self {
        self.min_page_floor = floor;
        self
    }

    /// Cap the maximum page dimension below what the backend reports.
    #[must_use]
    pub fn max_texture_size(mut self, max: u32) -> Self {
        self.max_texture_size_override = Some(max);
        self
    }

    /// Set the DPI used when callers pass `0`.
    #[must_use]
    pub fn default_dpi(mut self, dpi: u32) -> Self {
        self.default_dpi = dpi;
        self
    }

    /// Set the point size above which linear filtering is used.
    #[must_use]
    pub fn linear_filter_threshold(mut self, points: u32) -> Self {
        self.linear_filter_threshold = points;
        self
    }

    /// Replace a zero DPI with the configured default.
    pub fn effective_dpi(&self, dpi: u32) -> u32 {
        if dpi > 0 { dpi } else { self.default_dpi }
    }

    /// Largest page side allowed for a backend-reported maximum texture size.
    ///
    /// The reported size is clamped with the override and rounded down to a
    /// power of two, so doubling from a power-of-two page always reaches it.
    pub fn effective_max_texture_size(&self, reported: u32) -> u32 {
        let reported = if reported == 0 {
            FALLBACK_MAX_TEXTURE_SIZE
        } else {
            reported
        };
        let limit = match self.max_texture_size_override {
            Some(cap) => reported.min(cap),
            None => reported,
        };
        match limit.checked_ilog2() {
            Some(log) => 1 << log,
            None => 0,
        }
    }

    /// Side length of the first page for a font of `point_size` points.
    ///
    /// The smallest power of two that is at least `max(floor, 4 * point_size)`,
    /// or `None` when that does not fit in a `u32`.
    pub fn initial_page_size(&self, point_size: u32) -> Option<u32> {
        self.min_page_floor
            .max(point_size.saturating_mul(4))
            .max(1)
            .checked_next_power_of_two()
    }
}

/// Configuration for [`FontLocator`](crate::FontLocator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontLocatorConfig {
    /// Application data directory searched before anything else.
    pub data_dir: Option<PathBuf>,
    /// Whether to fall back to installed system fonts by family name.
    pub system_fonts: bool,
}

impl Default for FontLocatorConfig {
    fn default() -> Self {
        Self {
            data_dir: Some(PathBuf::from("data")),
            system_fonts: true,
        }
    }
}

impl FontLocatorConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Do not search an application data directory.
    #[must_use]
    pub fn without_data_dir(mut self) -> Self {
        self.data_dir = None;
        self
    }

    /// Enable or disable system font lookup by family name.
    #[must_use]
    pub fn system_fonts(mut self, enabled: bool) -> Self {
        self.system_fonts = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_page_size_rounds_up_to_power_of_two() {
        let config = AtlasConfig::default();
        assert_eq!(config.initial_page_size(8), Some(64));
        assert_eq!(config.initial_page_size(16), Some(64));
        assert_eq!(config.initial_page_size(17), Some(128));
        assert_eq!(config.initial_page_size(50), Some(256));
        assert_eq!(config.initial_page_size(64), Some(256));
    }

    #[test]
    fn initial_page_size_overflow_is_none() {
        let config = AtlasConfig::default();
        assert_eq!(config.initial_page_size(1 << 29), Some(1 << 31));
        assert_eq!(config.initial_page_size((1 << 29) + 1), None);
        assert_eq!(config.initial_page_size(1 << 30), None);
        assert_eq!(config.initial_page_size(u32::MAX), None);
    }

    #[test]
    fn max_texture_size_override_only_lowers() {
        let config = AtlasConfig::new().max_texture_size(512);
        assert_eq!(config.effective_max_texture_size(8192), 512);
        assert_eq!(config.effective_max_texture_size(256), 256);
        assert_eq!(
            AtlasConfig::default().effective_max_texture_size(0),
            FALLBACK_MAX_TEXTURE_SIZE
        );
    }

    #[test]
    fn max_texture_size_rounds_down_to_power_of_two() {
        let config = AtlasConfig::default();
        assert_eq!(config.effective_max_texture_size(100), 64);
        assert_eq!(config.effective_max_texture_size(16384), 16384);
        assert_eq!(config.effective_max_texture_size(u32::MAX), 1 << 31);

        let config = AtlasConfig::new().max_texture_size(300);
        assert_eq!(config.effective_max_texture_size(4096), 256);
        assert_eq!(config.effective_max_texture_size(200), 128);
    }

    #[test]
    fn zero_dpi_uses_default() {
        let config = AtlasConfig::new().default_dpi(72);
        assert_eq!(config.effective_dpi(0), 72);
        assert_eq!(config.effective_dpi(144), 144);
    }

    #[test]
    fn locator_config_builder() {
        let config = FontLocatorConfig::new()
            .data_dir("/srv/app/data")
            .system_fonts(false);
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/app/data")));
        assert!(!config.system_fonts);
        assert_eq!(FontLocatorConfig::new().without_data_dir().data_dir, None);
    }
}
