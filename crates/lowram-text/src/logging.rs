//! Tracing targets for the glyph atlas engine.
//!
//! Every event emitted by this crate uses one of the targets below, so a
//! subscriber can filter a single subsystem:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lowram_text::atlas=debug,lowram_text::cache=info")
//!     .init();
//! ```

/// Target names for log filtering.
pub mod targets {
    /// Page packing, growth and page creation.
    pub const ATLAS: &str = "lowram_text::atlas";
    /// Shared instance cache lookups and releases.
    pub const CACHE: &str = "lowram_text::cache";
    /// Glyph rasterization.
    pub const RASTER: &str = "lowram_text::raster";
    /// Font handles and string walks.
    pub const FONT: &str = "lowram_text::font";
    /// Font path resolution.
    pub const LOCATOR: &str = "lowram_text::locator";
}
