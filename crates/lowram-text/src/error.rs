//! Error types for the glyph atlas engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by a font engine backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontEngineError {
    /// The font file could not be read.
    #[error("failed to read font file: {0}")]
    Io(String),

    /// The font data is not a format the engine understands.
    #[error("invalid font format: {0}")]
    InvalidFormat(String),

    /// The engine could not load or render a glyph.
    #[error("failed to load glyph {glyph_index}: {reason}")]
    GlyphLoad { glyph_index: u32, reason: String },
}

/// Errors reported by a texture backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// Requested dimensions are zero or exceed the platform maximum.
    #[error("invalid texture dimensions: {width}x{height} (max {max})")]
    InvalidDimensions { width: u32, height: u32, max: u32 },

    /// Uploaded pixel data does not match the texture size.
    #[error("pixel data is {actual:?}, texture is {expected:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The backend failed to create the texture.
    #[error("texture allocation failed: {0}")]
    Allocation(String),
}

/// Errors that can occur while setting up or filling an atlas.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// The requested font could not be resolved to a file.
    #[error("font not found: {requested}")]
    FontNotFound { requested: String },

    /// The resolved font file could not be opened by the font engine.
    #[error("failed to open font {path:?}: {source}")]
    FontOpen {
        path: PathBuf,
        #[source]
        source: FontEngineError,
    },

    /// A point size of zero was requested.
    #[error("invalid font size: {0}")]
    InvalidSize(u32),

    /// A glyph bitmap is larger than any page this platform can hold.
    #[error("glyph {width}x{height} does not fit in a {max}x{max} page")]
    GlyphTooLarge { width: u32, height: u32, max: u32 },

    /// The texture backend failed.
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Result type for atlas operations.
pub type AtlasResult<T> = Result<T, AtlasError>;
