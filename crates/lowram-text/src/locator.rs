//! Font path resolution.
//!
//! A requested font is either a file name relative to the application data
//! directory, a path on disk, or the name of an installed font. The
//! [`FontLocator`] tries them in that order.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::FontLocatorConfig;
use crate::logging::targets;

/// Generic family name for the platform sans-serif font.
pub const SANS_SERIF: &str = "sans-serif";
/// Generic family name for the platform serif font.
pub const SERIF: &str = "serif";
/// Generic family name for the platform monospace font.
pub const MONOSPACE: &str = "monospace";

/// Resolves requested font names to font files.
///
/// The system font database is loaded on the first lookup that needs it.
pub struct FontLocator {
    config: FontLocatorConfig,
    system: OnceCell<fontdb::Database>,
}

impl Default for FontLocator {
    fn default() -> Self {
        Self::new(FontLocatorConfig::default())
    }
}

impl FontLocator {
    /// Create a locator with the given configuration.
    pub fn new(config: FontLocatorConfig) -> Self {
        Self {
            config,
            system: OnceCell::new(),
        }
    }

    /// The locator configuration.
    pub fn config(&self) -> &FontLocatorConfig {
        &self.config
    }

    /// Resolve `requested` to an existing font file.
    pub fn resolve(&self, requested: &str) -> Option<PathBuf> {
        if requested.is_empty() {
            return None;
        }

        if let Some(dir) = &self.config.data_dir {
            let candidate = dir.join(requested);
            if candidate.is_file() {
                trace!(target: targets::LOCATOR, path = %candidate.display(), "found in data dir");
                return Some(candidate);
            }
        }

        let direct = Path::new(requested);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }

        if !self.config.system_fonts {
            return None;
        }
        let path = self.system_font_path(requested)?;
        debug!(
            target: targets::LOCATOR,
            requested,
            path = %path.display(),
            "using system font"
        );
        Some(path)
    }

    fn system_font_path(&self, name: &str) -> Option<PathBuf> {
        let db = self.system.get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            debug!(target: targets::LOCATOR, faces = db.len(), "loaded system font database");
            db
        });

        let family = match name {
            SANS_SERIF => fontdb::Family::SansSerif,
            SERIF => fontdb::Family::Serif,
            MONOSPACE => fontdb::Family::Monospace,
            other => fontdb::Family::Name(other),
        };
        let id = db
            .query(&fontdb::Query {
                families: &[family],
                ..Default::default()
            })
            .or_else(|| {
                db.faces()
                    .find(|face| face.post_script_name == name)
                    .map(|face| face.id)
            })?;

        match db.face_source(id) {
            Some((fontdb::Source::File(path), _)) if path.is_file() => Some(path),
            _ => None,
        }
    }
}

impl std::fmt::Debug for FontLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLocator")
            .field("config", &self.config)
            .field("system_loaded", &self.system.get().is_some())
            .finish()
    }
}
