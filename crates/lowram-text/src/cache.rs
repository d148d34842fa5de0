//! Registry of shared atlas managers keyed by font identity.
//!
//! Font handles that ask for the same file, size, antialiasing mode and DPI
//! get the same [`AtlasManager`], so each glyph is rasterized and uploaded
//! once no matter how many handles draw it.
//!
//! The registry is an ordinary value owned by the application. Dropping it
//! tears down, in order, every registered manager, their font faces, and
//! finally the registry's reference to the font engine.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error};

use crate::atlas::AtlasManager;
use crate::config::AtlasConfig;
use crate::engine::FontEngine;
use crate::error::AtlasResult;
use crate::locator::FontLocator;
use crate::logging::targets;
use crate::texture::TextureAllocator;

/// An atlas manager shared between the cache and font handles.
pub type SharedAtlas = Rc<RefCell<AtlasManager>>;

/// The parameters that determine how glyphs are rasterized.
///
/// Two handles with equal identities share one atlas manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontIdentity {
    /// Font file path or system font name, as requested.
    pub path: String,
    /// Size in points.
    pub size: u32,
    /// Antialiased (8-bit) or aliased (1-bit) rendering.
    pub antialiased: bool,
    /// Rendering DPI. `0` stands for the configured default.
    pub dpi: u32,
}

impl FontIdentity {
    /// Identity at the default DPI.
    pub fn new(path: impl Into<String>, size: u32, antialiased: bool) -> Self {
        Self {
            path: path.into(),
            size,
            antialiased,
            dpi: 0,
        }
    }

    /// Set the rendering DPI.
    #[must_use]
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// The identity with a zero DPI replaced by the configured default.
    pub fn normalized(&self, config: &AtlasConfig) -> Self {
        Self {
            dpi: config.effective_dpi(self.dpi),
            ..self.clone()
        }
    }
}

/// Registry mapping font identities to shared atlas managers.
pub struct FontCache {
    // Declared first so managers (and their faces) drop before the engine.
    entries: HashMap<FontIdentity, SharedAtlas>,
    engine: Rc<dyn FontEngine>,
    textures: Rc<dyn TextureAllocator>,
    locator: FontLocator,
    config: AtlasConfig,
}

impl FontCache {
    /// Create an empty registry with the default locator and configuration.
    pub fn new(engine: Rc<dyn FontEngine>, textures: Rc<dyn TextureAllocator>) -> Self {
        Self {
            entries: HashMap::new(),
            engine,
            textures,
            locator: FontLocator::default(),
            config: AtlasConfig::default(),
        }
    }

    /// Use a custom font locator.
    #[must_use]
    pub fn with_locator(mut self, locator: FontLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Use a custom atlas configuration for managers created from now on.
    #[must_use]
    pub fn with_config(mut self, config: AtlasConfig) -> Self {
        self.config = config;
        self
    }

    /// The atlas configuration.
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// The font locator.
    pub fn locator(&self) -> &FontLocator {
        &self.locator
    }

    /// Return the manager registered for `identity`, creating it on first request.
    ///
    /// A manager is registered only once its setup has succeeded; on failure
    /// the registry is left exactly as it was.
    pub fn get_or_create(&mut self, identity: &FontIdentity) -> AtlasResult<SharedAtlas> {
        let key = identity.normalized(&self.config);
        if let Some(atlas) = self.entries.get(&key) {
            debug!(target: targets::CACHE, identity = ?key, "cache hit");
            return Ok(Rc::clone(atlas));
        }

        debug!(target: targets::CACHE, identity = ?key, "cache miss");
        let manager = AtlasManager::setup(
            self.engine.as_ref(),
            &self.locator,
            Rc::clone(&self.textures),
            &key,
            &self.config,
        )
        .inspect_err(|err| {
            error!(target: targets::CACHE, identity = ?key, error = %err, "atlas setup failed");
        })?;

        let atlas = Rc::new(RefCell::new(manager));
        self.entries.insert(key, Rc::clone(&atlas));
        Ok(atlas)
    }

    /// The registered manager for `identity`, if any. Never creates one.
    pub fn get(&self, identity: &FontIdentity) -> Option<SharedAtlas> {
        self.entries
            .get(&identity.normalized(&self.config))
            .map(Rc::clone)
    }

    /// Check if a manager is registered for `identity`.
    pub fn contains(&self, identity: &FontIdentity) -> bool {
        self.entries.contains_key(&identity.normalized(&self.config))
    }

    /// Remove one entry. Handles that hold the manager keep it alive.
    ///
    /// Returns whether an entry was removed.
    pub fn release(&mut self, identity: &FontIdentity) -> bool {
        let removed = self
            .entries
            .remove(&identity.normalized(&self.config))
            .is_some();
        debug!(target: targets::CACHE, identity = ?identity, removed, "release");
        removed
    }

    /// Remove every entry. Handles that hold managers keep them alive.
    pub fn clear(&mut self) {
        debug!(target: targets::CACHE, entries = self.entries.len(), "clear");
        self.entries.clear();
    }

    /// Number of registered managers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no manager is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities, in no particular order.
    pub fn identities(&self) -> impl Iterator<Item = &FontIdentity> {
        self.entries.keys()
    }

    /// Sum of [`AtlasManager::memory_usage`] over registered managers.
    ///
    /// Each manager is counted once however many handles share it. Managers
    /// kept alive only by handles after `release`/`clear` are not counted.
    pub fn total_memory_usage(&self) -> usize {
        self.entries
            .values()
            .map(|atlas| atlas.borrow().memory_usage())
            .sum()
    }
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCache")
            .field("engine", &self.engine.name())
            .field("entries", &self.entries.len())
            .field("config", &self.config)
            .field("locator", &self.locator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_normalizes_zero_dpi() {
        let config = AtlasConfig::default();
        let identity = FontIdentity::new("a.ttf", 12, true);
        assert_eq!(identity.normalized(&config).dpi, 96);
        assert_eq!(identity.normalized(&config), identity.clone().with_dpi(96).normalized(&config));
        assert_ne!(identity.normalized(&config), identity.with_dpi(144).normalized(&config));
    }

    #[test]
    fn identity_distinguishes_size_and_mode() {
        let base = FontIdentity::new("a.ttf", 12, true);
        assert_ne!(base, FontIdentity::new("a.ttf", 13, true));
        assert_ne!(base, FontIdentity::new("a.ttf", 12, false));
        assert_ne!(base, FontIdentity::new("b.ttf", 12, true));
    }
}
