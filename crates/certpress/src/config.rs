//! Render configuration and collaborator interfaces
//!
//! The core takes its ambient defaults (date format, DPI) and its
//! collaborators (image lookup, font lookup) as explicit values rather
//! than process-wide state, so two generations with different settings
//! can run side by side.

use pdf_doc::FontFamily;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Explicit configuration passed into the resolver and renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// chrono strftime pattern used when a field has no `date_format`
    pub default_date_format: String,

    /// Pixels-per-inch assumed when converting raster pixels to points
    pub dpi: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_date_format: "%Y-%m-%d".to_string(),
            dpi: 72.0,
        }
    }
}

/// Maps an image field's opaque reference to loadable image bytes
pub trait ImageStore {
    fn load(&self, reference: &str) -> io::Result<Vec<u8>>;
}

/// Filesystem-backed image store rooted at a directory
///
/// References resolve relative to the root; absolute references and
/// parent traversal are rejected so a template cannot read outside it.
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ImageStore for DirImageStore {
    fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
        let relative = Path::new(reference);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("image reference escapes store root: {reference}"),
            ));
        }
        std::fs::read(self.root.join(relative))
    }
}

/// Maps a field's font family name to an embeddable family
///
/// Weight/style selection within a family happens at draw time through
/// [`pdf_doc::FontFamily`]'s nearest-variant fallback.
pub trait FontProvider {
    /// Family used when a field's family is unmapped
    fn default_family(&self) -> &str;

    /// Registered family by name (for document embedding)
    fn family(&self, name: &str) -> Option<&FontFamily>;
}

/// In-memory font catalog keyed by family name
#[derive(Default)]
pub struct FontCatalog {
    families: HashMap<String, FontFamily>,
    default_family: String,
}

impl FontCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family; the first registration becomes the default
    pub fn register(&mut self, name: &str, family: FontFamily) {
        if self.families.is_empty() {
            self.default_family = name.to_string();
        }
        self.families.insert(name.to_string(), family);
    }

    /// Override which family unmapped lookups fall back to
    pub fn set_default_family(&mut self, name: &str) {
        self.default_family = name.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn family_names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }
}

impl FontProvider for FontCatalog {
    fn default_family(&self) -> &str {
        &self.default_family
    }

    fn family(&self, name: &str) -> Option<&FontFamily> {
        self.families.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_values() {
        let config = RenderConfig::default();
        assert_eq!(config.default_date_format, "%Y-%m-%d");
        assert_eq!(config.dpi, 72.0);
    }

    #[test]
    fn dir_store_rejects_traversal() {
        let store = DirImageStore::new("/tmp/images");
        let err = store.load("../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = store.load("/etc/passwd").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn dir_store_loads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("seal.png"), b"not-a-real-png").unwrap();
        let store = DirImageStore::new(dir.path());
        assert_eq!(store.load("seal.png").unwrap(), b"not-a-real-png");
        assert!(store.load("missing.png").is_err());
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = FontCatalog::new();
        assert!(catalog.family("sans").is_none());
        assert!(catalog.is_empty());
        assert_eq!(catalog.default_family(), "");
    }
}
