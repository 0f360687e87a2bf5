//! Triplifier lookup by name, file extension and media type.

use crate::error::{FacadeError, Result};
use crate::locator::ResourceProbe;
use crate::properties::{keys, OptionSet};
use crate::triplifier::{
    ArchiveTriplifier, CsvTriplifier, FolderTriplifier, JsonTriplifier, TextTriplifier, Triplifier,
    XmlTriplifier,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Media type reported for directories.
pub const DIRECTORY_MEDIA_TYPE: &str = "inode/directory";

/// Which rule picked a triplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    Override,
    Extension,
    MediaType,
}

#[derive(Clone)]
pub struct Selection {
    pub triplifier: Arc<dyn Triplifier>,
    pub rule: SelectionRule,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("triplifier", &self.triplifier.name())
            .field("rule", &self.rule)
            .finish()
    }
}

/// Collects triplifiers before freezing them into a [`TriplifierRegistry`].
///
/// A later registration wins over an earlier one for the same name,
/// extension or media type.
#[derive(Default)]
pub struct TriplifierRegistryBuilder {
    triplifiers: Vec<Arc<dyn Triplifier>>,
}

impl TriplifierRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in converters.
    pub fn with_defaults(self) -> Self {
        self.register(CsvTriplifier)
            .register(JsonTriplifier)
            .register(XmlTriplifier)
            .register(TextTriplifier)
            .register(ArchiveTriplifier)
            .register(FolderTriplifier)
    }

    pub fn register(self, triplifier: impl Triplifier + 'static) -> Self {
        self.register_arc(Arc::new(triplifier))
    }

    pub fn register_arc(mut self, triplifier: Arc<dyn Triplifier>) -> Self {
        self.triplifiers.push(triplifier);
        self
    }

    pub fn build(self) -> TriplifierRegistry {
        let mut registry = TriplifierRegistry::default();
        for triplifier in self.triplifiers {
            let index = registry.triplifiers.len();
            registry.by_name.insert(triplifier.name().to_ascii_lowercase(), index);
            for extension in triplifier.supported_extensions() {
                registry.by_extension.insert(extension.to_ascii_lowercase(), index);
            }
            for media_type in triplifier.supported_media_types() {
                registry.by_media_type.insert(media_type.to_ascii_lowercase(), index);
            }
            registry.triplifiers.push(triplifier);
        }
        registry
    }
}

/// Immutable triplifier lookup tables, shared by every call of an engine.
#[derive(Default)]
pub struct TriplifierRegistry {
    triplifiers: Vec<Arc<dyn Triplifier>>,
    by_name: HashMap<String, usize>,
    by_extension: HashMap<String, usize>,
    by_media_type: HashMap<String, usize>,
}

impl TriplifierRegistry {
    pub fn builder() -> TriplifierRegistryBuilder {
        TriplifierRegistryBuilder::new()
    }

    /// Registry holding only the built-in converters.
    pub fn with_defaults() -> Self {
        TriplifierRegistryBuilder::new().with_defaults().build()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.triplifiers.iter().map(|t| t.name())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Triplifier>> {
        self.lookup(&self.by_name, name)
    }

    pub fn for_extension(&self, extension: &str) -> Option<Arc<dyn Triplifier>> {
        self.lookup(&self.by_extension, extension)
    }

    /// Lookup ignoring case and parameters such as `; charset=utf-8`.
    pub fn for_media_type(&self, media_type: &str) -> Option<Arc<dyn Triplifier>> {
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        self.lookup(&self.by_media_type, essence)
    }

    fn lookup(&self, table: &HashMap<String, usize>, key: &str) -> Option<Arc<dyn Triplifier>> {
        table.get(&key.to_ascii_lowercase()).map(|&i| Arc::clone(&self.triplifiers[i]))
    }

    /// True if some converter claims the extension of `location`.
    pub fn recognizes(&self, location: &str) -> bool {
        extension_of(location).is_some_and(|ext| self.by_extension.contains_key(&ext))
    }

    pub fn recognizes_directories(&self) -> bool {
        self.by_media_type.contains_key(DIRECTORY_MEDIA_TYPE)
    }

    /// Pick the converter for a call.
    ///
    /// Precedence: the `triplifier` option, then the file extension, then
    /// the declared or probed media type.
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::UnsupportedMediaType` when no rule matches.
    pub fn select(&self, options: &OptionSet, probe: &ResourceProbe) -> Result<Selection> {
        let unsupported = || FacadeError::UnsupportedMediaType {
            location: options.location().unwrap_or("<content>").to_string(),
            media_type: options.media_type().or(probe.media_type.as_deref()).map(str::to_string),
        };

        if let Some(name) = options.get(keys::TRIPLIFIER) {
            return self
                .get(name)
                .map(|triplifier| Selection { triplifier, rule: SelectionRule::Override })
                .ok_or_else(unsupported);
        }
        if let Some(triplifier) = probe.extension.as_deref().and_then(|e| self.for_extension(e)) {
            return Ok(Selection { triplifier, rule: SelectionRule::Extension });
        }
        options
            .media_type()
            .or(probe.media_type.as_deref())
            .and_then(|m| self.for_media_type(m))
            .map(|triplifier| Selection { triplifier, rule: SelectionRule::MediaType })
            .ok_or_else(unsupported)
    }
}

/// Lower-cased extension of the last path segment of a path or URL.
pub fn extension_of(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let name = path.rsplit(['/', '\\']).next().unwrap_or_default();
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            Some(extension.to_ascii_lowercase())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("data/a.CSV"), Some("csv".to_string()));
        assert_eq!(extension_of("http://h/x.json?v=1#top"), Some("json".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("http://h/dir/"), None);
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_media_type_parameters_ignored() {
        let registry = TriplifierRegistry::with_defaults();
        let found = registry.for_media_type("Text/CSV; charset=utf-8").unwrap();
        assert_eq!(found.name(), "csv");
    }
}
