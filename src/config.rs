//! Engine configuration.
//!
//! Every value has a default, so an empty JSON object is a valid
//! configuration. Per-call options supplied in a query override the
//! Facade-X defaults configured here.

use crate::core::vocab::DEFAULT_DATA_NAMESPACE;
use crate::error::{FacadeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration handed to [`crate::QueryEngine`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub locator: LocatorConfig,
    pub facade_x: FacadeXConfig,
}

impl EngineConfig {
    /// Parse a configuration from a JSON document.
    ///
    /// # Example
    ///
    /// ```
    /// use facadex::EngineConfig;
    ///
    /// let config = EngineConfig::from_json_str(r#"{ "cache": { "max_entries": 8 } }"#).unwrap();
    /// assert_eq!(config.cache.max_entries, Some(8));
    /// assert!(config.facade_x.blank_nodes);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FacadeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

/// Virtual-graph cache settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached virtual graphs, `None` for unbounded
    pub max_entries: Option<usize>,
}

/// Resource locator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Directory relative file locations are resolved against
    pub base_dir: Option<PathBuf>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            http_timeout_secs: 30,
            user_agent: concat!("facadex/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Defaults for the shape of the emitted Facade-X graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeXConfig {
    /// Namespace used to derive predicate and type IRIs from local names
    pub namespace: String,
    /// Emit containers as blank nodes instead of IRIs
    pub blank_nodes: bool,
    /// Emit rdfs:member instead of rdf:_n for ordinal slots
    pub use_rdfs_member: bool,
}

impl Default for FacadeXConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_DATA_NAMESPACE.to_string(),
            blank_nodes: true,
            use_rdfs_member: false,
        }
    }
}
