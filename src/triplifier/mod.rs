//! Converter plugins ("triplifiers").
//!
//! A triplifier turns one resource format into Facade-X triples by driving a
//! [`FacadeXGraphBuilder`]. It never opens files or sockets itself: the
//! [`TriplifierRequest`] hands it the resolved options and access to the
//! [`ResourceLocator`].

use crate::error::FacadeError;
use crate::facade_x::{BuilderError, FacadeXGraphBuilder};
use crate::locator::{LocatorError, ResourceLocator};
use crate::properties::OptionSet;
use std::io::Read;
use thiserror::Error;

pub mod archive;
pub mod csv;
pub mod folder;
pub mod json;
pub mod registry;
pub mod text;
pub mod xml;

pub use archive::ArchiveTriplifier;
pub use self::csv::CsvTriplifier;
pub use folder::FolderTriplifier;
pub use json::JsonTriplifier;
pub use registry::{Selection, SelectionRule, TriplifierRegistry, TriplifierRegistryBuilder};
pub use text::TextTriplifier;
pub use xml::XmlTriplifier;

#[derive(Error, Debug)]
pub enum TriplifierError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Option(#[from] FacadeError),

    #[error("{0}")]
    Parse(String),
}

impl TriplifierError {
    pub fn parse(reason: impl std::fmt::Display) -> Self {
        TriplifierError::Parse(reason.to_string())
    }

    /// Map to the error reported by the virtual-graph call.
    ///
    /// Locator failures become `ResourceUnavailable`, everything the
    /// converter itself raised becomes `ConversionFailure`.
    pub fn into_facade_error(self, location: &str, triplifier: &str) -> FacadeError {
        match self {
            TriplifierError::Locator(err) => err.into(),
            TriplifierError::Option(err) => err,
            TriplifierError::Builder(err) => FacadeError::ConversionFailure {
                location: location.to_string(),
                triplifier: triplifier.to_string(),
                reason: err.to_string(),
            },
            TriplifierError::Parse(reason) => FacadeError::ConversionFailure {
                location: location.to_string(),
                triplifier: triplifier.to_string(),
                reason,
            },
        }
    }
}

/// A converter from one resource format to Facade-X.
pub trait Triplifier: Send + Sync {
    /// Name used by the `triplifier` override option.
    fn name(&self) -> &'static str;

    /// Lower-case file extensions without the dot.
    fn supported_extensions(&self) -> &'static [&'static str];

    fn supported_media_types(&self) -> &'static [&'static str];

    /// Convert the requested resource.
    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError>;
}

/// Everything a converter may consult during one conversion.
pub struct TriplifierRequest<'a> {
    options: &'a OptionSet,
    locator: &'a ResourceLocator,
    registry: &'a TriplifierRegistry,
    graph_id: &'a str,
    root_id: String,
}

impl<'a> TriplifierRequest<'a> {
    pub fn new(
        options: &'a OptionSet,
        locator: &'a ResourceLocator,
        registry: &'a TriplifierRegistry,
        graph_id: &'a str,
        root_id: String,
    ) -> Self {
        Self { options, locator, registry, graph_id, root_id }
    }

    pub fn options(&self) -> &OptionSet {
        self.options
    }

    pub fn locator(&self) -> &ResourceLocator {
        self.locator
    }

    pub fn registry(&self) -> &TriplifierRegistry {
        self.registry
    }

    /// Call id of the main graph of this conversion.
    pub fn graph_id(&self) -> &str {
        self.graph_id
    }

    /// Id of the root container.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// The location, or a placeholder for inline content.
    pub fn location(&self) -> &str {
        self.options.location().unwrap_or("<content>")
    }

    pub fn open(&self) -> Result<Box<dyn Read + Send>, TriplifierError> {
        Ok(self.locator.open(self.options)?)
    }

    /// Read the whole resource as UTF-8 text.
    pub fn read_to_string(&self) -> Result<String, TriplifierError> {
        let mut bytes = Vec::new();
        self.open()?.read_to_end(&mut bytes).map_err(|source| LocatorError::Io {
            location: self.location().to_string(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|e| TriplifierError::parse(format!("not UTF-8: {e}")))
    }
}
