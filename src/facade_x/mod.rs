//! Facade-X graph building.
//!
//! Converters never construct triples themselves. They describe the resource
//! as a tree of containers through the [`FacadeXGraphBuilder`] callbacks and
//! the builder turns that into the canonical triple shape:
//!
//! 1. a root container typed `fx:root`,
//! 2. child containers linked by ordinal (`rdf:_n`) or named slots,
//! 3. literal or IRI values attached to a container by one slot each,
//! 4. optional `rdf:type` triples derived from the source schema.
//!
//! Every callback names the call (a graph IRI) it belongs to; triples of
//! different calls end up in different graphs of the same virtual graph.

use crate::core::Quad;
use oxigraph::model::Term;
use thiserror::Error;

pub mod builder;

pub use builder::{GraphShape, SinkGraphBuilder};

/// Slot of a value or child container inside its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// 1-based ordinal position, emitted as `rdf:_n`
    Index(u64),
    /// Named key, emitted as a predicate in the configured namespace
    Key(String),
}

impl From<u64> for Slot {
    fn from(index: u64) -> Self {
        Slot::Index(index)
    }
}

impl From<usize> for Slot {
    fn from(index: usize) -> Self {
        Slot::Index(index as u64)
    }
}

impl From<&str> for Slot {
    fn from(key: &str) -> Self {
        Slot::Key(key.to_string())
    }
}

impl From<String> for Slot {
    fn from(key: String) -> Self {
        Slot::Key(key)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuilderError {
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    #[error("Slot index 0 on container '{container}', slots start at 1")]
    InvalidSlot { container: String },
}

/// Destination of the quads produced by a builder.
pub trait TripleSink {
    fn accept(&mut self, quad: Quad) -> Result<(), BuilderError>;
}

impl TripleSink for Vec<Quad> {
    fn accept(&mut self, quad: Quad) -> Result<(), BuilderError> {
        self.push(quad);
        Ok(())
    }
}

/// Callback contract every converter drives.
///
/// `call_id` is the IRI of the graph the triples go to, normally
/// [`crate::triplifier::TriplifierRequest::graph_id`].
pub trait FacadeXGraphBuilder {
    /// Declare the root container of a call. Repeated declarations for the
    /// same call are ignored.
    fn add_root(&mut self, call_id: &str, root_id: &str) -> Result<(), BuilderError>;

    /// Type a container with `namespace + type_name`.
    fn add_type(
        &mut self,
        call_id: &str,
        container_id: &str,
        type_name: &str,
    ) -> Result<(), BuilderError>;

    /// Link `child_id` into `parent_id` at `slot`.
    ///
    /// Ordinal slots must be at least 1; their order is the caller's
    /// responsibility and is not checked against earlier calls.
    fn add_container(
        &mut self,
        call_id: &str,
        parent_id: &str,
        slot: Slot,
        child_id: &str,
    ) -> Result<(), BuilderError>;

    /// Attach a literal or IRI value to a container.
    fn add_value(
        &mut self,
        call_id: &str,
        container_id: &str,
        slot: Slot,
        value: Term,
    ) -> Result<(), BuilderError>;

    /// Number of triples emitted so far.
    fn triple_count(&self) -> usize;
}
