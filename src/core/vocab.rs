//! Facade-X vocabulary.
//!
//! The IRIs are plain constants; the [`Vocabulary`] value holds them as
//! parsed terms and is constructed once per engine and shared through an
//! `Arc` with every component that matches or emits them.

use oxigraph::model::vocab::rdf;
use oxigraph::model::NamedNode;

/// Namespace of the Facade-X terms
pub const FX_NAMESPACE: &str = "http://sparql.xyz/facade-x/ns/";
/// Default namespace for predicates and types derived from source data
pub const DEFAULT_DATA_NAMESPACE: &str = "http://sparql.xyz/facade-x/data/";
/// Scheme prefix of a virtual-graph service address
pub const SERVICE_SCHEME: &str = "x-sparql-anything:";
/// Namespace of RDF container membership properties
pub const RDF_NAMESPACE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const RDFS_MEMBER: &str = "http://www.w3.org/2000/01/rdf-schema#member";

#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub root: NamedNode,
    pub properties: NamedNode,
    pub any_slot: NamedNode,
    pub audit_graph: NamedNode,
    pub triple_count: NamedNode,
    pub rdf_type: NamedNode,
    pub rdfs_member: NamedNode,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            root: fx("root"),
            properties: fx("properties"),
            any_slot: fx("anySlot"),
            audit_graph: fx("audit"),
            triple_count: fx("tripleCount"),
            rdf_type: rdf::TYPE.into_owned(),
            rdfs_member: NamedNode::new_unchecked(RDFS_MEMBER),
        }
    }

    /// The `rdf:_n` membership property for a 1-based slot.
    pub fn ordinal(&self, slot: u64) -> NamedNode {
        NamedNode::new_unchecked(format!("{RDF_NAMESPACE}_{slot}"))
    }

    /// Option key named by a property predicate: the local name for `fx:`
    /// predicates, the whole IRI otherwise.
    pub fn option_key<'a>(&self, predicate: &'a NamedNode) -> &'a str {
        predicate.as_str().strip_prefix(FX_NAMESPACE).unwrap_or(predicate.as_str())
    }

    pub fn is_service_address(&self, iri: &str) -> bool {
        iri.starts_with(SERVICE_SCHEME)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

fn fx(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{FX_NAMESPACE}{local}"))
}
