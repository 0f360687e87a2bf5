//! Triple access for pattern matching.

use crate::core::Triple;
use crate::error::Result;
use oxigraph::model::{NamedNode, Term};
use std::sync::Arc;

pub type TripleIter = Box<dyn Iterator<Item = Result<Triple>> + Send>;

/// The graph a pattern is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveGraph {
    Default,
    Named(NamedNode),
}

/// Something triple patterns can be matched against.
///
/// `None` arguments are wildcards. Returned iterators own what they need,
/// so they may outlive the borrow of the dataset.
pub trait Dataset: Send + Sync {
    fn triples(
        &self,
        graph: &ActiveGraph,
        subject: Option<&Term>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> Result<TripleIter>;

    /// Names usable with `GRAPH ?g`.
    fn graph_names(&self) -> Result<Vec<NamedNode>>;
}

/// Plain in-memory default graph of the engine, matched by patterns
/// outside any virtual-graph call.
#[derive(Debug, Clone, Default)]
pub struct LocalDataset {
    triples: Arc<Vec<Triple>>,
}

impl LocalDataset {
    pub fn new(triples: Vec<Triple>) -> Self {
        Self { triples: Arc::new(triples) }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}

impl Dataset for LocalDataset {
    fn triples(
        &self,
        graph: &ActiveGraph,
        subject: Option<&Term>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> Result<TripleIter> {
        if *graph != ActiveGraph::Default {
            return Ok(Box::new(std::iter::empty()));
        }
        let matching: Vec<Triple> = self
            .triples
            .iter()
            .filter(|t| matches(t, subject, predicate, object))
            .cloned()
            .collect();
        Ok(Box::new(matching.into_iter().map(Ok)))
    }

    fn graph_names(&self) -> Result<Vec<NamedNode>> {
        Ok(Vec::new())
    }
}

pub(crate) fn matches(
    triple: &Triple,
    subject: Option<&Term>,
    predicate: Option<&NamedNode>,
    object: Option<&Term>,
) -> bool {
    subject.map_or(true, |s| *s == triple.subject)
        && predicate.map_or(true, |p| *p == triple.predicate)
        && object.map_or(true, |o| *o == triple.object)
}
