//! [`FacadeXGraphBuilder`] implementation that writes into a [`TripleSink`].

use crate::config::FacadeXConfig;
use crate::core::vocab::Vocabulary;
use crate::core::{Quad, Triple};
use crate::error::Result;
use crate::facade_x::{BuilderError, FacadeXGraphBuilder, Slot, TripleSink};
use crate::properties::{keys, OptionSet};
use oxigraph::model::{BlankNode, NamedNode, Term};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shape parameters of an emitted graph, resolved from a call's options on
/// top of the engine defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphShape {
    pub namespace: String,
    pub blank_nodes: bool,
    pub use_rdfs_member: bool,
    /// Explicit root IRI, overriding the converter supplied root id
    pub root: Option<String>,
}

impl GraphShape {
    pub fn from_options(options: &OptionSet, defaults: &FacadeXConfig) -> Result<Self> {
        Ok(Self {
            namespace: options.get(keys::NAMESPACE).unwrap_or(&defaults.namespace).to_string(),
            blank_nodes: options.get_bool(keys::BLANK_NODES)?.unwrap_or(defaults.blank_nodes),
            use_rdfs_member: options
                .get_bool(keys::USE_RDFS_MEMBER)?
                .unwrap_or(defaults.use_rdfs_member),
            root: options.get(keys::ROOT).map(str::to_string),
        })
    }
}

impl Default for GraphShape {
    fn default() -> Self {
        let defaults = FacadeXConfig::default();
        Self {
            namespace: defaults.namespace,
            blank_nodes: defaults.blank_nodes,
            use_rdfs_member: defaults.use_rdfs_member,
            root: None,
        }
    }
}

/// Builder emitting Facade-X quads into any [`TripleSink`].
///
/// # Example
///
/// ```
/// use facadex::core::vocab::Vocabulary;
/// use facadex::core::Quad;
/// use facadex::facade_x::{FacadeXGraphBuilder, GraphShape, SinkGraphBuilder, Slot};
/// use oxigraph::model::Literal;
/// use std::sync::Arc;
///
/// let mut builder =
///     SinkGraphBuilder::new(GraphShape::default(), Arc::new(Vocabulary::new()), Vec::<Quad>::new());
/// let call = "http://example.org/call";
/// builder.add_root(call, "root").unwrap();
/// builder.add_value(call, "root", Slot::Index(1), Literal::new_simple_literal("a").into()).unwrap();
/// assert_eq!(builder.into_sink().len(), 2);
/// ```
pub struct SinkGraphBuilder<S: TripleSink> {
    shape: GraphShape,
    vocabulary: Arc<Vocabulary>,
    sink: S,
    roots: HashSet<String>,
    graphs: HashMap<String, NamedNode>,
    emitted: usize,
}

impl<S: TripleSink> SinkGraphBuilder<S> {
    pub fn new(shape: GraphShape, vocabulary: Arc<Vocabulary>, sink: S) -> Self {
        Self {
            shape,
            vocabulary,
            sink,
            roots: HashSet::new(),
            graphs: HashMap::new(),
            emitted: 0,
        }
    }

    pub fn shape(&self) -> &GraphShape {
        &self.shape
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn graph(&mut self, call_id: &str) -> std::result::Result<NamedNode, BuilderError> {
        if let Some(graph) = self.graphs.get(call_id) {
            return Ok(graph.clone());
        }
        let graph = iri(call_id)?;
        self.graphs.insert(call_id.to_string(), graph.clone());
        Ok(graph)
    }

    fn node(&self, call_id: &str, id: &str) -> std::result::Result<Term, BuilderError> {
        if self.shape.root.as_deref() == Some(id) || !self.shape.blank_nodes {
            return Ok(iri(id)?.into());
        }
        let mut hasher = DefaultHasher::new();
        call_id.hash(&mut hasher);
        id.hash(&mut hasher);
        Ok(BlankNode::new_unchecked(format!("fx{:016x}", hasher.finish())).into())
    }

    fn predicate(&self, container_id: &str, slot: &Slot) -> std::result::Result<NamedNode, BuilderError> {
        match slot {
            Slot::Index(0) => Err(BuilderError::InvalidSlot { container: container_id.to_string() }),
            Slot::Index(_) if self.shape.use_rdfs_member => Ok(self.vocabulary.rdfs_member.clone()),
            Slot::Index(n) => Ok(self.vocabulary.ordinal(*n)),
            Slot::Key(key) => iri(&format!("{}{}", self.shape.namespace, urlencoding::encode(key))),
        }
    }

    fn emit(&mut self, graph: NamedNode, triple: Triple) -> std::result::Result<(), BuilderError> {
        self.sink.accept(Quad::new(graph, triple))?;
        self.emitted += 1;
        Ok(())
    }
}

impl<S: TripleSink> FacadeXGraphBuilder for SinkGraphBuilder<S> {
    fn add_root(&mut self, call_id: &str, root_id: &str) -> std::result::Result<(), BuilderError> {
        if self.roots.contains(call_id) {
            return Ok(());
        }
        let graph = self.graph(call_id)?;
        let root = self.node(call_id, root_id)?;
        self.roots.insert(call_id.to_string());
        let triple = Triple::new(root, self.vocabulary.rdf_type.clone(), self.vocabulary.root.clone());
        self.emit(graph, triple)
    }

    fn add_type(
        &mut self,
        call_id: &str,
        container_id: &str,
        type_name: &str,
    ) -> std::result::Result<(), BuilderError> {
        let graph = self.graph(call_id)?;
        let container = self.node(call_id, container_id)?;
        let class = iri(&format!("{}{}", self.shape.namespace, type_name))?;
        let triple = Triple::new(container, self.vocabulary.rdf_type.clone(), class);
        self.emit(graph, triple)
    }

    fn add_container(
        &mut self,
        call_id: &str,
        parent_id: &str,
        slot: Slot,
        child_id: &str,
    ) -> std::result::Result<(), BuilderError> {
        let graph = self.graph(call_id)?;
        let parent = self.node(call_id, parent_id)?;
        let predicate = self.predicate(parent_id, &slot)?;
        let child = self.node(call_id, child_id)?;
        self.emit(graph, Triple::new(parent, predicate, child))
    }

    fn add_value(
        &mut self,
        call_id: &str,
        container_id: &str,
        slot: Slot,
        value: Term,
    ) -> std::result::Result<(), BuilderError> {
        let graph = self.graph(call_id)?;
        let container = self.node(call_id, container_id)?;
        let predicate = self.predicate(container_id, &slot)?;
        self.emit(graph, Triple::new(container, predicate, value))
    }

    fn triple_count(&self) -> usize {
        self.emitted
    }
}

fn iri(value: &str) -> std::result::Result<NamedNode, BuilderError> {
    NamedNode::new(value).map_err(|e| BuilderError::InvalidIri(format!("<{value}>: {e}")))
}
