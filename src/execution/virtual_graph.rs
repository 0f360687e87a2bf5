//! The virtual-graph operator.
//!
//! For every binding reaching a `SERVICE <x-sparql-anything:...>` call the
//! operator resolves the call's options, picks a triplifier, finds or
//! starts the buffered source for the resulting fingerprint and hands back
//! a [`VirtualGraphView`] the service body is matched against.

use crate::algebra::{Expression, GraphPattern, NamedNodePattern, PropertyPath};
use crate::config::FacadeXConfig;
use crate::core::vocab::Vocabulary;
use crate::core::{Solution, Triple};
use crate::error::{FacadeError, Result};
use crate::execution::dataset::{matches, ActiveGraph, Dataset, TripleIter};
use crate::facade_x::{GraphShape, SinkGraphBuilder};
use crate::locator::ResourceLocator;
use crate::properties::{keys, OptionSet, PropertyAssertion, PropertyResolver, Resolution};
use crate::source::{BufferedTripleSource, Fingerprint, VirtualGraphCache};
use crate::triplifier::{TriplifierRegistry, TriplifierRequest};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, Term};
use oxigraph::sparql::Variable;
use std::sync::Arc;

/// A resolved call: its options and the triples they address.
pub struct VirtualGraphView {
    source: Arc<BufferedTripleSource>,
    fingerprint: Fingerprint,
    audit: bool,
    vocabulary: Arc<Vocabulary>,
}

impl VirtualGraphView {
    pub fn source(&self) -> &Arc<BufferedTripleSource> {
        &self.source
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn graph_id(&self) -> &str {
        self.source.id()
    }

    pub fn is_audit(&self) -> bool {
        self.audit
    }

    /// `(graph, triple count)` for every per-call graph, once the source is
    /// complete.
    pub fn triple_counts(&self) -> Result<Vec<(NamedNode, usize)>> {
        self.source.graph_counts()
    }

    fn audit_triples(&self) -> Result<Vec<Triple>> {
        Ok(self
            .triple_counts()?
            .into_iter()
            .map(|(graph, count)| {
                let count = Literal::new_typed_literal(count.to_string(), xsd::INTEGER);
                Triple::new(graph, self.vocabulary.triple_count.clone(), count)
            })
            .collect())
    }
}

impl Dataset for VirtualGraphView {
    fn triples(
        &self,
        graph: &ActiveGraph,
        subject: Option<&Term>,
        predicate: Option<&NamedNode>,
        object: Option<&Term>,
    ) -> Result<TripleIter> {
        let (subject, predicate, object) = (subject.cloned(), predicate.cloned(), object.cloned());
        match graph {
            ActiveGraph::Named(name) if self.audit && *name == self.vocabulary.audit_graph => {
                let triples: Vec<Triple> = self
                    .audit_triples()?
                    .into_iter()
                    .filter(|t| matches(t, subject.as_ref(), predicate.as_ref(), object.as_ref()))
                    .collect();
                Ok(Box::new(triples.into_iter().map(Ok)))
            }
            _ => {
                let scan = match &subject {
                    Some(subject) => self.source.scan_subject(subject),
                    None => self.source.scan(),
                };
                let graph = match graph {
                    ActiveGraph::Named(name) => Some(name.clone()),
                    ActiveGraph::Default => None,
                };
                Ok(Box::new(scan.filter_map(move |quad| match quad {
                    Err(err) => Some(Err(err)),
                    Ok(quad) if graph.as_ref().map_or(true, |g| *g == quad.graph) => {
                        matches(&quad.triple, subject.as_ref(), predicate.as_ref(), object.as_ref())
                            .then_some(Ok(quad.triple))
                    }
                    Ok(_) => None,
                })))
            }
        }
    }

    fn graph_names(&self) -> Result<Vec<NamedNode>> {
        Ok(self.triple_counts()?.into_iter().map(|(graph, _)| graph).collect())
    }
}

/// A service body split into the parts evaluated before the call's options
/// are resolved and the parts matched against the virtual graph.
pub struct ServiceBody<'a> {
    pub assertions: Vec<PropertyAssertion>,
    /// `VALUES` and `BIND` parts that read no triples
    pub preamble: Vec<&'a GraphPattern>,
    pub data: Vec<&'a GraphPattern>,
    pub filters: Vec<&'a Expression>,
}

pub struct VirtualGraphOperator {
    vocabulary: Arc<Vocabulary>,
    registry: Arc<TriplifierRegistry>,
    locator: Arc<ResourceLocator>,
    cache: Arc<VirtualGraphCache>,
    resolver: PropertyResolver,
    defaults: FacadeXConfig,
}

impl VirtualGraphOperator {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        registry: Arc<TriplifierRegistry>,
        locator: Arc<ResourceLocator>,
        cache: Arc<VirtualGraphCache>,
        defaults: FacadeXConfig,
    ) -> Result<Self> {
        let resolver = PropertyResolver::new(Arc::clone(&vocabulary))?;
        Ok(Self { vocabulary, registry, locator, cache, resolver, defaults })
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn registry(&self) -> &TriplifierRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &VirtualGraphCache {
        &self.cache
    }

    pub fn resolver(&self) -> &PropertyResolver {
        &self.resolver
    }

    /// The address a service name denotes under `binding`.
    ///
    /// # Errors
    ///
    /// `MissingRequiredOption` for an unbound name variable and
    /// `UnsupportedOperation` for a service that is not a virtual graph.
    pub fn address(&self, name: &NamedNodePattern, binding: &Solution) -> Result<String> {
        let address = match name {
            NamedNodePattern::NamedNode(node) => node.as_str().to_string(),
            NamedNodePattern::Variable(variable) => match binding.get(variable) {
                Some(Term::NamedNode(node)) => node.as_str().to_string(),
                Some(Term::Literal(literal)) => literal.value().to_string(),
                Some(other) => {
                    return Err(FacadeError::UnsupportedOperation(format!(
                        "service name bound to {other}"
                    )))
                }
                None => {
                    return Err(FacadeError::MissingRequiredOption {
                        key: "service".to_string(),
                        variable: Some(variable.clone()),
                    })
                }
            },
        };
        if !self.vocabulary.is_service_address(&address) {
            return Err(FacadeError::UnsupportedOperation(format!(
                "SERVICE <{address}> is not a virtual graph"
            )));
        }
        Ok(address)
    }

    /// Split a service body into property assertions, preamble, data and
    /// trailing filters.
    pub fn split_body<'a>(&self, inner: &'a GraphPattern) -> Result<ServiceBody<'a>> {
        let mut body = ServiceBody {
            assertions: Vec::new(),
            preamble: Vec::new(),
            data: Vec::new(),
            filters: Vec::new(),
        };
        let mut current = inner;
        while let GraphPattern::Filter { expression, inner } = current {
            body.filters.push(expression);
            current = inner;
        }
        let mut parts = Vec::new();
        flatten_join(current, &mut parts);
        for part in parts {
            self.collect_assertions(part, &mut body.assertions)?;
            if self.reads_triples(part) {
                body.data.push(part);
            } else {
                body.preamble.push(part);
            }
        }
        Ok(body)
    }

    fn collect_assertions(&self, pattern: &GraphPattern, out: &mut Vec<PropertyAssertion>) -> Result<()> {
        match pattern {
            GraphPattern::Bgp(patterns) => out.extend(self.resolver.assertions(patterns)?),
            GraphPattern::Extend { inner, .. } | GraphPattern::Filter { inner, .. } => {
                self.collect_assertions(inner, out)?
            }
            GraphPattern::Join { left, right } => {
                self.collect_assertions(left, out)?;
                self.collect_assertions(right, out)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// True if evaluating `pattern` matches triples of the virtual graph.
    pub fn reads_triples(&self, pattern: &GraphPattern) -> bool {
        match pattern {
            GraphPattern::Bgp(patterns) => {
                patterns.iter().any(|p| !self.resolver.is_property_pattern(p))
            }
            GraphPattern::Values { .. } => false,
            GraphPattern::Extend { inner, .. } | GraphPattern::Filter { inner, .. } => {
                self.reads_triples(inner)
            }
            GraphPattern::Join { left, right } => self.reads_triples(left) || self.reads_triples(right),
            _ => true,
        }
    }

    /// Variables a service call needs bound before it can be resolved:
    /// its name and the values of its property assertions, minus what its
    /// own preamble binds.
    pub fn required_variables(&self, pattern: &GraphPattern) -> Vec<Variable> {
        match pattern {
            GraphPattern::Service { name, inner, .. } => {
                let Ok(body) = self.split_body(inner) else {
                    return Vec::new();
                };
                let provided: Vec<Variable> =
                    body.preamble.iter().flat_map(|p| p.variables()).collect();
                let mut required: Vec<Variable> = match name {
                    NamedNodePattern::Variable(v) => vec![v.clone()],
                    NamedNodePattern::NamedNode(_) => Vec::new(),
                };
                for assertion in body.assertions {
                    if let Some(variable) = assertion.value.as_variable() {
                        if !provided.contains(variable) && !required.contains(variable) {
                            required.push(variable.clone());
                        }
                    }
                }
                required
            }
            GraphPattern::Filter { inner, .. }
            | GraphPattern::Extend { inner, .. }
            | GraphPattern::Project { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Slice { inner, .. } => self.required_variables(inner),
            GraphPattern::Join { left, .. } | GraphPattern::LeftJoin { left, .. } => {
                self.required_variables(left)
            }
            _ => Vec::new(),
        }
    }

    /// Resolve the options of a call for one binding.
    pub fn resolve_options(
        &self,
        address: &str,
        assertions: &[PropertyAssertion],
        binding: &Solution,
    ) -> Result<OptionSet> {
        match self.resolver.resolve(address, assertions, binding)? {
            Resolution::Resolved(options) => Ok(options),
            pending @ Resolution::Pending(_) => pending.into_options(),
        }
    }

    /// Find or start the virtual graph for `options`.
    ///
    /// The resource is checked for availability and a triplifier selected
    /// before anything is cached, so those failures never leave an entry
    /// behind. A conversion failure removes the entry once it happens, and
    /// the next call retries.
    pub fn open(&self, options: &OptionSet) -> Result<VirtualGraphView> {
        let shape = GraphShape::from_options(options, &self.defaults)?;
        let audit = options.get_bool(keys::AUDIT)?.unwrap_or(false);

        self.locator.check_available(options)?;
        let probe = self.locator.probe(options);
        let selection = self.registry.select(options, &probe)?;
        let triplifier = selection.triplifier;
        tracing::debug!(
            location = options.location().unwrap_or("<content>"),
            triplifier = triplifier.name(),
            rule = ?selection.rule,
            "triplifier selected"
        );

        let fingerprint = Fingerprint::new(self.locator.identity(options), options, triplifier.name());
        let graph_id = fingerprint.graph_id();
        let source = loop {
            let (source, _) = self
                .cache
                .get_or_insert_with(&fingerprint, || BufferedTripleSource::new(graph_id.clone()));
            if source.state() != crate::source::MaterializationState::Failed {
                break source;
            }
            self.cache.remove_source(&fingerprint, &source);
        };

        let root_id = shape.root.clone().unwrap_or_else(|| format!("{graph_id}#"));
        let job = Conversion {
            options: options.clone(),
            shape,
            root_id,
            fingerprint: fingerprint.clone(),
            vocabulary: Arc::clone(&self.vocabulary),
            registry: Arc::clone(&self.registry),
            locator: Arc::clone(&self.locator),
            cache: Arc::clone(&self.cache),
            triplifier,
        };
        source.materialize_with(move |writer| job.run(writer));

        Ok(VirtualGraphView { source, fingerprint, audit, vocabulary: Arc::clone(&self.vocabulary) })
    }

    /// Reject pattern shapes audit mode cannot count correctly.
    pub fn check_audit_support(&self, pattern: &GraphPattern) -> Result<()> {
        let unsupported = |what: &str| {
            Err(FacadeError::UnsupportedOperation(format!("{what} in an audited virtual graph")))
        };
        match pattern {
            GraphPattern::Path { path, .. } if !is_plain_predicate(path) => unsupported("property paths"),
            GraphPattern::Graph { name: NamedNodePattern::Variable(_), .. } => {
                unsupported("GRAPH with a variable name")
            }
            GraphPattern::Service { .. } | GraphPattern::Bgp(_) | GraphPattern::Values { .. } => Ok(()),
            GraphPattern::Path { .. } => Ok(()),
            GraphPattern::Join { left, right }
            | GraphPattern::LeftJoin { left, right }
            | GraphPattern::Union { left, right } => {
                self.check_audit_support(left)?;
                self.check_audit_support(right)
            }
            GraphPattern::Filter { inner, .. }
            | GraphPattern::Extend { inner, .. }
            | GraphPattern::Graph { inner, .. }
            | GraphPattern::Project { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Slice { inner, .. } => self.check_audit_support(inner),
        }
    }
}

fn is_plain_predicate(path: &PropertyPath) -> bool {
    matches!(path, PropertyPath::Predicate(_))
}

pub(crate) fn flatten_join<'a>(pattern: &'a GraphPattern, out: &mut Vec<&'a GraphPattern>) {
    match pattern {
        GraphPattern::Join { left, right } => {
            flatten_join(left, out);
            flatten_join(right, out);
        }
        other => out.push(other),
    }
}

/// Everything the background conversion of one virtual graph owns.
struct Conversion {
    options: OptionSet,
    shape: GraphShape,
    root_id: String,
    fingerprint: Fingerprint,
    vocabulary: Arc<Vocabulary>,
    registry: Arc<TriplifierRegistry>,
    locator: Arc<ResourceLocator>,
    cache: Arc<VirtualGraphCache>,
    triplifier: Arc<dyn crate::triplifier::Triplifier>,
}

impl Conversion {
    fn run(self, writer: &mut crate::source::SourceWriter) -> Result<()> {
        let graph_id = writer.source().id().to_string();
        let request = TriplifierRequest::new(
            &self.options,
            &self.locator,
            &self.registry,
            &graph_id,
            self.root_id.clone(),
        );
        let mut builder = SinkGraphBuilder::new(self.shape.clone(), Arc::clone(&self.vocabulary), &mut *writer);
        let outcome = self.triplifier.triplify(&request, &mut builder);
        drop(builder);
        outcome.map_err(|err| {
            self.cache.remove_source(&self.fingerprint, writer.source());
            err.into_facade_error(request.location(), self.triplifier.name())
        })
    }
}
