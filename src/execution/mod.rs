//! Query evaluation over virtual graphs.
//!
//! # Components
//!
//! - **QueryEngine** - Owns the shared registry, locator and cache, and
//!   evaluates algebra trees
//! - **VirtualGraphOperator** - Resolves `SERVICE <x-sparql-anything:...>`
//!   calls into buffered virtual graphs
//! - **Evaluator** - Substitution-based evaluation of the algebra
//!
//! # Example
//!
//! ```no_run
//! use facadex::algebra::{GraphPattern, TriplePattern};
//! use facadex::{EngineConfig, QueryEngine};
//! use oxigraph::model::NamedNode;
//! use oxigraph::sparql::Variable;
//!
//! let engine = QueryEngine::new(EngineConfig::default()).unwrap();
//! let (s, p, o) = (Variable::new_unchecked("s"), Variable::new_unchecked("p"), Variable::new_unchecked("o"));
//! let pattern = GraphPattern::service(
//!     NamedNode::new("x-sparql-anything:location=data/a.csv,csv.headers=true").unwrap(),
//!     GraphPattern::bgp(vec![TriplePattern::new(s, p, o)]),
//! );
//! for solution in engine.evaluate(&pattern) {
//!     println!("{}", solution.unwrap());
//! }
//! ```

pub mod dataset;
pub mod evaluator;
pub mod expression;
pub mod path;
pub mod virtual_graph;

pub use dataset::{ActiveGraph, Dataset, LocalDataset};
pub use evaluator::{Evaluator, SolutionIter};
pub use virtual_graph::{VirtualGraphOperator, VirtualGraphView};

use crate::algebra::GraphPattern;
use crate::config::EngineConfig;
use crate::core::vocab::Vocabulary;
use crate::core::{Solution, Triple};
use crate::error::Result;
use crate::locator::ResourceLocator;
use crate::source::VirtualGraphCache;
use crate::triplifier::TriplifierRegistry;
use std::sync::Arc;

/// Entry point: evaluates algebra trees whose `SERVICE` calls name
/// virtual graphs.
pub struct QueryEngine {
    config: EngineConfig,
    operator: VirtualGraphOperator,
    default_graph: Arc<LocalDataset>,
}

impl QueryEngine {
    /// Engine with the built-in triplifiers.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_registry(config, TriplifierRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, registry: TriplifierRegistry) -> Result<Self> {
        let operator = VirtualGraphOperator::new(
            Arc::new(Vocabulary::new()),
            Arc::new(registry),
            Arc::new(ResourceLocator::new(config.locator.clone())),
            Arc::new(VirtualGraphCache::new(&config.cache)),
            config.facade_x.clone(),
        )?;
        Ok(Self { config, operator, default_graph: Arc::new(LocalDataset::default()) })
    }

    /// Triples matched by patterns outside of any virtual-graph call.
    pub fn with_default_graph(mut self, triples: impl IntoIterator<Item = Triple>) -> Self {
        self.default_graph = Arc::new(LocalDataset::new(triples.into_iter().collect()));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn operator(&self) -> &VirtualGraphOperator {
        &self.operator
    }

    pub fn cache(&self) -> &VirtualGraphCache {
        self.operator.cache()
    }

    /// Lazily evaluate `pattern` starting from the empty binding.
    pub fn evaluate<'a>(&'a self, pattern: &'a GraphPattern) -> SolutionIter<'a> {
        self.evaluate_from(pattern, Solution::new())
    }

    pub fn evaluate_from<'a>(&'a self, pattern: &'a GraphPattern, input: Solution) -> SolutionIter<'a> {
        let dataset: Arc<dyn Dataset> = self.default_graph.clone();
        Evaluator::new(&self.operator, dataset).eval(pattern, &ActiveGraph::Default, input)
    }

    /// Evaluate and collect, failing on the first error.
    pub fn query(&self, pattern: &GraphPattern) -> Result<Vec<Solution>> {
        self.evaluate(pattern).collect()
    }
}
