//! Substitution-based evaluation of [`GraphPattern`]s.
//!
//! Every operator is evaluated under one input binding and yields
//! extensions of it, so the right side of a join always sees the values
//! produced on its left. That is what lets a `SERVICE` address or a
//! `fx:properties` value come from an outer pattern. Results are produced
//! lazily; dropping the iterator early releases every scan it holds.

use crate::algebra::{GraphPattern, NamedNodePattern, TermPattern, TriplePattern};
use crate::core::{Solution, Triple};
use crate::error::Result;
use crate::execution::dataset::{ActiveGraph, Dataset};
use crate::execution::expression::{effective_boolean, evaluate};
use crate::execution::path::PathEvaluator;
use crate::execution::virtual_graph::{ServiceBody, VirtualGraphOperator};
use oxigraph::model::{NamedNode, Term};
use oxigraph::sparql::Variable;
use std::collections::HashSet;
use std::iter::once;
use std::sync::Arc;

pub type SolutionIter<'a> = Box<dyn Iterator<Item = Result<Solution>> + 'a>;

#[derive(Clone)]
pub struct Evaluator<'a> {
    operator: &'a VirtualGraphOperator,
    dataset: Arc<dyn Dataset>,
}

fn single<'a>(item: Result<Solution>) -> SolutionIter<'a> {
    Box::new(once(item))
}

fn nothing<'a>() -> SolutionIter<'a> {
    Box::new(std::iter::empty())
}

/// Feed every solution of `left` into `right`, passing errors through.
fn bind<'a>(
    left: SolutionIter<'a>,
    mut right: impl FnMut(Solution) -> SolutionIter<'a> + 'a,
) -> SolutionIter<'a> {
    Box::new(left.flat_map(move |solution| match solution {
        Ok(solution) => right(solution),
        Err(err) => single(Err(err)),
    }))
}

/// Bind `variable` to `term`, `false` if it is already bound differently.
fn bind_variable(solution: &mut Solution, variable: &Variable, term: Term) -> bool {
    match solution.get(variable) {
        Some(existing) => *existing == term,
        None => {
            solution.insert(variable.clone(), term);
            true
        }
    }
}

fn substitute(pattern: &TermPattern, solution: &Solution) -> Option<Term> {
    match pattern {
        TermPattern::Term(term) => Some(term.clone()),
        TermPattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(operator: &'a VirtualGraphOperator, dataset: Arc<dyn Dataset>) -> Self {
        Self { operator, dataset }
    }

    pub fn eval(&self, pattern: &'a GraphPattern, graph: &ActiveGraph, input: Solution) -> SolutionIter<'a> {
        match pattern {
            GraphPattern::Bgp(patterns) => self.bgp(patterns, graph, input),
            GraphPattern::Path { subject, path, object } => {
                let start = substitute(subject, &input);
                let end = substitute(object, &input);
                let any_slot = &self.operator.vocabulary().any_slot;
                let pairs = match PathEvaluator::new(self.dataset.as_ref(), graph, any_slot).pairs(
                    path,
                    start.as_ref(),
                    end.as_ref(),
                ) {
                    Ok(pairs) => pairs,
                    Err(err) => return single(Err(err)),
                };
                Box::new(pairs.into_iter().filter_map(move |(s, o)| {
                    let mut solution = input.clone();
                    let bound = [(subject, s), (object, o)].into_iter().all(|(pattern, term)| {
                        match pattern {
                            TermPattern::Variable(v) => bind_variable(&mut solution, v, term),
                            TermPattern::Term(_) => true,
                        }
                    });
                    bound.then_some(Ok(solution))
                }))
            }
            GraphPattern::Join { left, right } => self.join(left, right, graph, input),
            GraphPattern::LeftJoin { left, right } => {
                let this = self.clone();
                let graph_ = graph.clone();
                bind(self.eval(left, graph, input), move |solution| {
                    let extended: Vec<_> = this.eval(right, &graph_, solution.clone()).collect();
                    if extended.is_empty() {
                        single(Ok(solution))
                    } else {
                        Box::new(extended.into_iter())
                    }
                })
            }
            GraphPattern::Union { left, right } => {
                Box::new(self.eval(left, graph, input.clone()).chain(self.eval(right, graph, input)))
            }
            GraphPattern::Filter { expression, inner } => {
                Box::new(self.eval(inner, graph, input).filter(move |solution| match solution {
                    Ok(solution) => effective_boolean(expression, solution).unwrap_or(false),
                    Err(_) => true,
                }))
            }
            GraphPattern::Extend { inner, variable, expression } => {
                Box::new(self.eval(inner, graph, input).filter_map(move |solution| match solution {
                    Ok(mut solution) => match evaluate(expression, &solution) {
                        Some(term) => bind_variable(&mut solution, variable, term).then_some(Ok(solution)),
                        None => Some(Ok(solution)),
                    },
                    Err(err) => Some(Err(err)),
                }))
            }
            GraphPattern::Values { variables, bindings } => {
                Box::new(bindings.iter().filter_map(move |row| {
                    let mut solution = input.clone();
                    for (variable, value) in variables.iter().zip(row) {
                        if let Some(term) = value {
                            if !bind_variable(&mut solution, variable, term.clone()) {
                                return None;
                            }
                        }
                    }
                    Some(Ok(solution))
                }))
            }
            GraphPattern::Graph { name, inner } => self.graph(name, inner, input),
            GraphPattern::Service { name, inner, silent } => {
                if *silent {
                    let results: Result<Vec<Solution>> = self.service(name, inner, input.clone()).collect();
                    match results {
                        Ok(results) => Box::new(results.into_iter().map(Ok)),
                        Err(err) => {
                            tracing::debug!(error = %err, "silent virtual-graph call failed");
                            single(Ok(input))
                        }
                    }
                } else {
                    self.service(name, inner, input)
                }
            }
            GraphPattern::Project { inner, variables } => {
                let keep: Vec<Variable> =
                    variables.iter().cloned().chain(input.iter().map(|(v, _)| v.clone())).collect();
                Box::new(self.eval(inner, graph, input).map(move |s| s.map(|s| s.project(&keep))))
            }
            GraphPattern::Distinct { inner } => {
                let mut seen = HashSet::new();
                Box::new(self.eval(inner, graph, input).filter(move |solution| match solution {
                    Ok(solution) => seen.insert(solution.clone()),
                    Err(_) => true,
                }))
            }
            GraphPattern::Slice { inner, start, length } => {
                let solutions = self.eval(inner, graph, input).skip(*start);
                match length {
                    Some(length) => Box::new(solutions.take(*length)),
                    None => Box::new(solutions),
                }
            }
        }
    }

    fn bgp(&self, patterns: &'a [TriplePattern], graph: &ActiveGraph, input: Solution) -> SolutionIter<'a> {
        let resolver = self.operator.resolver();
        let mut solutions = single(Ok(input));
        for pattern in patterns.iter().filter(|p| !resolver.is_property_pattern(p)) {
            let this = self.clone();
            let graph = graph.clone();
            solutions = bind(solutions, move |solution| this.triple(pattern, &graph, solution));
        }
        solutions
    }

    fn triple(&self, pattern: &'a TriplePattern, graph: &ActiveGraph, input: Solution) -> SolutionIter<'a> {
        let any_slot = &self.operator.vocabulary().any_slot;
        let subject = substitute(&pattern.subject, &input);
        let object = substitute(&pattern.object, &input);
        let (predicate, predicate_variable): (Option<NamedNode>, Option<&'a Variable>) =
            match &pattern.predicate {
                NamedNodePattern::NamedNode(p) if p == any_slot => (None, None),
                NamedNodePattern::NamedNode(p) => (Some(p.clone()), None),
                NamedNodePattern::Variable(v) => match input.get(v) {
                    Some(Term::NamedNode(p)) => (Some(p.clone()), None),
                    Some(_) => return nothing(),
                    None => (None, Some(v)),
                },
            };

        let triples = match self.dataset.triples(graph, subject.as_ref(), predicate.as_ref(), object.as_ref()) {
            Ok(triples) => triples,
            Err(err) => return single(Err(err)),
        };
        Box::new(triples.filter_map(move |triple| match triple {
            Ok(triple) => bind_triple(pattern, predicate_variable, &input, triple).map(Ok),
            Err(err) => Some(Err(err)),
        }))
    }

    fn join(
        &self,
        left: &'a GraphPattern,
        right: &'a GraphPattern,
        graph: &ActiveGraph,
        input: Solution,
    ) -> SolutionIter<'a> {
        let (first, second) = if self.defer(left, right, &input) { (right, left) } else { (left, right) };
        let this = self.clone();
        let graph_ = graph.clone();
        bind(self.eval(first, graph, input), move |solution| this.eval(second, &graph_, solution))
    }

    /// True when `left` is a virtual-graph call waiting on variables that
    /// only `right` binds.
    fn defer(&self, left: &GraphPattern, right: &GraphPattern, input: &Solution) -> bool {
        let required = self.operator.required_variables(left);
        if required.is_empty() {
            return false;
        }
        let provided = right.variables();
        let deferred = required.iter().any(|v| !input.contains(v) && provided.contains(v));
        if deferred {
            tracing::debug!(?required, "virtual-graph call deferred until its inputs are bound");
        }
        deferred
    }

    fn graph(&self, name: &'a NamedNodePattern, inner: &'a GraphPattern, input: Solution) -> SolutionIter<'a> {
        match name {
            NamedNodePattern::NamedNode(node) => self.eval(inner, &ActiveGraph::Named(node.clone()), input),
            NamedNodePattern::Variable(variable) => match input.get(variable) {
                Some(Term::NamedNode(node)) => {
                    let graph = ActiveGraph::Named(node.clone());
                    self.eval(inner, &graph, input)
                }
                Some(_) => nothing(),
                None => {
                    let names = match self.dataset.graph_names() {
                        Ok(names) => names,
                        Err(err) => return single(Err(err)),
                    };
                    let this = self.clone();
                    Box::new(names.into_iter().flat_map(move |node| {
                        let solution = input.clone().with(variable.clone(), node.clone());
                        this.eval(inner, &ActiveGraph::Named(node), solution)
                    }))
                }
            },
        }
    }

    /// Evaluate one virtual-graph call under `input`.
    fn service(&self, name: &'a NamedNodePattern, inner: &'a GraphPattern, input: Solution) -> SolutionIter<'a> {
        let operator = self.operator;
        let address = match operator.address(name, &input) {
            Ok(address) => address,
            Err(err) => return single(Err(err)),
        };
        let body = match operator.split_body(inner) {
            Ok(body) => Arc::new(body),
            Err(err) => return single(Err(err)),
        };

        let mut preamble = single(Ok(input));
        for part in body.preamble.iter().copied() {
            let this = self.clone();
            preamble = bind(preamble, move |solution| this.eval(part, &ActiveGraph::Default, solution));
        }

        bind(preamble, move |binding| {
            let options = match operator.resolve_options(&address, &body.assertions, &binding) {
                Ok(options) => options,
                Err(err) => return single(Err(err)),
            };
            let view = match operator.open(&options) {
                Ok(view) => view,
                Err(err) => return single(Err(err)),
            };
            if view.is_audit() {
                if let Err(err) = body.data.iter().try_for_each(|part| operator.check_audit_support(part)) {
                    return single(Err(err));
                }
            }
            Evaluator::new(operator, Arc::new(view)).data(Arc::clone(&body), binding)
        })
    }

    /// Match the data parts of a service body, moving nested calls behind
    /// the parts that bind their inputs.
    fn data(self, body: Arc<ServiceBody<'a>>, input: Solution) -> SolutionIter<'a> {
        let mut parts: Vec<&'a GraphPattern> = body.data.clone();
        let mut ordered = Vec::with_capacity(parts.len());
        let mut bound: Vec<Variable> = input.iter().map(|(v, _)| v.clone()).collect();
        while !parts.is_empty() {
            let ready = parts
                .iter()
                .position(|part| {
                    self.operator.required_variables(part).iter().all(|v| bound.contains(v))
                })
                .unwrap_or(0);
            let part = parts.remove(ready);
            bound.extend(part.variables());
            ordered.push(part);
        }

        let mut solutions = single(Ok(input));
        for part in ordered {
            let this = self.clone();
            solutions = bind(solutions, move |solution| this.eval(part, &ActiveGraph::Default, solution));
        }
        Box::new(solutions.filter(move |solution| match solution {
            Ok(solution) => body
                .filters
                .iter()
                .all(|filter| effective_boolean(filter, solution).unwrap_or(false)),
            Err(_) => true,
        }))
    }
}

fn bind_triple(
    pattern: &TriplePattern,
    predicate_variable: Option<&Variable>,
    input: &Solution,
    triple: Triple,
) -> Option<Solution> {
    let mut solution = input.clone();
    if let TermPattern::Variable(v) = &pattern.subject {
        if !bind_variable(&mut solution, v, triple.subject) {
            return None;
        }
    }
    if let Some(v) = predicate_variable {
        if !bind_variable(&mut solution, v, triple.predicate.into()) {
            return None;
        }
    }
    if let TermPattern::Variable(v) = &pattern.object {
        if !bind_variable(&mut solution, v, triple.object) {
            return None;
        }
    }
    Some(solution)
}
