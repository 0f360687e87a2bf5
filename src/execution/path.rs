//! Property path evaluation.
//!
//! `Predicate`, `Inverse`, `Sequence` and `Alternative` keep duplicates;
//! the closure operators return each reachable node once. The wildcard
//! predicate steps over every predicate of a node.

use crate::algebra::PropertyPath;
use crate::error::Result;
use crate::execution::dataset::{ActiveGraph, Dataset};
use oxigraph::model::{NamedNode, Term};
use std::collections::HashSet;

pub struct PathEvaluator<'d> {
    dataset: &'d dyn Dataset,
    graph: &'d ActiveGraph,
    any_slot: &'d NamedNode,
}

impl<'d> PathEvaluator<'d> {
    pub fn new(dataset: &'d dyn Dataset, graph: &'d ActiveGraph, any_slot: &'d NamedNode) -> Self {
        Self { dataset, graph, any_slot }
    }

    /// All `(start, end)` pairs connected by `path`, restricted to the
    /// given endpoints.
    pub fn pairs(
        &self,
        path: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> Result<Vec<(Term, Term)>> {
        match (subject, object) {
            (Some(start), _) => Ok(self
                .step(path, start, true)?
                .into_iter()
                .filter(|end| object.map_or(true, |o| o == end))
                .map(|end| (start.clone(), end))
                .collect()),
            (None, Some(end)) => Ok(self
                .step(path, end, false)?
                .into_iter()
                .map(|start| (start, end.clone()))
                .collect()),
            (None, None) => {
                let mut pairs = Vec::new();
                for start in self.nodes()? {
                    for end in self.step(path, &start, true)? {
                        pairs.push((start.clone(), end));
                    }
                }
                Ok(pairs)
            }
        }
    }

    /// Nodes reached from `node` in one application of `path`, walking
    /// edges backwards when `forward` is false.
    fn step(&self, path: &PropertyPath, node: &Term, forward: bool) -> Result<Vec<Term>> {
        match path {
            PropertyPath::Predicate(predicate) => {
                let predicate = (predicate != self.any_slot).then_some(predicate);
                let (subject, object) = if forward { (Some(node), None) } else { (None, Some(node)) };
                self.dataset
                    .triples(self.graph, subject, predicate, object)?
                    .map(|t| t.map(|t| if forward { t.object } else { t.subject }))
                    .collect()
            }
            PropertyPath::Inverse(inner) => self.step(inner, node, !forward),
            PropertyPath::Sequence(first, second) => {
                let (first, second) = if forward { (first, second) } else { (second, first) };
                let mut reached = Vec::new();
                for middle in self.step(first, node, forward)? {
                    reached.extend(self.step(second, &middle, forward)?);
                }
                Ok(reached)
            }
            PropertyPath::Alternative(left, right) => {
                let mut reached = self.step(left, node, forward)?;
                reached.extend(self.step(right, node, forward)?);
                Ok(reached)
            }
            PropertyPath::ZeroOrOne(inner) => {
                let mut reached = vec![node.clone()];
                for next in self.step(inner, node, forward)? {
                    if !reached.contains(&next) {
                        reached.push(next);
                    }
                }
                Ok(reached)
            }
            PropertyPath::ZeroOrMore(inner) => self.closure(inner, node, forward, true),
            PropertyPath::OneOrMore(inner) => self.closure(inner, node, forward, false),
        }
    }

    fn closure(&self, path: &PropertyPath, node: &Term, forward: bool, reflexive: bool) -> Result<Vec<Term>> {
        let mut seen = HashSet::new();
        let mut reached = Vec::new();
        if reflexive {
            seen.insert(node.clone());
            reached.push(node.clone());
        }
        let mut frontier = vec![node.clone()];
        while let Some(current) = frontier.pop() {
            for next in self.step(path, &current, forward)? {
                if seen.insert(next.clone()) {
                    reached.push(next.clone());
                    frontier.push(next);
                }
            }
        }
        Ok(reached)
    }

    /// Every subject and object of the active graph, in first-seen order.
    fn nodes(&self) -> Result<Vec<Term>> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        for triple in self.dataset.triples(self.graph, None, None, None)? {
            let triple = triple?;
            for term in [triple.subject, triple.object] {
                if seen.insert(term.clone()) {
                    nodes.push(term);
                }
            }
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Triple;
    use crate::execution::dataset::LocalDataset;
    use oxigraph::model::Literal;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{s}"))
    }

    fn dataset() -> LocalDataset {
        LocalDataset::new(vec![
            Triple::new(iri("root"), iri("a"), iri("child")),
            Triple::new(iri("root"), iri("b"), Literal::new_simple_literal("x")),
            Triple::new(iri("child"), iri("a"), Literal::new_simple_literal("y")),
            Triple::new(iri("child"), iri("b"), Literal::new_simple_literal("z")),
        ])
    }

    #[test]
    fn test_wildcard_sequence_reaches_grandchildren() {
        let data = dataset();
        let any = iri("any");
        let evaluator = PathEvaluator::new(&data, &ActiveGraph::Default, &any);
        let path = PropertyPath::from(any.clone()).sequence(any.clone().into());
        let root: Term = iri("root").into();
        let mut ends: Vec<_> = evaluator.pairs(&path, Some(&root), None).unwrap().into_iter().map(|(_, e)| e).collect();
        ends.sort_by_key(|t| t.to_string());
        assert_eq!(ends, vec![Term::from(Literal::new_simple_literal("y")), Literal::new_simple_literal("z").into()]);
    }

    #[test]
    fn test_inverse_and_closure() {
        let data = dataset();
        let any = iri("any");
        let evaluator = PathEvaluator::new(&data, &ActiveGraph::Default, &any);
        let y: Term = Literal::new_simple_literal("y").into();
        let starts: Vec<_> = evaluator
            .pairs(&PropertyPath::from(iri("a")).one_or_more(), None, Some(&y))
            .unwrap()
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(starts, vec![Term::from(iri("child")), iri("root").into()]);
    }

    #[test]
    fn test_zero_or_more_is_reflexive() {
        let data = dataset();
        let any = iri("any");
        let evaluator = PathEvaluator::new(&data, &ActiveGraph::Default, &any);
        let root: Term = iri("root").into();
        let ends = evaluator.pairs(&PropertyPath::from(iri("a")).zero_or_more(), Some(&root), None).unwrap();
        assert_eq!(ends.len(), 3);
        assert_eq!(ends[0].1, root);
    }
}
