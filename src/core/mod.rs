//! Core data structures shared by every component.

use oxigraph::model::{NamedNode, Term};
use oxigraph::sparql::Variable;
use std::fmt;

pub mod vocab;

/// A triple of a virtual graph.
///
/// The subject is a plain [`Term`] so that containers can be either blank
/// nodes or IRIs without another wrapper type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: NamedNode,
    pub object: Term,
}

impl Triple {
    pub fn new(
        subject: impl Into<Term>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self { subject: subject.into(), predicate: predicate.into(), object: object.into() }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A triple tagged with the per-call graph it was emitted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub graph: NamedNode,
    pub triple: Triple,
}

impl Quad {
    pub fn new(graph: NamedNode, triple: Triple) -> Self {
        Self { graph, triple }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} .",
            self.triple.subject, self.triple.predicate, self.triple.object, self.graph
        )
    }
}

/// One row of variable bindings.
///
/// Bindings are kept sorted by variable name, so two solutions binding the
/// same values compare and hash equal regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Solution {
    bindings: Vec<(Variable, Term)>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, variable: &str) -> std::result::Result<usize, usize> {
        self.bindings.binary_search_by(|(v, _)| v.as_str().cmp(variable))
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.get_by_name(variable.as_str())
    }

    pub fn get_by_name(&self, variable: &str) -> Option<&Term> {
        self.position(variable).ok().map(|i| &self.bindings[i].1)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.position(variable.as_str()).is_ok()
    }

    /// Bind `variable`, returning the value it previously had.
    pub fn insert(&mut self, variable: Variable, term: Term) -> Option<Term> {
        match self.position(variable.as_str()) {
            Ok(i) => Some(std::mem::replace(&mut self.bindings[i].1, term)),
            Err(i) => {
                self.bindings.insert(i, (variable, term));
                None
            }
        }
    }

    pub fn with(mut self, variable: Variable, term: impl Into<Term>) -> Self {
        self.insert(variable, term.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter().map(|(v, t)| (v, t))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Keep only the given variables.
    pub fn project(&self, variables: &[Variable]) -> Solution {
        Solution {
            bindings: self
                .bindings
                .iter()
                .filter(|(v, _)| variables.contains(v))
                .cloned()
                .collect(),
        }
    }

    /// Merge two solutions, `None` when they disagree on a shared variable.
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        let mut merged = self.clone();
        for (variable, term) in &other.bindings {
            match merged.get(variable) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    merged.insert(variable.clone(), term.clone());
                }
            }
        }
        Some(merged)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (variable, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{variable} = {term}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::Literal;

    #[test]
    fn test_solution_order_independent_equality() {
        let a = Variable::new_unchecked("a");
        let b = Variable::new_unchecked("b");
        let first = Solution::new()
            .with(a.clone(), Literal::new_simple_literal("1"))
            .with(b.clone(), Literal::new_simple_literal("2"));
        let second = Solution::new()
            .with(b, Literal::new_simple_literal("2"))
            .with(a, Literal::new_simple_literal("1"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_conflict() {
        let x = Variable::new_unchecked("x");
        let left = Solution::new().with(x.clone(), Literal::new_simple_literal("1"));
        let same = Solution::new().with(x.clone(), Literal::new_simple_literal("1"));
        let other = Solution::new().with(x, Literal::new_simple_literal("2"));
        assert!(left.merge(&same).is_some());
        assert!(left.merge(&other).is_none());
    }
}
