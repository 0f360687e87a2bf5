//! Query algebra consumed by the engine.
//!
//! This is the interface between a SPARQL front end and the virtual-graph
//! layer: the front end lowers a parsed query into [`GraphPattern`] trees,
//! the engine evaluates them. Only the operators that matter for evaluating
//! virtual graphs are represented.

use oxigraph::model::{BlankNode, Literal, NamedNode, Term};
use oxigraph::sparql::Variable;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermPattern {
    Variable(Variable),
    Term(Term),
}

impl TermPattern {
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            TermPattern::Variable(v) => Some(v),
            TermPattern::Term(_) => None,
        }
    }
}

impl From<Variable> for TermPattern {
    fn from(variable: Variable) -> Self {
        TermPattern::Variable(variable)
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        TermPattern::Term(term)
    }
}

impl From<NamedNode> for TermPattern {
    fn from(node: NamedNode) -> Self {
        TermPattern::Term(node.into())
    }
}

impl From<BlankNode> for TermPattern {
    fn from(node: BlankNode) -> Self {
        TermPattern::Term(node.into())
    }
}

impl From<Literal> for TermPattern {
    fn from(literal: Literal) -> Self {
        TermPattern::Term(literal.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamedNodePattern {
    Variable(Variable),
    NamedNode(NamedNode),
}

impl From<Variable> for NamedNodePattern {
    fn from(variable: Variable) -> Self {
        NamedNodePattern::Variable(variable)
    }
}

impl From<NamedNode> for NamedNodePattern {
    fn from(node: NamedNode) -> Self {
        NamedNodePattern::NamedNode(node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: NamedNodePattern,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<NamedNodePattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self { subject: subject.into(), predicate: predicate.into(), object: object.into() }
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        let predicate = match &self.predicate {
            NamedNodePattern::Variable(v) => Some(v),
            NamedNodePattern::NamedNode(_) => None,
        };
        self.subject.as_variable().into_iter().chain(predicate).chain(self.object.as_variable())
    }
}

/// Property path expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(Box<PropertyPath>),
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
}

impl PropertyPath {
    pub fn sequence(self, next: PropertyPath) -> Self {
        PropertyPath::Sequence(Box::new(self), Box::new(next))
    }

    pub fn alternative(self, other: PropertyPath) -> Self {
        PropertyPath::Alternative(Box::new(self), Box::new(other))
    }

    pub fn inverse(self) -> Self {
        PropertyPath::Inverse(Box::new(self))
    }

    pub fn zero_or_one(self) -> Self {
        PropertyPath::ZeroOrOne(Box::new(self))
    }

    pub fn zero_or_more(self) -> Self {
        PropertyPath::ZeroOrMore(Box::new(self))
    }

    pub fn one_or_more(self) -> Self {
        PropertyPath::OneOrMore(Box::new(self))
    }
}

impl From<NamedNode> for PropertyPath {
    fn from(predicate: NamedNode) -> Self {
        PropertyPath::Predicate(predicate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Variable(Variable),
    Constant(Term),
    Bound(Variable),
    Equal(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Str(Box<Expression>),
    Iri(Box<Expression>),
    Concat(Vec<Expression>),
    /// `REGEX(expr, pattern)`
    Regex(Box<Expression>, String),
    StrStarts(Box<Expression>, Box<Expression>),
    StrEnds(Box<Expression>, Box<Expression>),
    IsIri(Box<Expression>),
    IsBlank(Box<Expression>),
    IsLiteral(Box<Expression>),
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::Variable(variable)
    }
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Constant(literal.into())
    }
}

impl From<NamedNode> for Expression {
    fn from(node: NamedNode) -> Self {
        Expression::Constant(node.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphPattern {
    Bgp(Vec<TriplePattern>),
    Path { subject: TermPattern, path: PropertyPath, object: TermPattern },
    Join { left: Box<GraphPattern>, right: Box<GraphPattern> },
    LeftJoin { left: Box<GraphPattern>, right: Box<GraphPattern> },
    Union { left: Box<GraphPattern>, right: Box<GraphPattern> },
    Filter { expression: Expression, inner: Box<GraphPattern> },
    Extend { inner: Box<GraphPattern>, variable: Variable, expression: Expression },
    Values { variables: Vec<Variable>, bindings: Vec<Vec<Option<Term>>> },
    Graph { name: NamedNodePattern, inner: Box<GraphPattern> },
    Service { name: NamedNodePattern, inner: Box<GraphPattern>, silent: bool },
    Project { inner: Box<GraphPattern>, variables: Vec<Variable> },
    Distinct { inner: Box<GraphPattern> },
    Slice { inner: Box<GraphPattern>, start: usize, length: Option<usize> },
}

impl GraphPattern {
    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        GraphPattern::Bgp(patterns)
    }

    /// The pattern matching exactly one empty solution.
    pub fn empty() -> Self {
        GraphPattern::Bgp(Vec::new())
    }

    pub fn path(
        subject: impl Into<TermPattern>,
        path: PropertyPath,
        object: impl Into<TermPattern>,
    ) -> Self {
        GraphPattern::Path { subject: subject.into(), path, object: object.into() }
    }

    pub fn join(left: GraphPattern, right: GraphPattern) -> Self {
        GraphPattern::Join { left: Box::new(left), right: Box::new(right) }
    }

    /// Left-deep join of several patterns.
    pub fn join_all(patterns: impl IntoIterator<Item = GraphPattern>) -> Self {
        patterns
            .into_iter()
            .reduce(GraphPattern::join)
            .unwrap_or_else(GraphPattern::empty)
    }

    pub fn left_join(left: GraphPattern, right: GraphPattern) -> Self {
        GraphPattern::LeftJoin { left: Box::new(left), right: Box::new(right) }
    }

    pub fn union(left: GraphPattern, right: GraphPattern) -> Self {
        GraphPattern::Union { left: Box::new(left), right: Box::new(right) }
    }

    pub fn filter(expression: Expression, inner: GraphPattern) -> Self {
        GraphPattern::Filter { expression, inner: Box::new(inner) }
    }

    pub fn extend(inner: GraphPattern, variable: Variable, expression: Expression) -> Self {
        GraphPattern::Extend { inner: Box::new(inner), variable, expression }
    }

    pub fn values(variables: Vec<Variable>, bindings: Vec<Vec<Option<Term>>>) -> Self {
        GraphPattern::Values { variables, bindings }
    }

    pub fn graph(name: impl Into<NamedNodePattern>, inner: GraphPattern) -> Self {
        GraphPattern::Graph { name: name.into(), inner: Box::new(inner) }
    }

    pub fn service(name: impl Into<NamedNodePattern>, inner: GraphPattern) -> Self {
        GraphPattern::Service { name: name.into(), inner: Box::new(inner), silent: false }
    }

    pub fn silent_service(name: impl Into<NamedNodePattern>, inner: GraphPattern) -> Self {
        GraphPattern::Service { name: name.into(), inner: Box::new(inner), silent: true }
    }

    pub fn project(inner: GraphPattern, variables: Vec<Variable>) -> Self {
        GraphPattern::Project { inner: Box::new(inner), variables }
    }

    pub fn distinct(inner: GraphPattern) -> Self {
        GraphPattern::Distinct { inner: Box::new(inner) }
    }

    pub fn slice(inner: GraphPattern, start: usize, length: Option<usize>) -> Self {
        GraphPattern::Slice { inner: Box::new(inner), start, length }
    }

    /// Variables the pattern may bind.
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        let mut add = |v: &Variable| {
            if !out.contains(v) {
                out.push(v.clone());
            }
        };
        match self {
            GraphPattern::Bgp(patterns) => patterns.iter().flat_map(|p| p.variables()).for_each(add),
            GraphPattern::Path { subject, object, .. } => {
                subject.as_variable().into_iter().chain(object.as_variable()).for_each(add)
            }
            GraphPattern::Values { variables, .. } | GraphPattern::Project { variables, .. } => {
                variables.iter().for_each(add)
            }
            GraphPattern::Extend { inner, variable, .. } => {
                add(variable);
                inner.collect_variables(out);
            }
            GraphPattern::Graph { name, inner } => {
                if let NamedNodePattern::Variable(v) = name {
                    add(v);
                }
                inner.collect_variables(out);
            }
            GraphPattern::Join { left, right }
            | GraphPattern::LeftJoin { left, right }
            | GraphPattern::Union { left, right } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            GraphPattern::Filter { inner, .. }
            | GraphPattern::Service { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Slice { inner, .. } => inner.collect_variables(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[test]
    fn test_variables_are_collected_once() {
        let p = NamedNode::new_unchecked("http://example.org/p");
        let pattern = GraphPattern::join(
            GraphPattern::bgp(vec![
                TriplePattern::new(var("s"), p.clone(), var("o")),
                TriplePattern::new(var("o"), var("q"), var("s")),
            ]),
            GraphPattern::values(vec![var("x")], vec![vec![None]]),
        );
        assert_eq!(pattern.variables(), vec![var("s"), var("o"), var("q"), var("x")]);
    }

    #[test]
    fn test_join_all_of_nothing_is_empty() {
        assert_eq!(GraphPattern::join_all(Vec::new()), GraphPattern::empty());
    }
}
