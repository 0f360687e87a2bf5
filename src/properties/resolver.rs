//! Merging inline address parameters and explicit property triples.

use crate::algebra::{NamedNodePattern, TermPattern, TriplePattern};
use crate::core::vocab::Vocabulary;
use crate::core::Solution;
use crate::error::{FacadeError, Result};
use crate::properties::{keys, AddressParser, OptionSet};
use oxigraph::model::Term;
use oxigraph::sparql::Variable;
use std::sync::Arc;

/// One `(fx:properties, key, value)` assertion of a service body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAssertion {
    pub key: String,
    pub value: TermPattern,
}

/// Outcome of resolving a call's options against one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(OptionSet),
    /// Options bound to variables the binding does not cover yet, as
    /// `(key, variable)` pairs
    Pending(Vec<(String, Variable)>),
}

impl Resolution {
    /// The error to report when no later binding will supply the pending
    /// variables.
    pub fn into_options(self) -> Result<OptionSet> {
        match self {
            Resolution::Resolved(options) => Ok(options),
            Resolution::Pending(mut pending) => {
                let index = pending
                    .iter()
                    .position(|(key, _)| key == keys::LOCATION || key == keys::CONTENT)
                    .unwrap_or(0);
                let (key, variable) = pending.swap_remove(index);
                Err(FacadeError::MissingRequiredOption { key, variable: Some(variable) })
            }
        }
    }
}

/// Builds the option set of a call.
///
/// # Merge rule
///
/// 1. Inline address parameters are applied first, in textual order.
/// 2. Property assertions are layered on top, in textual order, so an
///    assertion overrides an inline parameter and a later assertion for the
///    same key overrides an earlier one.
/// 3. A variable value is looked up in the current binding. Constants and
///    bound variables resolve to the same string, so the resulting option
///    set does not depend on how a value reached the call.
pub struct PropertyResolver {
    vocabulary: Arc<Vocabulary>,
    parser: AddressParser,
}

impl PropertyResolver {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Result<Self> {
        Ok(Self { vocabulary, parser: AddressParser::new()? })
    }

    pub fn parser(&self) -> &AddressParser {
        &self.parser
    }

    /// True for triple patterns whose subject is the reserved `fx:properties`.
    pub fn is_property_pattern(&self, pattern: &TriplePattern) -> bool {
        matches!(&pattern.subject, TermPattern::Term(Term::NamedNode(n)) if *n == self.vocabulary.properties)
    }

    /// Turn property triple patterns into assertions.
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::UnsupportedOperation` for a variable key.
    pub fn assertions<'a>(
        &self,
        patterns: impl IntoIterator<Item = &'a TriplePattern>,
    ) -> Result<Vec<PropertyAssertion>> {
        patterns
            .into_iter()
            .filter(|p| self.is_property_pattern(p))
            .map(|pattern| match &pattern.predicate {
                NamedNodePattern::NamedNode(predicate) => Ok(PropertyAssertion {
                    key: self.vocabulary.option_key(predicate).to_string(),
                    value: pattern.object.clone(),
                }),
                NamedNodePattern::Variable(v) => Err(FacadeError::UnsupportedOperation(format!(
                    "property key bound to variable {v}"
                ))),
            })
            .collect()
    }

    /// Resolve the options of a call for one binding.
    ///
    /// # Arguments
    ///
    /// * `address` - The service address IRI
    /// * `assertions` - Property assertions of the service body, in textual order
    /// * `binding` - The binding the call is evaluated under
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::InvalidAddress` for a malformed address,
    /// `FacadeError::InvalidOption` for a blank node value and
    /// `FacadeError::MissingRequiredOption` when neither a location nor
    /// inline content is given.
    pub fn resolve(
        &self,
        address: &str,
        assertions: &[PropertyAssertion],
        binding: &Solution,
    ) -> Result<Resolution> {
        let mut options = self.parser.parse(address)?.to_options();
        let mut pending = Vec::new();

        for assertion in assertions {
            let term = match &assertion.value {
                TermPattern::Term(term) => term,
                TermPattern::Variable(variable) => match binding.get(variable) {
                    Some(term) => term,
                    None => {
                        pending.push((assertion.key.clone(), variable.clone()));
                        continue;
                    }
                },
            };
            options.insert(assertion.key.clone(), option_value(&assertion.key, term)?);
        }

        if !pending.is_empty() {
            return Ok(Resolution::Pending(pending));
        }
        if options.location().is_none() && options.content().is_none() {
            return Err(FacadeError::missing_option(keys::LOCATION));
        }
        Ok(Resolution::Resolved(options))
    }
}

fn option_value(key: &str, term: &Term) -> Result<String> {
    match term {
        Term::Literal(literal) => Ok(literal.value().to_string()),
        Term::NamedNode(node) => Ok(node.as_str().to_string()),
        _ => Err(FacadeError::InvalidOption {
            key: key.to_string(),
            reason: format!("{term} is neither a literal nor an IRI"),
        }),
    }
}
