//! Expression evaluation for `FILTER` and `BIND`.
//!
//! An evaluation error (unbound variable, type error) is `None`, which a
//! filter treats as false.

use crate::algebra::Expression;
use crate::core::Solution;
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, NamedNode, Term};
use regex::Regex;

pub fn evaluate(expression: &Expression, solution: &Solution) -> Option<Term> {
    match expression {
        Expression::Variable(v) => solution.get(v).cloned(),
        Expression::Constant(term) => Some(term.clone()),
        Expression::Bound(v) => Some(boolean(solution.contains(v))),
        Expression::Equal(a, b) => Some(boolean(evaluate(a, solution)? == evaluate(b, solution)?)),
        Expression::Not(inner) => Some(boolean(!effective_boolean(inner, solution)?)),
        Expression::And(a, b) => {
            match (effective_boolean(a, solution), effective_boolean(b, solution)) {
                (Some(false), _) | (_, Some(false)) => Some(boolean(false)),
                (Some(true), Some(true)) => Some(boolean(true)),
                _ => None,
            }
        }
        Expression::Or(a, b) => {
            match (effective_boolean(a, solution), effective_boolean(b, solution)) {
                (Some(true), _) | (_, Some(true)) => Some(boolean(true)),
                (Some(false), Some(false)) => Some(boolean(false)),
                _ => None,
            }
        }
        Expression::Str(inner) => {
            Some(Literal::new_simple_literal(lexical(&evaluate(inner, solution)?)?).into())
        }
        Expression::Iri(inner) => match evaluate(inner, solution)? {
            Term::NamedNode(node) => Some(node.into()),
            Term::Literal(literal) => NamedNode::new(literal.value()).ok().map(Into::into),
            _ => None,
        },
        Expression::Concat(parts) => {
            let mut value = String::new();
            for part in parts {
                value.push_str(&string_value(&evaluate(part, solution)?)?);
            }
            Some(Literal::new_simple_literal(value).into())
        }
        Expression::Regex(inner, pattern) => {
            let text = string_value(&evaluate(inner, solution)?)?;
            let regex = Regex::new(pattern).ok()?;
            Some(boolean(regex.is_match(&text)))
        }
        Expression::StrStarts(a, b) => {
            let (text, prefix) = (string_value(&evaluate(a, solution)?)?, string_value(&evaluate(b, solution)?)?);
            Some(boolean(text.starts_with(&prefix)))
        }
        Expression::StrEnds(a, b) => {
            let (text, suffix) = (string_value(&evaluate(a, solution)?)?, string_value(&evaluate(b, solution)?)?);
            Some(boolean(text.ends_with(&suffix)))
        }
        Expression::IsIri(inner) => Some(boolean(matches!(evaluate(inner, solution)?, Term::NamedNode(_)))),
        Expression::IsBlank(inner) => Some(boolean(matches!(evaluate(inner, solution)?, Term::BlankNode(_)))),
        Expression::IsLiteral(inner) => Some(boolean(matches!(evaluate(inner, solution)?, Term::Literal(_)))),
    }
}

/// Effective boolean value, `None` for terms that have none.
pub fn effective_boolean(expression: &Expression, solution: &Solution) -> Option<bool> {
    let Term::Literal(literal) = evaluate(expression, solution)? else {
        return None;
    };
    let value = literal.value();
    let datatype = literal.datatype();
    if datatype == xsd::BOOLEAN {
        Some(value == "true" || value == "1")
    } else if datatype == xsd::STRING {
        Some(!value.is_empty())
    } else if datatype == xsd::INTEGER || datatype == xsd::DECIMAL || datatype == xsd::DOUBLE {
        value.parse::<f64>().ok().map(|n| n != 0.0 && !n.is_nan())
    } else {
        None
    }
}

fn boolean(value: bool) -> Term {
    Literal::new_typed_literal(if value { "true" } else { "false" }, xsd::BOOLEAN).into()
}

fn lexical(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode(node) => Some(node.as_str().to_string()),
        Term::Literal(literal) => Some(literal.value().to_string()),
        _ => None,
    }
}

fn string_value(term: &Term) -> Option<String> {
    match term {
        Term::Literal(literal) => Some(literal.value().to_string()),
        _ => None,
    }
}
