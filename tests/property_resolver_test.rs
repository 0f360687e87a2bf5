use facadex::algebra::{TermPattern, TriplePattern};
use facadex::core::vocab::{Vocabulary, FX_NAMESPACE};
use facadex::core::Solution;
use facadex::properties::{PropertyAssertion, PropertyResolver, Resolution};
use facadex::{FacadeError, OptionSet};
use oxigraph::model::{BlankNode, Literal, NamedNode};
use oxigraph::sparql::Variable;
use std::sync::Arc;

fn resolver() -> PropertyResolver {
    PropertyResolver::new(Arc::new(Vocabulary::new())).unwrap()
}

fn fx(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{FX_NAMESPACE}{local}"))
}

fn property(key: &str, value: impl Into<TermPattern>) -> TriplePattern {
    TriplePattern::new(fx("properties"), fx(key), value)
}

fn resolved(resolution: Resolution) -> OptionSet {
    match resolution {
        Resolution::Resolved(options) => options,
        Resolution::Pending(pending) => panic!("unexpected pending options {pending:?}"),
    }
}

fn resolve(address: &str, patterns: &[TriplePattern], binding: &Solution) -> OptionSet {
    let resolver = resolver();
    let assertions = resolver.assertions(patterns).unwrap();
    resolved(resolver.resolve(address, &assertions, binding).unwrap())
}

#[test]
fn test_inline_and_explicit_options_are_equivalent() {
    let inline = resolve("x-sparql-anything:location=a.csv,csv.headers=true", &[], &Solution::new());
    let explicit = resolve(
        "x-sparql-anything:",
        &[
            property("location", Literal::new_simple_literal("a.csv")),
            property("csv.headers", Literal::new_simple_literal("true")),
        ],
        &Solution::new(),
    );
    let mixed = resolve(
        "x-sparql-anything:csv.headers=true",
        &[property("location", Literal::new_simple_literal("a.csv"))],
        &Solution::new(),
    );
    assert_eq!(inline, explicit);
    assert_eq!(inline, mixed);
}

#[test]
fn test_order_of_independent_assertions_does_not_matter() {
    let location = property("location", Literal::new_simple_literal("a.csv"));
    let delimiter = property("csv.delimiter", Literal::new_simple_literal(";"));
    let headers = property("csv.headers", Literal::new_simple_literal("false"));

    let forward = resolve("x-sparql-anything:", &[location.clone(), delimiter.clone(), headers.clone()], &Solution::new());
    let backward = resolve("x-sparql-anything:", &[headers, delimiter, location], &Solution::new());
    assert_eq!(forward, backward);
}

#[test]
fn test_bound_variable_equals_constant() {
    let file = Variable::new_unchecked("file");
    let binding = Solution::new().with(file.clone(), Literal::new_simple_literal("a.csv"));
    let by_variable = resolve("x-sparql-anything:", &[property("location", file)], &binding);
    let by_constant =
        resolve("x-sparql-anything:", &[property("location", Literal::new_simple_literal("a.csv"))], &Solution::new());
    assert_eq!(by_variable, by_constant);
}

#[test]
fn test_iri_values_resolve_to_their_string() {
    let options = resolve(
        "x-sparql-anything:",
        &[property("location", NamedNode::new_unchecked("http://example.org/a.json"))],
        &Solution::new(),
    );
    assert_eq!(options.location(), Some("http://example.org/a.json"));
}

#[test]
fn test_assertion_overrides_inline_parameter() {
    let options = resolve(
        "x-sparql-anything:location=a.csv,csv.headers=false",
        &[
            property("csv.headers", Literal::new_simple_literal("true")),
            property("csv.headers", Literal::new_simple_literal("false")),
            property("csv.headers", Literal::new_simple_literal("true")),
        ],
        &Solution::new(),
    );
    assert_eq!(options.get("csv.headers"), Some("true"));
    assert_eq!(options.location(), Some("a.csv"));
}

#[test]
fn test_non_fx_predicates_keep_the_full_iri() {
    let resolver = resolver();
    let pattern = TriplePattern::new(
        fx("properties"),
        NamedNode::new_unchecked("http://example.org/opt"),
        Literal::new_simple_literal("1"),
    );
    let assertions = resolver.assertions(&[pattern]).unwrap();
    assert_eq!(
        assertions,
        vec![PropertyAssertion {
            key: "http://example.org/opt".to_string(),
            value: Literal::new_simple_literal("1").into(),
        }]
    );
}

#[test]
fn test_unbound_variable_is_pending() {
    let resolver = resolver();
    let file = Variable::new_unchecked("file");
    let assertions = resolver.assertions(&[property("location", file.clone())]).unwrap();
    let resolution = resolver.resolve("x-sparql-anything:", &assertions, &Solution::new()).unwrap();
    assert_eq!(resolution, Resolution::Pending(vec![("location".to_string(), file.clone())]));

    let err = resolution.into_options().unwrap_err();
    assert_eq!(err, FacadeError::MissingRequiredOption { key: "location".to_string(), variable: Some(file) });
    assert!(err.is_recoverable());
}

#[test]
fn test_missing_location_is_fatal() {
    let resolver = resolver();
    let err = resolver.resolve("x-sparql-anything:csv.headers=true", &[], &Solution::new()).unwrap_err();
    assert_eq!(err, FacadeError::missing_option("location"));
    assert!(!err.is_recoverable());
}

#[test]
fn test_content_replaces_location() {
    let options = resolve(
        "x-sparql-anything:",
        &[property("content", Literal::new_simple_literal("a,b"))],
        &Solution::new(),
    );
    assert_eq!(options.content(), Some("a,b"));
}

#[test]
fn test_invalid_values_and_keys() {
    let resolver = resolver();
    let assertions = resolver.assertions(&[property("location", BlankNode::new_unchecked("b0"))]).unwrap();
    assert!(matches!(
        resolver.resolve("x-sparql-anything:", &assertions, &Solution::new()),
        Err(FacadeError::InvalidOption { .. })
    ));

    let variable_key = TriplePattern::new(fx("properties"), Variable::new_unchecked("k"), Literal::new_simple_literal("v"));
    assert!(matches!(resolver.assertions(&[variable_key]), Err(FacadeError::UnsupportedOperation(_))));
}
