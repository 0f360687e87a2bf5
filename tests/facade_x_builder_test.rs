use facadex::core::vocab::{Vocabulary, RDF_NAMESPACE};
use facadex::core::Quad;
use facadex::facade_x::{BuilderError, FacadeXGraphBuilder, GraphShape, SinkGraphBuilder, Slot};
use oxigraph::model::{Literal, NamedNode, Term};
use std::sync::Arc;

const CALL: &str = "urn:facade-x:graph:test";

fn builder(shape: GraphShape) -> SinkGraphBuilder<Vec<Quad>> {
    SinkGraphBuilder::new(shape, Arc::new(Vocabulary::new()), Vec::new())
}

fn literal(value: &str) -> Term {
    Literal::new_simple_literal(value).into()
}

#[test]
fn test_root_is_typed_once_per_call() {
    let mut builder = builder(GraphShape::default());
    builder.add_root(CALL, "root").unwrap();
    builder.add_root(CALL, "root").unwrap();
    builder.add_root("urn:other", "root").unwrap();

    let quads = builder.into_sink();
    assert_eq!(quads.len(), 2);
    let vocabulary = Vocabulary::new();
    assert!(quads.iter().all(|q| q.triple.predicate == vocabulary.rdf_type));
    assert!(quads.iter().all(|q| q.triple.object == Term::from(vocabulary.root.clone())));
    assert_eq!(quads[0].graph.as_str(), CALL);
    assert_eq!(quads[1].graph.as_str(), "urn:other");
    // Same container id in two calls is two different nodes
    assert_ne!(quads[0].triple.subject, quads[1].triple.subject);
}

#[test]
fn test_blank_node_labels_are_stable() {
    let emit = || {
        let mut builder = builder(GraphShape::default());
        builder.add_root(CALL, "root").unwrap();
        builder.add_container(CALL, "root", Slot::Index(1), "row1").unwrap();
        builder.into_sink()
    };
    let first = emit();
    let second = emit();
    assert_eq!(first, second);
    assert!(matches!(first[1].triple.subject, Term::BlankNode(_)));
    assert!(matches!(first[1].triple.object, Term::BlankNode(_)));
}

#[test]
fn test_ordinal_and_named_slots() {
    let mut builder = builder(GraphShape::default());
    builder.add_root(CALL, "root").unwrap();
    builder.add_value(CALL, "root", Slot::Index(1), literal("a")).unwrap();
    builder.add_value(CALL, "root", Slot::Index(2), literal("b")).unwrap();
    builder.add_value(CALL, "root", Slot::from("first name"), literal("Ada")).unwrap();
    assert_eq!(builder.triple_count(), 4);

    let predicates: Vec<String> =
        builder.into_sink().iter().skip(1).map(|q| q.triple.predicate.as_str().to_string()).collect();
    assert_eq!(
        predicates,
        vec![
            format!("{RDF_NAMESPACE}_1"),
            format!("{RDF_NAMESPACE}_2"),
            "http://sparql.xyz/facade-x/data/first%20name".to_string(),
        ]
    );
}

#[test]
fn test_repeated_predicates_are_kept() {
    let mut builder = builder(GraphShape::default());
    builder.add_root(CALL, "root").unwrap();
    builder.add_value(CALL, "root", Slot::from("tag"), literal("x")).unwrap();
    builder.add_value(CALL, "root", Slot::from("tag"), literal("x")).unwrap();
    assert_eq!(builder.into_sink().len(), 3);
}

#[test]
fn test_iri_containers_and_custom_namespace() {
    let shape = GraphShape {
        namespace: "http://example.org/ns#".to_string(),
        blank_nodes: false,
        ..GraphShape::default()
    };
    let mut builder = builder(shape);
    builder.add_root(CALL, "http://example.org/doc#").unwrap();
    builder
        .add_container(CALL, "http://example.org/doc#", Slot::Index(1), "http://example.org/doc#row1")
        .unwrap();
    builder.add_type(CALL, "http://example.org/doc#row1", "Row").unwrap();

    let quads = builder.into_sink();
    assert_eq!(quads[1].triple.subject, Term::from(NamedNode::new_unchecked("http://example.org/doc#")));
    assert_eq!(
        quads[2].triple.object,
        Term::from(NamedNode::new_unchecked("http://example.org/ns#Row"))
    );
}

#[test]
fn test_explicit_root_is_an_iri_even_with_blank_nodes() {
    let shape = GraphShape { root: Some("http://example.org/root".to_string()), ..GraphShape::default() };
    let mut builder = builder(shape);
    builder.add_root(CALL, "http://example.org/root").unwrap();
    builder.add_container(CALL, "http://example.org/root", Slot::Index(1), "child").unwrap();

    let quads = builder.into_sink();
    assert_eq!(quads[0].triple.subject, Term::from(NamedNode::new_unchecked("http://example.org/root")));
    assert!(matches!(quads[1].triple.object, Term::BlankNode(_)));
}

#[test]
fn test_rdfs_member_instead_of_ordinals() {
    let shape = GraphShape { use_rdfs_member: true, ..GraphShape::default() };
    let mut builder = builder(shape);
    builder.add_root(CALL, "root").unwrap();
    builder.add_value(CALL, "root", Slot::Index(7), literal("x")).unwrap();
    assert_eq!(
        builder.into_sink()[1].triple.predicate.as_str(),
        "http://www.w3.org/2000/01/rdf-schema#member"
    );
}

#[test]
fn test_builder_errors() {
    let mut builder = builder(GraphShape::default());
    builder.add_root(CALL, "root").unwrap();

    assert!(matches!(
        builder.add_container(CALL, "root", Slot::Index(0), "child"),
        Err(BuilderError::InvalidSlot { .. })
    ));
    assert!(matches!(builder.add_type(CALL, "root", "not a name"), Err(BuilderError::InvalidIri(_))));
    assert!(matches!(builder.add_root("not an iri", "root"), Err(BuilderError::InvalidIri(_))));
    // Nothing was emitted by the failed calls
    assert_eq!(builder.triple_count(), 1);
}
