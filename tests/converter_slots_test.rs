use facadex::core::vocab::{Vocabulary, RDF_NAMESPACE};
use facadex::core::Quad;
use facadex::facade_x::{GraphShape, SinkGraphBuilder};
use facadex::locator::ResourceLocator;
use facadex::triplifier::{TriplifierRegistry, TriplifierRequest};
use facadex::OptionSet;
use oxigraph::model::Term;
use std::sync::Arc;

const CALL: &str = "urn:facade-x:graph:slots";

fn convert(triplifier: &str, content: &str) -> Vec<Quad> {
    let options: OptionSet = [("content", content)].into_iter().collect();
    let locator = ResourceLocator::default();
    let registry = TriplifierRegistry::with_defaults();
    let request = TriplifierRequest::new(&options, &locator, &registry, CALL, format!("{CALL}#"));
    let mut builder = SinkGraphBuilder::new(GraphShape::default(), Arc::new(Vocabulary::new()), Vec::new());
    registry.get(triplifier).unwrap().triplify(&request, &mut builder).unwrap();
    builder.into_sink()
}

/// Ordinal indices used by each container, in emission order.
fn ordinals(quads: &[Quad]) -> Vec<(Term, Vec<u64>)> {
    let prefix = format!("{RDF_NAMESPACE}_");
    let mut containers: Vec<(Term, Vec<u64>)> = Vec::new();
    for quad in quads {
        let Some(index) = quad.triple.predicate.as_str().strip_prefix(&prefix) else {
            continue;
        };
        let index: u64 = index.parse().unwrap();
        match containers.iter_mut().find(|(subject, _)| *subject == quad.triple.subject) {
            Some((_, indices)) => indices.push(index),
            None => containers.push((quad.triple.subject.clone(), vec![index])),
        }
    }
    containers
}

fn assert_contiguous(containers: &[(Term, Vec<u64>)]) {
    for (subject, indices) in containers {
        let expected: Vec<u64> = (1..=indices.len() as u64).collect();
        assert_eq!(indices, &expected, "slots of {subject}");
    }
}

#[test]
fn test_json_nulls_leave_no_gaps() {
    let containers = ordinals(&convert("json", "[1, null, 2]"));
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].1, vec![1, 2]);

    let nested = ordinals(&convert("json", r#"{"a": [null, [null, "x", null, "y"], null, 3]}"#));
    assert_eq!(nested.len(), 2);
    assert_contiguous(&nested);
}

#[test]
fn test_xml_text_and_children_share_one_sequence() {
    let quads = convert("xml", "<p>one<b>two</b>three<i/><![CDATA[four]]><b>five</b></p>");
    let containers = ordinals(&quads);
    assert_contiguous(&containers);

    // root holds p, p holds six nodes, each b holds its text
    let sizes: Vec<usize> = containers.iter().map(|(_, indices)| indices.len()).collect();
    assert_eq!(sizes, vec![1, 6, 1, 1]);
}

#[test]
fn test_csv_empty_cells_keep_their_column() {
    let containers = ordinals(&convert("csv", "a,,c\n,,\n"));
    assert_contiguous(&containers);
    let sizes: Vec<usize> = containers.iter().map(|(_, indices)| indices.len()).collect();
    assert_eq!(sizes, vec![2, 3, 3]);
}
