use facadex::core::{Quad, Triple};
use facadex::source::{BufferedTripleSource, MaterializationState};
use facadex::FacadeError;
use oxigraph::model::{Literal, NamedNode, Term};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn quad(subject: &str, value: usize) -> Quad {
    Quad::new(
        NamedNode::new_unchecked("urn:facade-x:graph:test"),
        Triple::new(
            NamedNode::new_unchecked(format!("http://example.org/{subject}")),
            NamedNode::new_unchecked("http://example.org/p"),
            Literal::new_simple_literal(value.to_string()),
        ),
    )
}

fn source() -> Arc<BufferedTripleSource> {
    Arc::new(BufferedTripleSource::new("urn:facade-x:graph:test"))
}

#[test]
fn test_generations() {
    let source = source();
    let mut writer = source.begin().unwrap();
    assert_eq!(source.state(), MaterializationState::Materializing);

    let first = source.scan();
    assert_eq!(first.generation(), 0);
    writer.append(quad("a", 1));
    writer.append(quad("a", 2));
    let early = source.scan();
    assert_eq!(early.generation(), 0);
    writer.complete();

    assert_eq!(first.map(Result::unwrap).count(), 2);
    assert_eq!(early.map(Result::unwrap).count(), 2);
    assert_eq!(source.scan().generation(), 1);
    assert_eq!(source.scan().generation(), 2);
    assert_eq!(source.triple_count(), Some(2));
}

#[test]
fn test_first_scan_after_completion_is_generation_zero() {
    let source = source();
    let mut writer = source.begin().unwrap();
    writer.append(quad("a", 1));
    writer.append(quad("b", 2));
    writer.complete();

    let counts = source.graph_counts().unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].1, 2);
    assert_eq!(source.scan().generation(), 0);
    assert_eq!(source.scan().generation(), 1);
}

#[test]
fn test_single_writer() {
    let source = source();
    let writer = source.begin();
    assert!(writer.is_some());
    assert!(source.begin().is_none());
    writer.unwrap().complete();
    assert!(source.begin().is_none());
}

#[test]
fn test_converter_runs_at_most_once() {
    let source = source();
    let runs = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        let runs = Arc::clone(&runs);
        source.materialize_with(move |writer| {
            runs.fetch_add(1, Ordering::SeqCst);
            for i in 0..10 {
                writer.append(quad("a", i));
            }
            Ok(())
        });
        assert_eq!(source.scan().count(), 10);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reader_blocks_at_frontier() {
    let source = source();
    let mut writer = source.begin().unwrap();
    writer.append(quad("a", 0));

    let producer = thread::spawn(move || {
        for i in 1..4 {
            thread::sleep(Duration::from_millis(20));
            writer.append(quad("a", i));
        }
        writer.complete();
    });

    let values: Vec<Term> = source.scan().map(|q| q.unwrap().triple.object).collect();
    producer.join().unwrap();
    let expected: Vec<Term> = (0..4).map(|i| Literal::new_simple_literal(i.to_string()).into()).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_concurrent_readers_see_the_same_sequence() {
    let source = source();
    source.materialize_with(|writer| {
        for i in 0..500 {
            writer.append(quad("a", i));
        }
        Ok(())
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let source = Arc::clone(&source);
            thread::spawn(move || source.scan().map(Result::unwrap).collect::<Vec<_>>())
        })
        .collect();
    let results: Vec<Vec<Quad>> = readers.into_iter().map(|r| r.join().unwrap()).collect();
    assert_eq!(results[0].len(), 500);
    assert!(results.iter().all(|r| *r == results[0]));
}

#[test]
fn test_dropping_a_scan_early_keeps_the_buffer() {
    let source = source();
    let mut writer = source.begin().unwrap();
    for i in 0..3 {
        writer.append(quad("a", i));
    }

    let mut partial = source.scan();
    assert!(partial.next().is_some());
    assert_eq!(source.active_readers(), 1);
    drop(partial);
    assert_eq!(source.active_readers(), 0);

    writer.append(quad("a", 3));
    writer.complete();
    assert_eq!(source.scan().count(), 4);
    assert_eq!(source.active_readers(), 0);
}

#[test]
fn test_failure_reaches_every_reader() {
    let source = source();
    let reader = source.scan();
    let failure = FacadeError::ConversionFailure {
        location: "a.csv".to_string(),
        triplifier: "csv".to_string(),
        reason: "bad quote".to_string(),
    };
    let expected = failure.clone();
    source.materialize_with(move |writer| {
        writer.append(quad("a", 0));
        Err(failure)
    });

    let items: Vec<_> = reader.collect();
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert_eq!(items[1].as_ref().unwrap_err(), &expected);
    assert_eq!(source.state(), MaterializationState::Failed);
    assert_eq!(source.wait().unwrap_err(), expected);
}

#[test]
fn test_abandoned_writer_fails_the_source() {
    let source = source();
    drop(source.begin().unwrap());
    assert_eq!(source.state(), MaterializationState::Failed);
    assert!(matches!(source.scan().next(), Some(Err(FacadeError::Evaluation(_)))));
}

#[test]
fn test_subject_scan_uses_completed_index() {
    let source = source();
    let mut writer = source.begin().unwrap();
    writer.append(quad("a", 0));
    writer.append(quad("b", 1));
    writer.append(quad("a", 2));

    let subject: Term = NamedNode::new_unchecked("http://example.org/a").into();
    // Before completion the scan filters while streaming
    let streaming = source.scan_subject(&subject);
    writer.complete();
    assert_eq!(streaming.count(), 2);

    let indexed: Vec<Term> = source.scan_subject(&subject).map(|q| q.unwrap().triple.object).collect();
    assert_eq!(indexed, vec![Term::from(Literal::new_simple_literal("0")), Literal::new_simple_literal("2").into()]);
}
