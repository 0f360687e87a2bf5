use facadex::facade_x::{FacadeXGraphBuilder, Slot};
use facadex::locator::{ResourceLocator, ResourceProbe};
use facadex::triplifier::{SelectionRule, Triplifier, TriplifierError, TriplifierRegistry, TriplifierRequest};
use facadex::{FacadeError, OptionSet};
use oxigraph::model::Literal;

fn options(pairs: &[(&str, &str)]) -> OptionSet {
    pairs.iter().copied().collect()
}

fn probe(extension: Option<&str>, media_type: Option<&str>) -> ResourceProbe {
    ResourceProbe {
        extension: extension.map(str::to_string),
        media_type: media_type.map(str::to_string),
        is_directory: false,
    }
}

struct MarkdownTriplifier;

impl Triplifier for MarkdownTriplifier {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["md", "txt"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["text/markdown"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        builder.add_root(request.graph_id(), request.root_id())?;
        builder.add_value(request.graph_id(), request.root_id(), Slot::Index(1), Literal::new_simple_literal("md").into())?;
        Ok(())
    }
}

#[test]
fn test_default_registry_names() {
    let registry = TriplifierRegistry::with_defaults();
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec!["csv", "json", "xml", "txt", "archive", "folder"]);
}

#[test]
fn test_extension_selection() {
    let registry = TriplifierRegistry::with_defaults();
    let selection = registry.select(&options(&[("location", "a.JSON")]), &probe(Some("json"), None)).unwrap();
    assert_eq!(selection.triplifier.name(), "json");
    assert_eq!(selection.rule, SelectionRule::Extension);
}

#[test]
fn test_override_wins_over_extension() {
    let registry = TriplifierRegistry::with_defaults();
    let selection = registry
        .select(&options(&[("location", "a.csv"), ("triplifier", "TXT")]), &probe(Some("csv"), None))
        .unwrap();
    assert_eq!(selection.triplifier.name(), "txt");
    assert_eq!(selection.rule, SelectionRule::Override);
}

#[test]
fn test_extension_wins_over_media_type() {
    let registry = TriplifierRegistry::with_defaults();
    let selection = registry
        .select(
            &options(&[("location", "a.xml"), ("media-type", "application/json")]),
            &probe(Some("xml"), None),
        )
        .unwrap();
    assert_eq!(selection.triplifier.name(), "xml");
}

#[test]
fn test_media_type_fallback() {
    let registry = TriplifierRegistry::with_defaults();
    let declared = registry
        .select(&options(&[("location", "http://h/data"), ("media-type", "application/json; charset=utf-8")]), &probe(None, None))
        .unwrap();
    assert_eq!(declared.triplifier.name(), "json");
    assert_eq!(declared.rule, SelectionRule::MediaType);

    let directory = registry
        .select(&options(&[("location", "/data")]), &probe(None, Some("inode/directory")))
        .unwrap();
    assert_eq!(directory.triplifier.name(), "folder");
}

#[test]
fn test_no_match_is_unsupported_media_type() {
    let registry = TriplifierRegistry::with_defaults();
    let err = registry.select(&options(&[("location", "a.bin")]), &probe(Some("bin"), None)).unwrap_err();
    assert_eq!(err, FacadeError::UnsupportedMediaType { location: "a.bin".to_string(), media_type: None });

    let err = registry
        .select(&options(&[("location", "a.csv"), ("triplifier", "nope")]), &probe(Some("csv"), None))
        .unwrap_err();
    assert!(matches!(err, FacadeError::UnsupportedMediaType { .. }));
}

#[test]
fn test_later_registration_overrides_earlier() {
    let registry = TriplifierRegistry::builder().with_defaults().register(MarkdownTriplifier).build();
    assert_eq!(registry.for_extension("txt").unwrap().name(), "markdown");
    assert_eq!(registry.for_extension("text").unwrap().name(), "txt");
    assert_eq!(registry.get("markdown").unwrap().name(), "markdown");
    assert!(registry.recognizes("notes/README.md"));
    assert!(!registry.recognizes("notes/README"));
}

#[test]
fn test_probe_of_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let locator = ResourceLocator::default();
    let location = dir.path().display().to_string();
    let probe = locator.probe(&options(&[("location", location.as_str())]));
    assert!(probe.is_directory);
    assert_eq!(probe.extension, None);
    assert_eq!(probe.media_type.as_deref(), Some("inode/directory"));
}
