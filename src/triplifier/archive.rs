//! Zip archives, listed rather than unpacked.
//!
//! Each recognized entry name becomes a literal value of the root. A
//! listed name can be fed back as `location` together with
//! `from-archive=<archive>` to triplify that entry.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use oxigraph::model::Literal;

pub const MATCHES: &str = "archive.matches";

pub struct ArchiveTriplifier;

impl Triplifier for ArchiveTriplifier {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["zip"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["application/zip"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let matches = request.options().get_regex(MATCHES)?;
        let entries =
            request.locator().list_archive(request.location(), request.registry(), matches.as_ref())?;

        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;
        for (i, entry) in entries.iter().enumerate() {
            let value = Literal::new_simple_literal(entry).into();
            builder.add_value(graph, root, Slot::Index(i as u64 + 1), value)?;
        }
        tracing::debug!(archive = request.location(), entries = entries.len(), "archive listed");
        Ok(())
    }
}
