//! Directory listings.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::registry::DIRECTORY_MEDIA_TYPE;
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use oxigraph::model::Literal;

pub const MATCHES: &str = "folder.matches";

/// Lists the immediate children of a directory as absolute paths, sorted.
///
/// Only children some converter recognizes are listed. Subdirectories are
/// recognized through this converter's own media type, so a query can walk
/// a tree one level per nested call.
pub struct FolderTriplifier;

impl Triplifier for FolderTriplifier {
    fn name(&self) -> &'static str {
        "folder"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &[DIRECTORY_MEDIA_TYPE]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let matches = request.options().get_regex(MATCHES)?;
        let children =
            request.locator().list_folder(request.location(), request.registry(), matches.as_ref())?;

        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;
        for (i, child) in children.into_iter().enumerate() {
            builder.add_value(graph, root, Slot::Index(i as u64 + 1), Literal::new_simple_literal(child).into())?;
        }
        Ok(())
    }
}
