//! Plain text.
//!
//! Without options the whole text is the single value of the root.
//! `txt.regex` emits one value per match (the first group when the pattern
//! has one), `txt.split` emits the non-empty pieces between separators.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use oxigraph::model::Literal;

pub const REGEX: &str = "txt.regex";
pub const SPLIT: &str = "txt.split";

pub struct TextTriplifier;

impl Triplifier for TextTriplifier {
    fn name(&self) -> &'static str {
        "txt"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["txt", "text"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["text/plain"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let text = request.read_to_string()?;
        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;

        let pieces: Vec<&str> = if let Some(regex) = request.options().get_regex(REGEX)? {
            regex
                .captures_iter(&text)
                .filter_map(|captures| captures.get(1).or_else(|| captures.get(0)))
                .map(|m| m.as_str())
                .collect()
        } else if let Some(separator) = request.options().get_regex(SPLIT)? {
            separator.split(&text).filter(|piece| !piece.is_empty()).collect()
        } else {
            vec![text.as_str()]
        };

        for (i, piece) in pieces.into_iter().enumerate() {
            let value = Literal::new_simple_literal(piece).into();
            builder.add_value(graph, root, Slot::Index(i as u64 + 1), value)?;
        }
        Ok(())
    }
}
