//! XML documents.
//!
//! Every element is a container typed by its local name. Attributes are
//! keyed slots, child elements and text nodes fill ordinal slots in
//! document order.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use oxigraph::model::Literal;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub struct XmlTriplifier;

struct Element {
    id: String,
    next_slot: u64,
}

impl Element {
    fn take_slot(&mut self) -> Slot {
        let slot = Slot::Index(self.next_slot);
        self.next_slot += 1;
        slot
    }
}

struct Document<'b> {
    graph: &'b str,
    root: &'b str,
    builder: &'b mut dyn FacadeXGraphBuilder,
    open: Vec<Element>,
    elements: u64,
}

impl Document<'_> {
    fn parent(&mut self) -> Option<&mut Element> {
        self.open.last_mut()
    }

    fn start(&mut self, start: &BytesStart<'_>) -> Result<Element, TriplifierError> {
        self.elements += 1;
        let id = format!("{}el{}", self.root, self.elements);
        let root = self.root.to_string();
        let (parent, slot) = match self.open.last_mut() {
            Some(parent) => (parent.id.clone(), parent.take_slot()),
            None => (root, Slot::Index(1)),
        };
        self.builder.add_container(self.graph, &parent, slot, &id)?;

        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        self.builder.add_type(self.graph, &id, &name)?;

        for attribute in start.attributes() {
            let attribute = attribute.map_err(TriplifierError::parse)?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(TriplifierError::parse)?;
            self.builder.add_value(
                self.graph,
                &id,
                Slot::Key(key),
                Literal::new_simple_literal(value).into(),
            )?;
        }
        Ok(Element { id, next_slot: 1 })
    }

    fn text(&mut self, text: &str) -> Result<(), TriplifierError> {
        let graph = self.graph;
        let Some(parent) = self.parent() else {
            return Ok(());
        };
        let slot = parent.take_slot();
        let id = parent.id.clone();
        Ok(self.builder.add_value(graph, &id, slot, Literal::new_simple_literal(text).into())?)
    }
}

impl Triplifier for XmlTriplifier {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["xml"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["application/xml", "text/xml"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let text = request.read_to_string()?;
        let mut reader = Reader::from_str(&text);
        reader.trim_text(true);

        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;

        let mut document = Document { graph, root, builder, open: Vec::new(), elements: 0 };
        loop {
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let element = document.start(&start)?;
                    document.open.push(element);
                }
                Ok(Event::Empty(start)) => {
                    document.start(&start)?;
                }
                Ok(Event::End(_)) => {
                    document.open.pop();
                }
                Ok(Event::Text(content)) => {
                    let value = content.unescape().map_err(TriplifierError::parse)?;
                    document.text(&value)?;
                }
                Ok(Event::CData(content)) => {
                    let value = String::from_utf8_lossy(&content.into_inner()).into_owned();
                    document.text(&value)?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(TriplifierError::parse(format!(
                        "at byte {}: {e}",
                        reader.buffer_position()
                    )))
                }
            }
        }
        tracing::debug!(location = request.location(), elements = document.elements, "xml converted");
        Ok(())
    }
}
