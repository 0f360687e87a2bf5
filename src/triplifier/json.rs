//! JSON documents.
//!
//! Objects become containers keyed by member name, arrays become
//! containers with ordinal slots. `null` members and items are skipped.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use oxigraph::model::vocab::xsd;
use oxigraph::model::{Literal, Term};
use serde_json::Value;

pub struct JsonTriplifier;

struct Walk<'b> {
    graph: &'b str,
    builder: &'b mut dyn FacadeXGraphBuilder,
}

impl Walk<'_> {
    fn container(&mut self, id: &str, value: &Value) -> Result<(), TriplifierError> {
        match value {
            Value::Object(members) => {
                for (key, member) in members {
                    let child = format!("{id}/{}", urlencoding::encode(key));
                    self.member(id, Slot::Key(key.clone()), member, &child)?;
                }
            }
            Value::Array(items) => {
                let mut slot = 0u64;
                for item in items.iter().filter(|item| !item.is_null()) {
                    slot += 1;
                    let child = format!("{id}/_{slot}");
                    self.member(id, Slot::Index(slot), item, &child)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn member(&mut self, parent: &str, slot: Slot, value: &Value, child: &str) -> Result<(), TriplifierError> {
        match value {
            Value::Null => Ok(()),
            Value::Object(_) | Value::Array(_) => {
                self.builder.add_container(self.graph, parent, slot, child)?;
                self.container(child, value)
            }
            scalar => Ok(self.builder.add_value(self.graph, parent, slot, literal(scalar))?),
        }
    }
}

fn literal(value: &Value) -> Term {
    match value {
        Value::String(s) => Literal::new_simple_literal(s).into(),
        Value::Bool(b) => Literal::new_typed_literal(b.to_string(), xsd::BOOLEAN).into(),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Literal::new_typed_literal(n.to_string(), xsd::INTEGER).into()
        }
        Value::Number(n) => Literal::new_typed_literal(n.to_string(), xsd::DOUBLE).into(),
        other => Literal::new_simple_literal(other.to_string()).into(),
    }
}

impl Triplifier for JsonTriplifier {
    fn name(&self) -> &'static str {
        "json"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["application/json"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let document: Value =
            serde_json::from_reader(request.open()?).map_err(TriplifierError::parse)?;

        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;

        let mut walk = Walk { graph, builder };
        match &document {
            Value::Object(_) | Value::Array(_) => walk.container(root, &document),
            Value::Null => Ok(()),
            scalar => Ok(walk.builder.add_value(graph, root, Slot::Index(1), literal(scalar))?),
        }
    }
}
