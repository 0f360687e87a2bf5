//! CSV and TSV tables.
//!
//! The root holds one container per data row, in file order. Cells are
//! keyed by column number, or by header name with `csv.headers=true`.

use crate::facade_x::{FacadeXGraphBuilder, Slot};
use crate::triplifier::{Triplifier, TriplifierError, TriplifierRequest};
use crate::error::FacadeError;
use oxigraph::model::Literal;

pub const HEADERS: &str = "csv.headers";
pub const DELIMITER: &str = "csv.delimiter";
pub const QUOTE_CHAR: &str = "csv.quote-char";

pub struct CsvTriplifier;

impl CsvTriplifier {
    fn byte_option(request: &TriplifierRequest<'_>, key: &str, default: u8) -> Result<u8, TriplifierError> {
        match request.options().get_char(key)? {
            None => Ok(default),
            Some(c) if c.is_ascii() => Ok(c as u8),
            Some(c) => Err(FacadeError::InvalidOption {
                key: key.to_string(),
                reason: format!("'{c}' is not an ASCII character"),
            }
            .into()),
        }
    }
}

impl Triplifier for CsvTriplifier {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["csv", "tsv"]
    }

    fn supported_media_types(&self) -> &'static [&'static str] {
        &["text/csv", "text/tab-separated-values"]
    }

    fn triplify(
        &self,
        request: &TriplifierRequest<'_>,
        builder: &mut dyn FacadeXGraphBuilder,
    ) -> Result<(), TriplifierError> {
        let headers = request.options().get_bool(HEADERS)?.unwrap_or(false);
        let tab_separated = crate::triplifier::registry::extension_of(request.location())
            .is_some_and(|e| e == "tsv");
        let delimiter = Self::byte_option(request, DELIMITER, if tab_separated { b'\t' } else { b',' })?;
        let quote = Self::byte_option(request, QUOTE_CHAR, b'"')?;

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .quote(quote)
            .from_reader(request.open()?);

        let graph = request.graph_id();
        let root = request.root_id();
        builder.add_root(graph, root)?;

        let mut names: Option<Vec<String>> = None;
        let mut rows = 0u64;
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| TriplifierError::parse(format!("record {}: {e}", line + 1)))?;
            if headers && names.is_none() {
                names = Some(record.iter().map(|name| name.trim().to_string()).collect());
                continue;
            }

            rows += 1;
            let row = format!("{root}row{rows}");
            builder.add_container(graph, root, Slot::Index(rows), &row)?;
            for (column, cell) in record.iter().enumerate() {
                let slot = match names.as_ref().and_then(|n| n.get(column)) {
                    Some(name) if !name.is_empty() => Slot::Key(name.clone()),
                    _ => Slot::Index(column as u64 + 1),
                };
                builder.add_value(graph, &row, slot, Literal::new_simple_literal(cell).into())?;
            }
        }
        tracing::debug!(location = request.location(), rows, "csv converted");
        Ok(())
    }
}
