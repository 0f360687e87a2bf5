//! Service address parsing.
//!
//! An address looks like
//! `x-sparql-anything:location=data/a.csv,csv.headers=true`: the scheme
//! followed by comma separated `key=value` segments. `\,`, `\=` and `\\`
//! escape the separators. A first segment without `=` is taken as the
//! location, so `x-sparql-anything:data/a.csv` is valid too.

use crate::core::vocab::SERVICE_SCHEME;
use crate::error::{FacadeError, Result};
use crate::properties::{keys, OptionSet};
use regex::Regex;

/// Inline parameters of a service address, in textual order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAddress {
    parameters: Vec<(String, String)>,
}

impl ServiceAddress {
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// Inline parameters as an option set; a later duplicate key wins.
    pub fn to_options(&self) -> OptionSet {
        self.parameters.iter().cloned().collect()
    }
}

pub struct AddressParser {
    segment_regex: Regex,
    key_value_regex: Regex,
    escape_regex: Regex,
}

impl AddressParser {
    pub fn new() -> Result<Self> {
        Ok(AddressParser {
            segment_regex: compile(r"(?s)(?:\\.|[^,\\])+")?,
            key_value_regex: compile(r"(?s)^((?:\\.|[^=\\])*)=(.*)$")?,
            escape_regex: compile(r"(?s)\\(.)")?,
        })
    }

    /// Parse an address IRI.
    ///
    /// # Errors
    ///
    /// Returns `FacadeError::InvalidAddress` if the scheme is missing, a key is
    /// empty, or a segment other than the first has no `=`.
    ///
    /// # Example
    ///
    /// ```
    /// use facadex::properties::AddressParser;
    ///
    /// let parser = AddressParser::new().unwrap();
    /// let address = parser.parse("x-sparql-anything:location=a.csv,csv.delimiter=\\,").unwrap();
    /// let options = address.to_options();
    /// assert_eq!(options.get("location"), Some("a.csv"));
    /// assert_eq!(options.get("csv.delimiter"), Some(","));
    /// ```
    pub fn parse(&self, address: &str) -> Result<ServiceAddress> {
        let body = address.strip_prefix(SERVICE_SCHEME).ok_or_else(|| {
            FacadeError::InvalidAddress(format!("'{address}' does not start with {SERVICE_SCHEME}"))
        })?;

        let mut parameters = Vec::new();
        for (position, segment) in self.segment_regex.find_iter(body).enumerate() {
            let segment = segment.as_str();
            match self.key_value_regex.captures(segment) {
                Some(captures) => {
                    let key = self.unescape(&captures[1]);
                    if key.is_empty() {
                        return Err(FacadeError::InvalidAddress(format!(
                            "empty key in segment '{segment}' of '{address}'"
                        )));
                    }
                    parameters.push((key, self.unescape(&captures[2])));
                }
                None if position == 0 => {
                    parameters.push((keys::LOCATION.to_string(), self.unescape(segment)));
                }
                None => {
                    return Err(FacadeError::InvalidAddress(format!(
                        "segment '{segment}' of '{address}' is not a key=value pair"
                    )));
                }
            }
        }
        Ok(ServiceAddress { parameters })
    }

    fn unescape(&self, value: &str) -> String {
        self.escape_regex.replace_all(value, "$1").into_owned()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| FacadeError::Config(format!("address pattern: {e}")))
}
