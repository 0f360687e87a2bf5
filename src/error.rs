//! Error types for virtual-graph evaluation.
//!
//! Every component has a narrow error type of its own; they all convert into
//! [`FacadeError`], which is what a failed virtual-graph call reports to the
//! surrounding query. `FacadeError` is `Clone` because a single conversion
//! failure has to be handed to every reader of the shared triple buffer.

use oxigraph::sparql::Variable;
use thiserror::Error;

/// Result type alias for Facade-X operations
pub type Result<T> = std::result::Result<T, FacadeError>;

/// Main error type for Facade-X operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FacadeError {
    /// A required option (usually the location) never resolved to a value
    #[error("Missing required option '{key}'{}", .variable.as_ref().map(|v| format!(" (unbound variable {v})")).unwrap_or_default())]
    MissingRequiredOption { key: String, variable: Option<Variable> },

    /// The resource could not be opened
    #[error("Resource unavailable '{location}': {reason}")]
    ResourceUnavailable { location: String, reason: String },

    /// No triplifier is registered for the resource
    #[error("Unsupported media type for '{location}'{}", .media_type.as_ref().map(|m| format!(" ({m})")).unwrap_or_default())]
    UnsupportedMediaType { location: String, media_type: Option<String> },

    /// A triplifier failed while converting the resource
    #[error("Conversion of '{location}' by '{triplifier}' failed: {reason}")]
    ConversionFailure { location: String, triplifier: String, reason: String },

    /// The requested combination is recognized but not implemented
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The service address could not be parsed
    #[error("Invalid service address: {0}")]
    InvalidAddress(String),

    /// An option carries a value the consumer cannot interpret
    #[error("Invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// An IRI could not be formed
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query evaluation error outside of a virtual-graph call
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl FacadeError {
    pub fn missing_option(key: impl Into<String>) -> Self {
        FacadeError::MissingRequiredOption { key: key.into(), variable: None }
    }

    /// True when the failure may disappear once an outer binding supplies a
    /// value, i.e. a required option bound to a still unbound variable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FacadeError::MissingRequiredOption { variable: Some(_), .. })
    }
}

impl From<oxigraph::model::IriParseError> for FacadeError {
    fn from(err: oxigraph::model::IriParseError) -> Self {
        FacadeError::InvalidIri(err.to_string())
    }
}

impl From<serde_json::Error> for FacadeError {
    fn from(err: serde_json::Error) -> Self {
        FacadeError::Config(err.to_string())
    }
}
