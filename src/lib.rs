//! # facadex
//!
//! facadex lets a query treat an external resource (a file, an HTTP
//! payload, an entry inside an archive, a folder) as if it were an RDF
//! graph, without loading or converting it beforehand.
//!
//! A query names the resource inside a `SERVICE <x-sparql-anything:...>`
//! call. For every binding that reaches the call the engine resolves the
//! call's options, selects a converter ("triplifier") for the resource's
//! format, and matches the service body against a lazily produced,
//! cached sequence of Facade-X triples.
//!
//! ## Features
//!
//! - Facade-X graph builder shared by every converter
//! - Triplifier registry with CSV, JSON, XML, text, zip and folder converters
//! - Options from inline address parameters and `fx:properties` triples
//! - Buffered triple sources converted at most once per fingerprint
//! - Correlated calls, the `fx:anySlot` wildcard and an audit side graph
//!
//! ## Example
//!
//! ```rust
//! use facadex::{EngineConfig, QueryEngine, Result};
//!
//! fn example() -> Result<()> {
//!     let engine = QueryEngine::new(EngineConfig::default())?;
//!     assert!(engine.cache().is_empty());
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::new_without_default)]

/// Query algebra consumed by the engine
pub mod algebra;

pub mod config;

/// Core data structures and types
pub mod core;

pub mod error;

/// Query evaluation and the virtual-graph operator
pub mod execution;

pub mod facade_x;

pub mod locator;

/// Per-call options and their resolution
pub mod properties;

/// Buffered triple sources and their cache
pub mod source;

pub mod triplifier;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{FacadeError, Result};
pub use execution::{QueryEngine, SolutionIter, VirtualGraphOperator};
pub use facade_x::{FacadeXGraphBuilder, Slot};
pub use properties::OptionSet;
pub use triplifier::{Triplifier, TriplifierRegistry};
