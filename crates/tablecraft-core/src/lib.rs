//! Core contracts for Tablecraft.
//!
//! This crate defines the validated table schema model, the raw schema
//! documents it is built from, the schema directory loader, and the
//! dependency resolver that orders tables for generation.

pub mod document;
pub mod error;
pub mod graph;
pub mod loader;
pub mod schema;
pub mod types;
pub mod validation;

pub use document::{FieldDocument, KeyList, RangeDocument, SchemaDocument};
pub use error::{Error, Result};
pub use graph::{DependencyGraph, dependencies_of, resolve_generation_order};
pub use loader::{DocumentFormat, load_schema_dir, parse_schema_document};
pub use schema::{FieldDef, FieldType, TableKind, TableLayout, TableSchema};
pub use types::{CodePattern, CodeToken, CountRange, DateWindow, Literal, RelativeOffset};
pub use validation::{ValidationOptions, validate_schema_set};

/// Row attribute read from a parent row when a child copies its version.
pub const VERSION_ATTRIBUTE: &str = "version";
