//! Generation engine for Tablecraft.
//!
//! Consumes validated table schemas, generates every table in dependency
//! order into an in-memory store and writes one CSV file per table.

pub mod context;
pub mod engine;
pub mod errors;
pub mod faker;
pub mod model;
pub mod output;
pub mod store;
pub mod synth;
pub mod tables;
pub mod value;

pub use context::GenerationContext;
pub use engine::{GeneratedDataset, GenerationEngine, GenerationResult, REPORT_FILE};
pub use errors::GenerationError;
pub use faker::{FakeDataProvider, FakerProvider};
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, RowSource, TableReport};
pub use store::DatasetStore;
pub use synth::{RowContext, ValueSynthesizer};
pub use tables::TableGenerator;
pub use value::{GeneratedValue, Row};
