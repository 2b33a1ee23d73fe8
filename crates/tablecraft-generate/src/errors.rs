use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Schema(#[from] tablecraft_core::Error),
    /// Dependency ordering should make this unreachable.
    #[error("referenced table not yet generated: '{table}' needs '{reference}'")]
    ReferencedTableNotGenerated { table: String, reference: String },
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("table already stored: {0}")]
    TableAlreadyStored(String),
    #[error("referenced table '{reference}' has no rows (needed by '{table}')")]
    EmptyReferencedTable { table: String, reference: String },
    #[error("field '{field}' missing from a row of '{table}'")]
    MissingField { table: String, field: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
