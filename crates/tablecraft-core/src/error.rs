use thiserror::Error;

/// Core error type shared across Tablecraft crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema document is missing or carries an invalid attribute.
    #[error("invalid schema for table '{table}': {message}")]
    SchemaValidation { table: String, message: String },
    /// A ref, parent or pointer source names a table outside the schema set.
    #[error("unknown table reference: '{table}' depends on '{reference}'")]
    UnknownTableReference { table: String, reference: String },
    /// The dependency graph has no valid linear order.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },
    /// Two schema documents declare the same table name.
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("json error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn invalid(table: &str, message: impl Into<String>) -> Self {
        Error::SchemaValidation {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by Tablecraft crates.
pub type Result<T> = std::result::Result<T, Error>;
