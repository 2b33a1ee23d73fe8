use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::document::SchemaDocument;
use crate::error::{Error, Result};
use crate::schema::TableSchema;
use crate::validation::ValidationOptions;

/// Serialization format of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Some(DocumentFormat::Yaml),
            Some("json") => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// Parse and validate a single table document. `origin` names the source in
/// error messages.
pub fn parse_schema_document(
    text: &str,
    format: DocumentFormat,
    origin: &str,
    options: &ValidationOptions,
) -> Result<TableSchema> {
    let doc: SchemaDocument = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|source| Error::Yaml {
            path: origin.to_string(),
            source,
        })?,
        DocumentFormat::Json => serde_json::from_str(text).map_err(|source| Error::Json {
            path: origin.to_string(),
            source,
        })?,
    };
    TableSchema::from_document(doc, options)
}

/// Load every `*.yaml`, `*.yml` and `*.json` document in `dir`, sorted by
/// file name. The returned order carries no dependency meaning.
pub fn load_schema_dir(dir: &Path, options: &ValidationOptions) -> Result<Vec<TableSchema>> {
    let mut paths: Vec<(PathBuf, DocumentFormat)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(format) = DocumentFormat::from_path(&path) {
            paths.push((path, format));
        }
    }
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let mut schemas = Vec::with_capacity(paths.len());
    for (path, format) in paths {
        let text = fs::read_to_string(&path)?;
        let schema = parse_schema_document(&text, format, &path.display().to_string(), options)?;
        debug!(path = %path.display(), table = %schema.name, kind = %schema.kind, "schema loaded");
        schemas.push(schema);
    }

    info!(dir = %dir.display(), tables = schemas.len(), "schema documents loaded");
    Ok(schemas)
}
