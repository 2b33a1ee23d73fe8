use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDateTime, Timelike};
use tracing::{debug, info, warn};

use tablecraft_core::{FieldType, TableSchema, resolve_generation_order, validate_schema_set};

use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::faker::{FakeDataProvider, FakerProvider};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport, RowSource, TableReport};
use crate::output::csv::write_table_csv;
use crate::store::DatasetStore;
use crate::tables::TableGenerator;

/// File name of the run report inside `out_dir`. Not part of the seeded
/// output: `run_id` and `duration_ms` differ between runs.
pub const REPORT_FILE: &str = "generation_report.json";

const UNRECOGNIZED_FIELD_TYPE: &str = "unrecognized_field_type";

/// Generated tables held in memory, in generation order.
#[derive(Debug)]
pub struct GeneratedDataset {
    pub store: DatasetStore,
    pub report: GenerationReport,
}

/// Result of a generation run that wrote its output.
#[derive(Debug)]
pub struct GenerationResult {
    pub out_dir: PathBuf,
    /// CSV files written, one per non-empty table.
    pub files: Vec<PathBuf>,
    pub store: DatasetStore,
    pub report: GenerationReport,
}

/// Entry point for generating a dataset from a set of table schemas.
pub struct GenerationEngine {
    options: GenerateOptions,
    provider: Box<dyn FakeDataProvider>,
}

impl fmt::Debug for GenerationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl GenerationEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_provider(options, Box::new(FakerProvider))
    }

    pub fn with_provider(options: GenerateOptions, provider: Box<dyn FakeDataProvider>) -> Self {
        Self { options, provider }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Resolve the order, then generate every table into a fresh store.
    ///
    /// Any error aborts the run; no partial dataset is returned.
    pub fn generate(&self, schemas: Vec<TableSchema>) -> Result<GeneratedDataset, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let seed = self.options.seed;
        let anchor = self.options.anchor.unwrap_or_else(wall_clock_anchor);

        let ordered = resolve_generation_order(schemas)?;
        validate_schema_set(&ordered)?;

        let mut report = GenerationReport::new(run_id.clone(), seed, anchor);
        report.order = ordered.iter().map(|schema| schema.name.clone()).collect();
        self.check_field_types(&ordered, &mut report)?;

        info!(
            run_id = %run_id,
            tables = ordered.len(),
            seed,
            anchor = %anchor,
            strict = self.options.strict,
            "generation started"
        );

        let mut ctx = GenerationContext::new(seed, anchor);
        let mut store = DatasetStore::new();

        for schema in &ordered {
            let table_start = Instant::now();
            let rows = TableGenerator::new(&store, self.provider.as_ref()).generate(schema, &mut ctx)?;
            let rows_generated = rows.len() as u64;
            store.put(schema.name.clone(), rows)?;

            report.record_table(TableReport {
                table: schema.name.clone(),
                kind: schema.kind,
                rows_generated,
                source: RowSource::of(&schema.layout),
                file: None,
                bytes_written: 0,
            });

            info!(
                table = %schema.name,
                kind = %schema.kind,
                rows = rows_generated,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            tables = report.tables.len(),
            rows = report.rows_total,
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GeneratedDataset { store, report })
    }

    /// Generate, then write `<table>.csv` per non-empty table and the report.
    pub fn run(&self, schemas: Vec<TableSchema>) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let GeneratedDataset { store, mut report } = self.generate(schemas)?;

        let out_dir = self.options.out_dir.clone();
        std::fs::create_dir_all(&out_dir)?;

        let mut files = Vec::new();
        for (name, rows) in store.tables() {
            if rows.is_empty() {
                debug!(table = %name, "empty table, no file written");
                continue;
            }

            let file_name = format!("{name}.csv");
            let path = out_dir.join(&file_name);
            let bytes = write_table_csv(&path, rows)?;
            report.bytes_written += bytes;
            if let Some(entry) = report.tables.iter_mut().find(|entry| entry.table == name) {
                entry.file = Some(file_name);
                entry.bytes_written = bytes;
            }
            files.push(path);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        if self.options.write_report {
            std::fs::write(out_dir.join(REPORT_FILE), serde_json::to_vec_pretty(&report)?)?;
        }

        info!(
            out_dir = %out_dir.display(),
            files = files.len(),
            bytes_written = report.bytes_written,
            "output written"
        );

        Ok(GenerationResult {
            out_dir,
            files,
            store,
            report,
        })
    }

    fn check_field_types(
        &self,
        schemas: &[TableSchema],
        report: &mut GenerationReport,
    ) -> Result<(), GenerationError> {
        for schema in schemas {
            for field in &schema.fields {
                let FieldType::Unrecognized { tag } = &field.field_type else {
                    continue;
                };
                if self.options.strict {
                    return Err(tablecraft_core::Error::SchemaValidation {
                        table: schema.name.clone(),
                        message: format!("field '{}' has unrecognized type '{tag}'", field.name),
                    }
                    .into());
                }
                warn!(
                    table = %schema.name,
                    field = %field.name,
                    field_type = %tag,
                    "unrecognized field type, generating null"
                );
                report.record_warning(
                    GenerationIssue::warning(
                        UNRECOGNIZED_FIELD_TYPE,
                        format!("unrecognized field type '{tag}'; values are null"),
                    )
                    .at(&schema.name, &field.name),
                );
            }
        }
        Ok(())
    }
}

/// Local wall clock truncated to whole seconds, pinned once per run.
fn wall_clock_anchor() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
