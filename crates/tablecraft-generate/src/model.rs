use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use tablecraft_core::{TableKind, TableLayout};

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Directory where CSV files and the report are written.
    pub out_dir: PathBuf,
    /// Seed for the run's single random source.
    pub seed: u64,
    /// Pinned "now" for date windows and `{date:..}` tokens; wall clock if unset.
    pub anchor: Option<NaiveDateTime>,
    /// Fail on unrecognized field types instead of emitting null.
    pub strict: bool,
    /// Write `generation_report.json` next to the CSV files.
    ///
    /// Only the CSV files are reproducible from the seed; the report carries a
    /// fresh `run_id` and the measured `duration_ms` on every run.
    pub write_report: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output"),
            seed: 0,
            anchor: None,
            strict: false,
            write_report: true,
        }
    }
}

/// Where a table's rows came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSource {
    Generated,
    Records,
    Derived,
}

impl RowSource {
    pub fn of(layout: &TableLayout) -> Self {
        match layout {
            TableLayout::Records { .. } => RowSource::Records,
            TableLayout::Pointer { .. } => RowSource::Derived,
            _ => RowSource::Generated,
        }
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub kind: TableKind,
    pub rows_generated: u64,
    pub source: RowSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub bytes_written: u64,
}

/// Structured generation issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
            field: None,
        }
    }

    pub fn at(mut self, table: &str, field: &str) -> Self {
        self.table = Some(table.to_string());
        self.field = Some(field.to_string());
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub anchor: NaiveDateTime,
    /// Resolved generation order.
    pub order: Vec<String>,
    pub tables: Vec<TableReport>,
    pub rows_total: u64,
    pub bytes_written: u64,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, anchor: NaiveDateTime) -> Self {
        Self {
            run_id,
            seed,
            anchor,
            order: Vec::new(),
            tables: Vec::new(),
            rows_total: 0,
            bytes_written: 0,
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_table(&mut self, table: TableReport) {
        self.rows_total += table.rows_generated;
        self.tables.push(table);
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|table| table.table == name)
    }
}
