use indexmap::IndexMap;

use crate::errors::GenerationError;
use crate::value::Row;

/// Append-only registry of generated tables for one run.
///
/// Each table is written once and read any number of times afterwards;
/// iteration follows write order, which is the generation order.
#[derive(Debug, Default, Clone)]
pub struct DatasetStore {
    tables: IndexMap<String, Vec<Row>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, table: impl Into<String>, rows: Vec<Row>) -> Result<(), GenerationError> {
        let table = table.into();
        if self.tables.contains_key(&table) {
            return Err(GenerationError::TableAlreadyStored(table));
        }
        self.tables.insert(table, rows);
        Ok(())
    }

    pub fn get(&self, table: &str) -> Result<&[Row], GenerationError> {
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| GenerationError::UnknownTable(table.to_string()))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables
            .iter()
            .map(|(name, rows)| (name.as_str(), rows.as_slice()))
    }

    /// Drop every table, ending the run.
    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
