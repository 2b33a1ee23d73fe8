use std::cmp::Ordering;

use indexmap::IndexMap;
use indexmap::map::Entry;
use rand::Rng;

use tablecraft_core::{CountRange, FieldDef, FieldType, TableLayout, TableSchema};

use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::faker::FakeDataProvider;
use crate::store::DatasetStore;
use crate::synth::{RowContext, ValueSynthesizer, referenced_rows};
use crate::value::{GeneratedValue, Row};

/// Runs the per-kind generation algorithm for one table at a time.
///
/// Every table the schema depends on must already be in the store.
pub struct TableGenerator<'a> {
    synth: ValueSynthesizer<'a>,
}

impl<'a> TableGenerator<'a> {
    pub fn new(store: &'a DatasetStore, provider: &'a dyn FakeDataProvider) -> Self {
        Self {
            synth: ValueSynthesizer::new(store, provider),
        }
    }

    pub fn generate(
        &self,
        schema: &TableSchema,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Row>, GenerationError> {
        match &schema.layout {
            TableLayout::Independent { count } => self.independent_rows(schema, *count, ctx),
            TableLayout::Versioned { count, versions } => {
                self.versioned_rows(schema, *count, *versions, ctx)
            }
            TableLayout::Child {
                parent,
                parent_key,
                per_parent,
            } => self.child_rows(schema, parent, parent_key, *per_parent, ctx),
            TableLayout::Pointer {
                source_table,
                key,
                latest_field,
            } => self.latest_rows(schema, source_table, key, latest_field),
            TableLayout::Records { rows } => Ok(rows
                .iter()
                .map(|record| {
                    record
                        .iter()
                        .map(|(name, value)| (name.clone(), GeneratedValue::from(value)))
                        .collect()
                })
                .collect()),
        }
    }

    fn independent_rows(
        &self,
        schema: &TableSchema,
        count: u64,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Row>, GenerationError> {
        (0..count)
            .map(|_| self.synthesize_row(schema, RowContext::default(), ctx))
            .collect()
    }

    /// One base row per entity, repeated for versions `1..=N`; only
    /// `version_sequence` fields are synthesized again per version.
    fn versioned_rows(
        &self,
        schema: &TableSchema,
        count: u64,
        versions: CountRange,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Row>, GenerationError> {
        let mut rows = Vec::new();
        for _ in 0..count {
            let mut base = Row::with_capacity(schema.fields.len());
            for field in &schema.fields {
                let value = if field.is_version_sequence() {
                    GeneratedValue::Null
                } else {
                    self.synth
                        .synthesize(&schema.name, field, RowContext::default(), ctx)?
                };
                base.insert(field.name.clone(), value);
            }

            let total = draw_count(versions, ctx);
            for version in 1..=total {
                let mut row = base.clone();
                for field in schema.fields.iter().filter(|field| field.is_version_sequence()) {
                    let value = self.synth.synthesize(
                        &schema.name,
                        field,
                        RowContext::with_version(version as i64),
                        ctx,
                    )?;
                    row.insert(field.name.clone(), value);
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Children of every parent row. `version_sequence` fields always take
    /// the parent's version, bypassing the nullable draw and `default`.
    fn child_rows(
        &self,
        schema: &TableSchema,
        parent: &str,
        parent_key: &[String],
        per_parent: CountRange,
        ctx: &mut GenerationContext,
    ) -> Result<Vec<Row>, GenerationError> {
        let parents = referenced_rows(self.synth.store(), &schema.name, parent)?;
        let mut rows = Vec::new();

        for parent_row in parents {
            let total = draw_count(per_parent, ctx);
            ctx.begin_parent_group();
            for _ in 0..total {
                let mut row = Row::with_capacity(schema.fields.len());
                for field in &schema.fields {
                    let row_ctx = RowContext::with_parent(parent_row);
                    let value = if field.is_version_sequence() {
                        row_ctx.current_version()
                    } else {
                        match linked_parent_field(field, parent, parent_key, parent_row) {
                            Some(linked) => parent_row.get(linked).cloned().ok_or_else(|| {
                                GenerationError::MissingField {
                                    table: parent.to_string(),
                                    field: linked.to_string(),
                                }
                            })?,
                            None => self.synth.synthesize(&schema.name, field, row_ctx, ctx)?,
                        }
                    };
                    row.insert(field.name.clone(), value);
                }
                rows.push(row);
            }
            ctx.end_parent_group();
        }

        Ok(rows)
    }

    /// Latest source row per key group, groups in first-seen order.
    ///
    /// A later row replaces the current pick only when its `latest_field`
    /// compares strictly greater, so ties keep the first occurrence.
    fn latest_rows(
        &self,
        schema: &TableSchema,
        source_table: &str,
        key: &[String],
        latest_field: &str,
    ) -> Result<Vec<Row>, GenerationError> {
        let source = referenced_rows(self.synth.store(), &schema.name, source_table)?;
        let mut latest: IndexMap<Vec<String>, (&Row, &GeneratedValue)> = IndexMap::new();

        for row in source {
            let group: Vec<String> = key
                .iter()
                .map(|name| cell(row, name).group_key())
                .collect();
            let candidate = cell(row, latest_field);

            match latest.entry(group) {
                Entry::Vacant(slot) => {
                    slot.insert((row, candidate));
                }
                Entry::Occupied(mut slot) => {
                    if candidate.compare(slot.get().1) == Ordering::Greater {
                        slot.insert((row, candidate));
                    }
                }
            }
        }

        Ok(latest.into_values().map(|(row, _)| row.clone()).collect())
    }

    fn synthesize_row(
        &self,
        schema: &TableSchema,
        row_ctx: RowContext<'_>,
        ctx: &mut GenerationContext,
    ) -> Result<Row, GenerationError> {
        let mut row = Row::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = self.synth.synthesize(&schema.name, field, row_ctx, ctx)?;
            row.insert(field.name.clone(), value);
        }
        Ok(row)
    }
}

fn draw_count(range: CountRange, ctx: &mut GenerationContext) -> u64 {
    if range.min == range.max {
        range.min
    } else {
        ctx.rng().random_range(range.min..=range.max)
    }
}

static NULL: GeneratedValue = GeneratedValue::Null;

fn cell<'r>(row: &'r Row, field: &str) -> &'r GeneratedValue {
    row.get(field).unwrap_or(&NULL)
}

/// Parent field a child field is copied from, if any: `parent_key` fields
/// by name, and `ref` fields that point at a field present on the parent.
fn linked_parent_field<'f>(
    field: &'f FieldDef,
    parent: &str,
    parent_key: &'f [String],
    parent_row: &Row,
) -> Option<&'f str> {
    if parent_key.iter().any(|name| *name == field.name) {
        return Some(field.name.as_str());
    }
    match &field.field_type {
        FieldType::Ref { table, field: target }
            if table == parent && parent_row.contains_key(target) =>
        {
            Some(target.as_str())
        }
        _ => None,
    }
}
