use chrono::{NaiveDateTime, NaiveTime};
use rand::Rng;

use tablecraft_core::{CodePattern, CodeToken, DateWindow, FieldDef, FieldType, VERSION_ATTRIBUTE};

use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::faker::FakeDataProvider;
use crate::store::DatasetStore;
use crate::value::{GeneratedValue, Row};

/// Probability that a nullable field yields null.
pub const NULL_PROBABILITY: f64 = 0.10;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Row-level inputs visible to a field while it is synthesized.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowContext<'a> {
    /// Parent row when generating children of a parent table.
    pub parent: Option<&'a Row>,
    /// Current version inside an immutable entity's version loop.
    pub version: Option<i64>,
}

impl<'a> RowContext<'a> {
    pub fn with_parent(parent: &'a Row) -> Self {
        Self {
            parent: Some(parent),
            version: None,
        }
    }

    pub fn with_version(version: i64) -> Self {
        Self {
            parent: None,
            version: Some(version),
        }
    }

    /// Loop version, else the parent's `version` attribute, else 1.
    pub fn current_version(&self) -> GeneratedValue {
        if let Some(version) = self.version {
            return GeneratedValue::Int(version);
        }
        self.parent
            .and_then(|parent| parent.get(VERSION_ATTRIBUTE))
            .cloned()
            .unwrap_or(GeneratedValue::Int(1))
    }
}

/// Produces one value per field, reading earlier tables from the store.
pub struct ValueSynthesizer<'a> {
    store: &'a DatasetStore,
    provider: &'a dyn FakeDataProvider,
}

impl<'a> ValueSynthesizer<'a> {
    pub fn new(store: &'a DatasetStore, provider: &'a dyn FakeDataProvider) -> Self {
        Self { store, provider }
    }

    pub fn store(&self) -> &'a DatasetStore {
        self.store
    }

    /// Synthesize `field` of `table`.
    ///
    /// Nullable draw first, then `default`, then dispatch on the field type.
    pub fn synthesize(
        &self,
        table: &str,
        field: &FieldDef,
        row: RowContext<'_>,
        ctx: &mut GenerationContext,
    ) -> Result<GeneratedValue, GenerationError> {
        if field.nullable && ctx.rng().random_bool(NULL_PROBABILITY) {
            return Ok(GeneratedValue::Null);
        }
        if let Some(default) = &field.default {
            return Ok(default.into());
        }

        let value = match &field.field_type {
            FieldType::Uuid => GeneratedValue::Uuid(random_uuid(ctx.rng())),
            FieldType::Const { value } => value.into(),
            FieldType::Int { min, max } => GeneratedValue::Int(ctx.rng().random_range(*min..=*max)),
            FieldType::Date { window } => {
                let (start, end) = day_bounds(window, ctx.anchor());
                GeneratedValue::Date(self.provider.random_date(start, end, ctx.rng()))
            }
            FieldType::Timestamp { window } => {
                let (start, end) = window.resolve(ctx.anchor());
                GeneratedValue::Timestamp(self.provider.random_date_time(start, end, ctx.rng()))
            }
            FieldType::Ref {
                table: target,
                field: target_field,
            } => self.pick_reference(table, target, target_field, ctx)?,
            FieldType::Code { pattern } => GeneratedValue::Text(render_code(pattern, ctx)),
            FieldType::VersionSequence => row.current_version(),
            FieldType::AutoIncrement => GeneratedValue::Int(ctx.next_auto_increment(&field.name)),
            FieldType::Unrecognized { .. } => GeneratedValue::Null,
        };

        Ok(value)
    }

    fn pick_reference(
        &self,
        table: &str,
        target: &str,
        target_field: &str,
        ctx: &mut GenerationContext,
    ) -> Result<GeneratedValue, GenerationError> {
        let rows = referenced_rows(self.store, table, target)?;
        if rows.is_empty() {
            return Err(GenerationError::EmptyReferencedTable {
                table: table.to_string(),
                reference: target.to_string(),
            });
        }

        let picked = &rows[ctx.rng().random_range(0..rows.len())];
        picked
            .get(target_field)
            .cloned()
            .ok_or_else(|| GenerationError::MissingField {
                table: target.to_string(),
                field: target_field.to_string(),
            })
    }
}

/// Rows of `reference`, failing if it has not been generated before `table`.
pub fn referenced_rows<'s>(
    store: &'s DatasetStore,
    table: &str,
    reference: &str,
) -> Result<&'s [Row], GenerationError> {
    store
        .get(reference)
        .map_err(|_| GenerationError::ReferencedTableNotGenerated {
            table: table.to_string(),
            reference: reference.to_string(),
        })
}

/// Whole-day bounds so the window's end date is included.
fn day_bounds(window: &DateWindow, anchor: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
    let (start, end) = window.resolve(anchor);
    let start_day = start.date().and_time(NaiveTime::MIN);
    let end_day = end
        .date()
        .succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(end);
    (start_day, end_day)
}

fn random_uuid(rng: &mut impl Rng) -> String {
    let bytes: [u8; 16] = rng.random();
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

fn render_code(pattern: &CodePattern, ctx: &mut GenerationContext) -> String {
    let mut out = String::new();
    for token in &pattern.tokens {
        match token {
            CodeToken::Literal(text) => out.push_str(text),
            CodeToken::Date(format) => {
                let mut rendered = String::new();
                match std::fmt::write(&mut rendered, format_args!("{}", ctx.anchor().format(format))) {
                    Ok(()) => out.push_str(&rendered),
                    Err(_) => out.push_str(&format!("<UNKNOWN:date:{format}>")),
                }
            }
            CodeToken::Seq { width } => {
                let next = ctx.next_sequence(&pattern.source);
                out.push_str(&format!("{next:0width$}"));
            }
            CodeToken::Alpha => {
                let index = ctx.rng().random_range(0..ALPHABET.len());
                out.push(char::from(ALPHABET[index]));
            }
            CodeToken::Unknown(token) => out.push_str(&format!("<UNKNOWN:{token}>")),
        }
    }
    out
}
