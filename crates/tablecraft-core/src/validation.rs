use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{FieldDocument, RangeDocument, SchemaDocument};
use crate::error::{Error, Result};
use crate::schema::{FieldDef, FieldType, TableKind, TableLayout, TableSchema};
use crate::types::{CodePattern, CountRange, DateWindow, Literal, RelativeOffset};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 100;

/// Options applied while turning documents into schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    /// Reject unrecognized field types instead of keeping them as null fields.
    pub strict: bool,
}

impl TableSchema {
    /// Validate a raw document and build the typed schema.
    pub fn from_document(doc: SchemaDocument, options: &ValidationOptions) -> Result<Self> {
        let SchemaDocument {
            table_name,
            kind,
            fields,
            count,
            parent,
            parent_key,
            count_per_parent,
            version_range,
            source_table,
            key,
            latest_field,
            records,
        } = doc;

        let table = table_name.as_str();
        if table.trim().is_empty() {
            return Err(Error::invalid(table, "table_name must not be empty"));
        }
        let kind: TableKind = kind.parse().map_err(|message| Error::invalid(table, message))?;

        let fields = fields
            .into_iter()
            .map(|(name, field)| build_field(table, name, field, options))
            .collect::<Result<Vec<_>>>()?;

        let layout = if let Some(records) = records {
            TableLayout::Records {
                rows: build_records(table, records)?,
            }
        } else {
            match (kind, parent) {
                (TableKind::Master, Some(_)) => {
                    return Err(Error::invalid(table, "master tables cannot declare a parent"));
                }
                (TableKind::Pointer, Some(_)) => {
                    return Err(Error::invalid(table, "pointer tables cannot declare a parent"));
                }
                (TableKind::Master | TableKind::Transactional, None) => TableLayout::Independent {
                    count: require(table, count, "count")?,
                },
                (TableKind::Immutable, None) => TableLayout::Versioned {
                    count: require(table, count, "count")?,
                    versions: parse_range(table, "version_range", version_range)?,
                },
                (TableKind::Immutable | TableKind::Transactional, Some(parent)) => {
                    TableLayout::Child {
                        parent,
                        parent_key: parent_key.map(|keys| keys.into_vec()).unwrap_or_default(),
                        per_parent: parse_range(table, "count_per_parent", count_per_parent)?,
                    }
                }
                (TableKind::Pointer, None) => {
                    let key = require(table, key, "key")?.into_vec();
                    if key.is_empty() {
                        return Err(Error::invalid(table, "pointer key must not be empty"));
                    }
                    TableLayout::Pointer {
                        source_table: require(table, source_table, "source_table")?,
                        key,
                        latest_field: require(table, latest_field, "latest_field")?,
                    }
                }
            }
        };

        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(Error::invalid(
                    table,
                    format!("duplicate field '{}'", field.name),
                ));
            }
        }

        Ok(TableSchema {
            name: table_name,
            kind,
            fields,
            layout,
        })
    }
}

fn require<T>(table: &str, value: Option<T>, attribute: &str) -> Result<T> {
    value.ok_or_else(|| Error::invalid(table, format!("missing required attribute '{attribute}'")))
}

fn parse_range(table: &str, attribute: &str, value: Option<RangeDocument>) -> Result<CountRange> {
    match value {
        None => Ok(CountRange::ONE),
        Some(RangeDocument::Exact(count)) => Ok(CountRange::exact(count)),
        Some(RangeDocument::Text(text)) => {
            CountRange::parse(&text).map_err(|message| Error::invalid(table, format!("{attribute}: {message}")))
        }
    }
}

fn build_field(
    table: &str,
    name: String,
    doc: FieldDocument,
    options: &ValidationOptions,
) -> Result<FieldDef> {
    let field_error = |message: String| Error::invalid(table, format!("field '{name}': {message}"));

    let default = doc
        .default
        .as_ref()
        .map(|value| literal(value).ok_or_else(|| field_error("default must be a scalar".to_string())))
        .transpose()?;

    let field_type = match doc.field_type.as_str() {
        "uuid" => FieldType::Uuid,
        "const" => {
            let value = doc
                .value
                .as_ref()
                .ok_or_else(|| field_error("const requires 'value'".to_string()))?;
            FieldType::Const {
                value: literal(value)
                    .ok_or_else(|| field_error("value must be a scalar".to_string()))?,
            }
        }
        "int" => {
            let min = doc.min.unwrap_or(DEFAULT_INT_MIN);
            let max = doc.max.unwrap_or(DEFAULT_INT_MAX);
            if min > max {
                return Err(field_error(format!("min ({min}) must be <= max ({max})")));
            }
            FieldType::Int { min, max }
        }
        "date" => FieldType::Date {
            window: build_window(&doc).map_err(field_error)?,
        },
        "timestamp" => FieldType::Timestamp {
            window: build_window(&doc).map_err(field_error)?,
        },
        "ref" => FieldType::Ref {
            table: doc
                .table
                .clone()
                .ok_or_else(|| field_error("ref requires 'table'".to_string()))?,
            field: doc
                .field
                .clone()
                .ok_or_else(|| field_error("ref requires 'field'".to_string()))?,
        },
        "code" => {
            let pattern = doc
                .pattern
                .as_deref()
                .ok_or_else(|| field_error("code requires 'pattern'".to_string()))?;
            FieldType::Code {
                pattern: CodePattern::parse(pattern).map_err(field_error)?,
            }
        }
        "version_sequence" => FieldType::VersionSequence,
        "auto_increment" => FieldType::AutoIncrement,
        other => {
            if options.strict {
                return Err(field_error(format!("unrecognized field type '{other}'")));
            }
            FieldType::Unrecognized {
                tag: other.to_string(),
            }
        }
    };

    Ok(FieldDef {
        name,
        nullable: doc.nullable,
        default,
        field_type,
    })
}

fn build_window(doc: &FieldDocument) -> std::result::Result<DateWindow, String> {
    let defaults = DateWindow::default();
    let from = doc
        .from
        .as_deref()
        .map(RelativeOffset::parse)
        .transpose()?
        .unwrap_or(defaults.from);
    let to = doc
        .to
        .as_deref()
        .map(RelativeOffset::parse)
        .transpose()?
        .unwrap_or(defaults.to);
    DateWindow::new(from, to)
}

/// Fixture rows; the first row fixes the column set and later rows may omit
/// columns but not add new ones.
fn build_records(
    table: &str,
    records: Vec<IndexMap<String, Value>>,
) -> Result<Vec<IndexMap<String, Literal>>> {
    if let Some((first, rest)) = records.split_first() {
        for (offset, record) in rest.iter().enumerate() {
            if let Some(extra) = record.keys().find(|column| !first.contains_key(*column)) {
                return Err(Error::invalid(
                    table,
                    format!(
                        "record {}: column '{extra}' is not a column of the first record",
                        offset + 1
                    ),
                ));
            }
        }
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_iter()
                .map(|(column, value)| {
                    let cell = literal(&value).ok_or_else(|| {
                        Error::invalid(
                            table,
                            format!("record {index}: column '{column}' must be a scalar"),
                        )
                    })?;
                    Ok((column, cell))
                })
                .collect::<Result<IndexMap<_, _>>>()
        })
        .collect()
}

fn literal(value: &Value) -> Option<Literal> {
    Literal::from_value(value)
}

/// Cross-table checks over schemas already in generation order.
///
/// This checks:
/// - ref targets expose the referenced field
/// - parent keys exist on both the parent and the child
/// - pointer key and latest fields exist on the source table
pub fn validate_schema_set(ordered: &[TableSchema]) -> Result<()> {
    let mut columns: HashMap<&str, Option<BTreeSet<&str>>> = HashMap::new();

    for schema in ordered {
        let table = schema.name.as_str();
        let known = |name: &str| columns.get(name).cloned().flatten();

        for field in &schema.fields {
            if let FieldType::Ref {
                table: target,
                field: target_field,
            } = &field.field_type
                && let Some(target_columns) = known(target)
                && !target_columns.contains(target_field.as_str())
            {
                return Err(Error::invalid(
                    table,
                    format!(
                        "field '{}' references unknown field '{target}.{target_field}'",
                        field.name
                    ),
                ));
            }
        }

        let own: Option<BTreeSet<&str>> = match &schema.layout {
            TableLayout::Child {
                parent, parent_key, ..
            } => {
                let parent_columns = known(parent);
                for key in parent_key {
                    if schema.field(key).is_none() {
                        return Err(Error::invalid(
                            table,
                            format!("parent_key '{key}' is not a field of this table"),
                        ));
                    }
                    if let Some(parent_columns) = &parent_columns
                        && !parent_columns.contains(key.as_str())
                    {
                        return Err(Error::invalid(
                            table,
                            format!("parent_key '{key}' is not a field of parent '{parent}'"),
                        ));
                    }
                }
                Some(field_names(schema))
            }
            TableLayout::Pointer {
                source_table,
                key,
                latest_field,
            } => {
                let source_columns = known(source_table);
                if let Some(source_columns) = &source_columns {
                    for column in key.iter().chain(std::iter::once(latest_field)) {
                        if !source_columns.contains(column.as_str()) {
                            return Err(Error::invalid(
                                table,
                                format!("'{column}' is not a field of source '{source_table}'"),
                            ));
                        }
                    }
                }
                source_columns
            }
            TableLayout::Records { rows } => {
                Some(rows.iter().flat_map(|row| row.keys().map(String::as_str)).collect())
            }
            TableLayout::Independent { .. } | TableLayout::Versioned { .. } => {
                Some(field_names(schema))
            }
        };

        columns.insert(table, own);
    }

    Ok(())
}

fn field_names(schema: &TableSchema) -> BTreeSet<&str> {
    schema.fields.iter().map(|field| field.name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::KeyList;
    use serde_json::json;

    fn field(field_type: &str) -> FieldDocument {
        FieldDocument {
            field_type: field_type.to_string(),
            ..FieldDocument::default()
        }
    }

    fn doc(name: &str, kind: &str) -> SchemaDocument {
        SchemaDocument {
            table_name: name.to_string(),
            kind: kind.to_string(),
            fields: IndexMap::new(),
            count: None,
            parent: None,
            parent_key: None,
            count_per_parent: None,
            version_range: None,
            source_table: None,
            key: None,
            latest_field: None,
            records: None,
        }
    }

    fn build(doc: SchemaDocument) -> Result<TableSchema> {
        TableSchema::from_document(doc, &ValidationOptions::default())
    }

    #[test]
    fn master_requires_count() {
        let err = build(doc("users", "master")).unwrap_err();
        assert!(err.to_string().contains("count"), "{err}");

        let mut users = doc("users", "master");
        users.count = Some(3);
        let schema = build(users).expect("valid master");
        assert_eq!(schema.layout, TableLayout::Independent { count: 3 });
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = build(doc("users", "snapshot")).unwrap_err();
        assert!(err.to_string().contains("unknown table type"), "{err}");
    }

    #[test]
    fn child_layout_parses_ranges_and_keys() {
        let mut lines = doc("order_lines", "transactional");
        lines.parent = Some("orders".to_string());
        lines.parent_key = Some(KeyList::One("order_id".to_string()));
        lines.count_per_parent = Some(RangeDocument::Text("2~5".to_string()));
        lines.fields.insert("order_id".to_string(), field("uuid"));

        let schema = build(lines).expect("valid child");
        assert_eq!(
            schema.layout,
            TableLayout::Child {
                parent: "orders".to_string(),
                parent_key: vec!["order_id".to_string()],
                per_parent: CountRange { min: 2, max: 5 },
            }
        );
        assert_eq!(schema.parent(), Some("orders"));
    }

    #[test]
    fn malformed_version_range_is_rejected() {
        let mut products = doc("products", "immutable");
        products.count = Some(2);
        products.version_range = Some(RangeDocument::Text("3~x".to_string()));
        let err = build(products).unwrap_err();
        assert!(err.to_string().contains("version_range"), "{err}");
    }

    #[test]
    fn pointer_requires_source_key_and_latest_field() {
        let mut latest = doc("latest_products", "pointer");
        latest.source_table = Some("products".to_string());
        latest.key = Some(KeyList::Many(Vec::new()));
        latest.latest_field = Some("version".to_string());
        assert!(build(latest.clone()).is_err());

        latest.key = Some(KeyList::One("product_id".to_string()));
        latest.latest_field = None;
        let err = build(latest).unwrap_err();
        assert!(err.to_string().contains("latest_field"), "{err}");
    }

    #[test]
    fn field_requirements_are_checked() {
        let mut users = doc("users", "master");
        users.count = Some(1);
        users.fields.insert("owner".to_string(), field("ref"));
        assert!(build(users.clone()).is_err());

        users.fields.clear();
        users.fields.insert("code".to_string(), field("code"));
        assert!(build(users.clone()).is_err());

        users.fields.clear();
        let mut age = field("int");
        age.min = Some(10);
        age.max = Some(1);
        users.fields.insert("age".to_string(), age);
        assert!(build(users.clone()).is_err());

        users.fields.clear();
        let mut tags = field("const");
        tags.value = Some(json!(["a", "b"]));
        users.fields.insert("tags".to_string(), tags);
        assert!(build(users).is_err());
    }

    #[test]
    fn unrecognized_field_type_depends_on_strictness() {
        let mut users = doc("users", "master");
        users.count = Some(1);
        users.fields.insert("blob".to_string(), field("bytes"));

        let schema = build(users.clone()).expect("lenient build");
        assert_eq!(
            schema.fields[0].field_type,
            FieldType::Unrecognized {
                tag: "bytes".to_string()
            }
        );

        let strict = ValidationOptions { strict: true };
        assert!(TableSchema::from_document(users, &strict).is_err());
    }

    #[test]
    fn records_bypass_generation_attributes() {
        let mut statuses = doc("statuses", "master");
        let mut row = IndexMap::new();
        row.insert("code".to_string(), json!("ACTIVE"));
        row.insert("rank".to_string(), json!(1));
        statuses.records = Some(vec![row]);

        let schema = build(statuses).expect("records table");
        let TableLayout::Records { rows } = schema.layout else {
            panic!("expected records layout");
        };
        assert_eq!(rows[0].get("rank"), Some(&Literal::Int(1)));
    }

    #[test]
    fn records_cannot_add_columns_after_the_first_row() {
        let mut statuses = doc("statuses", "master");
        let mut first = IndexMap::new();
        first.insert("code".to_string(), json!("NEW"));
        first.insert("rank".to_string(), json!(1));
        let mut partial = IndexMap::new();
        partial.insert("code".to_string(), json!("DONE"));
        let mut widened = IndexMap::new();
        widened.insert("code".to_string(), json!("LOST"));
        widened.insert("reason".to_string(), json!("carrier"));

        statuses.records = Some(vec![first.clone(), partial.clone()]);
        assert!(build(statuses.clone()).is_ok());

        statuses.records = Some(vec![first, partial, widened]);
        let err = build(statuses).unwrap_err();
        assert!(err.to_string().contains("record 2: column 'reason'"), "{err}");
    }

    #[test]
    fn schema_set_checks_ref_and_pointer_columns() {
        let mut users = doc("users", "master");
        users.count = Some(1);
        users.fields.insert("id".to_string(), field("uuid"));
        let users = build(users).unwrap();

        let mut orders = doc("orders", "transactional");
        orders.count = Some(1);
        let mut owner = field("ref");
        owner.table = Some("users".to_string());
        owner.field = Some("email".to_string());
        orders.fields.insert("owner".to_string(), owner);
        let orders = build(orders).unwrap();

        let err = validate_schema_set(&[users.clone(), orders]).unwrap_err();
        assert!(err.to_string().contains("users.email"), "{err}");

        let mut latest = doc("latest_users", "pointer");
        latest.source_table = Some("users".to_string());
        latest.key = Some(KeyList::One("id".to_string()));
        latest.latest_field = Some("updated_at".to_string());
        let latest = build(latest).unwrap();
        let err = validate_schema_set(&[users, latest]).unwrap_err();
        assert!(err.to_string().contains("updated_at"), "{err}");
    }
}
