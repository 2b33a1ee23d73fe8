use std::fs;
use std::path::{Path, PathBuf};

use tablecraft_core::{
    DocumentFormat, Error, FieldType, Literal, TableKind, TableLayout, ValidationOptions,
    load_schema_dir, parse_schema_document, resolve_generation_order, validate_schema_set,
};

fn retail_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/retail")
}

fn temp_schema_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!("tablecraft_core_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp schema dir");
    dir
}

#[test]
fn loads_retail_schemas_sorted_by_file_name() {
    let schemas =
        load_schema_dir(&retail_dir(), &ValidationOptions::default()).expect("load schemas");
    let names: Vec<&str> = schemas.iter().map(|schema| schema.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "customers",
            "latest_products",
            "order_lines",
            "order_statuses",
            "orders",
            "product_revisions",
            "products",
        ]
    );

    let latest = schemas
        .iter()
        .find(|schema| schema.name == "latest_products")
        .expect("pointer schema");
    assert_eq!(latest.kind, TableKind::Pointer);
    assert!(matches!(
        &latest.layout,
        TableLayout::Pointer { key, latest_field, .. }
            if key == &vec!["product_id".to_string()] && latest_field == "version"
    ));
}

#[test]
fn retail_schemas_resolve_and_cross_validate() {
    let schemas =
        load_schema_dir(&retail_dir(), &ValidationOptions::default()).expect("load schemas");
    let ordered = resolve_generation_order(schemas).expect("resolve order");
    validate_schema_set(&ordered).expect("cross-table validation");

    let position = |name: &str| {
        ordered
            .iter()
            .position(|schema| schema.name == name)
            .unwrap_or_else(|| panic!("missing {name}"))
    };
    assert!(position("products") < position("latest_products"));
    assert!(position("latest_products") < position("order_lines"));
    assert!(position("orders") < position("order_lines"));
    assert!(position("order_statuses") < position("orders"));
    assert!(position("customers") < position("orders"));
    assert!(position("products") < position("product_revisions"));
}

#[test]
fn field_declaration_order_is_preserved() {
    let text = r#"
table_name: events
type: transactional
count: 2
fields:
  zeta: { type: uuid }
  alpha: { type: int, min: 1, max: 2 }
  mid: { type: timestamp, from: -7d, to: now }
"#;
    let schema = parse_schema_document(
        text,
        DocumentFormat::Yaml,
        "events.yaml",
        &ValidationOptions::default(),
    )
    .expect("parse events");
    let names: Vec<&str> = schema.fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(schema.fields[1].field_type, FieldType::Int { min: 1, max: 2 });
}

#[test]
fn explicit_null_default_and_value_are_kept() {
    let text = r#"
table_name: readings
type: master
count: 5
fields:
  n: { type: int, default: null }
  note: { type: const, value: null }
  plain: { type: int }
"#;
    let schema = parse_schema_document(
        text,
        DocumentFormat::Yaml,
        "readings.yaml",
        &ValidationOptions::default(),
    )
    .expect("parse readings");
    assert_eq!(schema.fields[0].default, Some(Literal::Null));
    assert_eq!(
        schema.fields[1].field_type,
        FieldType::Const {
            value: Literal::Null
        }
    );
    assert_eq!(schema.fields[2].default, None);

    let missing_value = r#"{"table_name": "t", "type": "master", "count": 1,
        "fields": {"c": {"type": "const"}}}"#;
    let err = parse_schema_document(
        missing_value,
        DocumentFormat::Json,
        "t.json",
        &ValidationOptions::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("const requires 'value'"), "{err}");
}

#[test]
fn unknown_document_keys_are_rejected() {
    let text = r#"{"table_name": "t", "type": "master", "count": 1, "colour": "red"}"#;
    let err = parse_schema_document(
        text,
        DocumentFormat::Json,
        "t.json",
        &ValidationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Json { .. }), "{err}");
}

#[test]
fn cyclic_directory_fails_to_resolve() {
    let dir = temp_schema_dir("cycle");
    fs::write(
        dir.join("a.yaml"),
        "table_name: a\ntype: master\ncount: 1\nfields:\n  b_id: { type: ref, table: b, field: id }\n",
    )
    .expect("write a");
    fs::write(
        dir.join("b.yaml"),
        "table_name: b\ntype: master\ncount: 1\nfields:\n  a_id: { type: ref, table: a, field: id }\n",
    )
    .expect("write b");
    fs::write(dir.join("notes.txt"), "ignored").expect("write notes");

    let schemas = load_schema_dir(&dir, &ValidationOptions::default()).expect("load");
    assert_eq!(schemas.len(), 2);
    let err = resolve_generation_order(schemas).unwrap_err();
    assert!(matches!(err, Error::CyclicDependency { .. }), "{err}");
}
