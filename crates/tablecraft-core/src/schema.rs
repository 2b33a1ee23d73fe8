use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{CodePattern, CountRange, DateWindow, Literal};

/// Validated table definition, constructed once at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub kind: TableKind,
    /// Fields in declaration order.
    pub fields: Vec<FieldDef>,
    pub layout: TableLayout,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn parent(&self) -> Option<&str> {
        match &self.layout {
            TableLayout::Child { parent, .. } => Some(parent),
            _ => None,
        }
    }
}

/// Lifecycle kind of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Master,
    Immutable,
    Transactional,
    Pointer,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Master => "master",
            TableKind::Immutable => "immutable",
            TableKind::Transactional => "transactional",
            TableKind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "master" => Ok(TableKind::Master),
            "immutable" => Ok(TableKind::Immutable),
            "transactional" => Ok(TableKind::Transactional),
            "pointer" => Ok(TableKind::Pointer),
            other => Err(format!("unknown table type '{other}'")),
        }
    }
}

/// Generation strategy selected from the kind and the attributes present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TableLayout {
    /// `count` independent rows (master and parent-less transactional).
    Independent { count: u64 },
    /// `count` entities, each emitted once per version.
    Versioned { count: u64, versions: CountRange },
    /// Rows generated per parent row (transactional or immutable with `parent`).
    Child {
        parent: String,
        parent_key: Vec<String>,
        per_parent: CountRange,
    },
    /// Latest row per key group of `source_table`.
    Pointer {
        source_table: String,
        key: Vec<String>,
        latest_field: String,
    },
    /// Literal fixture rows.
    Records { rows: Vec<IndexMap<String, Literal>> },
}

/// Validated field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub nullable: bool,
    pub default: Option<Literal>,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            nullable: false,
            default: None,
            field_type,
        }
    }

    pub fn is_version_sequence(&self) -> bool {
        matches!(self.field_type, FieldType::VersionSequence)
    }
}

/// Per-field synthesis rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Uuid,
    Const { value: Literal },
    Int { min: i64, max: i64 },
    Date { window: DateWindow },
    Timestamp { window: DateWindow },
    Ref { table: String, field: String },
    Code { pattern: CodePattern },
    VersionSequence,
    AutoIncrement,
    /// Tag accepted in lenient mode; always synthesizes null.
    Unrecognized { tag: String },
}

impl FieldType {
    pub fn tag(&self) -> &str {
        match self {
            FieldType::Uuid => "uuid",
            FieldType::Const { .. } => "const",
            FieldType::Int { .. } => "int",
            FieldType::Date { .. } => "date",
            FieldType::Timestamp { .. } => "timestamp",
            FieldType::Ref { .. } => "ref",
            FieldType::Code { .. } => "code",
            FieldType::VersionSequence => "version_sequence",
            FieldType::AutoIncrement => "auto_increment",
            FieldType::Unrecognized { tag } => tag,
        }
    }
}
