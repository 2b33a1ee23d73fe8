use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw table document as authored on disk, one per table.
///
/// Documents are loosely typed on purpose; [`crate::validation`] turns them
/// into a [`crate::TableSchema`] and rejects anything structurally invalid
/// before generation begins.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    /// Name of the generated table and of its output file.
    pub table_name: String,
    /// Lifecycle kind: `master`, `immutable`, `transactional` or `pointer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Field definitions in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldDocument>,
    /// Number of rows (or logical entities for immutable tables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Parent table; children are generated per parent row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Child fields copied verbatim from the parent row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<KeyList>,
    /// Children per parent row, `"a"` or `"a~b"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_per_parent: Option<RangeDocument>,
    /// Versions per immutable entity, `"a"` or `"a~b"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<RangeDocument>,
    /// Source table of a pointer view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    /// Grouping key of a pointer view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyList>,
    /// Field whose maximum selects the latest row of a pointer group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_field: Option<String>,
    /// Literal fixture rows emitted as-is instead of generated rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<IndexMap<String, Value>>>,
}

/// Raw field definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// Present even when explicitly `null`; absent only if the key is missing.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Window start for `date`/`timestamp`, e.g. `-1y`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Window end for `date`/`timestamp`, e.g. `today`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing key falls back
/// to `None` through `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A single key or a list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KeyList {
    One(String),
    Many(Vec<String>),
}

impl KeyList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            KeyList::One(key) => vec![key],
            KeyList::Many(keys) => keys,
        }
    }
}

/// Range attribute; accepts a bare count or a `"a~b"` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RangeDocument {
    Exact(u64),
    Text(String),
}
