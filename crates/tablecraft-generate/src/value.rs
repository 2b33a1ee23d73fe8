use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

use tablecraft_core::Literal;

/// A generated row; insertion order is field declaration order.
pub type Row = IndexMap<String, GeneratedValue>;

/// Generated scalar value for a field.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn to_csv(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Total order used to pick the latest row of a pointer group.
    ///
    /// Values of different families order as null < bool < number < text <
    /// date/time; numbers compare numerically and dates chronologically.
    pub fn compare(&self, other: &GeneratedValue) -> Ordering {
        match (self, other) {
            (GeneratedValue::Int(a), GeneratedValue::Int(b)) => a.cmp(b),
            (GeneratedValue::Bool(a), GeneratedValue::Bool(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => match (self.as_datetime(), other.as_datetime()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    _ => match (self.as_str(), other.as_str()) {
                        (Some(a), Some(b)) => a.cmp(b),
                        _ => self.family_rank().cmp(&other.family_rank()),
                    },
                },
            },
        }
    }

    /// Stable grouping key; equal keys mean equal values.
    pub fn group_key(&self) -> String {
        let family = match self {
            GeneratedValue::Null => "null",
            GeneratedValue::Bool(_) => "bool",
            GeneratedValue::Int(_) | GeneratedValue::Float(_) => "number",
            GeneratedValue::Text(_) | GeneratedValue::Uuid(_) => "text",
            GeneratedValue::Date(_) => "date",
            GeneratedValue::Timestamp(_) => "timestamp",
        };
        format!("{family}:{}", self.to_csv())
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            GeneratedValue::Date(value) => Some(value.and_time(NaiveTime::MIN)),
            GeneratedValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    fn family_rank(&self) -> u8 {
        match self {
            GeneratedValue::Null => 0,
            GeneratedValue::Bool(_) => 1,
            GeneratedValue::Int(_) | GeneratedValue::Float(_) => 2,
            GeneratedValue::Text(_) | GeneratedValue::Uuid(_) => 3,
            GeneratedValue::Date(_) | GeneratedValue::Timestamp(_) => 4,
        }
    }
}

impl From<&Literal> for GeneratedValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => GeneratedValue::Null,
            Literal::Bool(value) => GeneratedValue::Bool(*value),
            Literal::Int(value) => GeneratedValue::Int(*value),
            Literal::Float(value) => GeneratedValue::Float(*value),
            Literal::Text(value) => GeneratedValue::Text(value.clone()),
        }
    }
}
