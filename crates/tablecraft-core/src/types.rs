use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SECONDS_PER_DAY: i64 = 86_400;

/// Scalar literal authored in a schema (`default`, `value`, fixture cells).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    /// Convert a parsed document value; `None` for arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Literal::Null),
            Value::Bool(value) => Some(Literal::Bool(*value)),
            Value::Number(number) => number
                .as_i64()
                .map(Literal::Int)
                .or_else(|| number.as_f64().map(Literal::Float)),
            Value::String(value) => Some(Literal::Text(value.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Inclusive `[min, max]` range parsed from `"a"` or `"a~b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u64,
    pub max: u64,
}

impl CountRange {
    pub const ONE: CountRange = CountRange { min: 1, max: 1 };

    pub fn exact(count: u64) -> Self {
        Self {
            min: count,
            max: count,
        }
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let parse_bound = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid range '{text}': '{}' is not a count", part.trim()))
        };

        let range = match text.split_once('~') {
            None => Self::exact(parse_bound(text)?),
            Some((min, max)) => Self {
                min: parse_bound(min)?,
                max: parse_bound(max)?,
            },
        };

        if range.min > range.max {
            return Err(format!("invalid range '{text}': min must be <= max"));
        }
        Ok(range)
    }
}

impl fmt::Display for CountRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}~{}", self.min, self.max)
        }
    }
}

/// Offset from the run anchor, e.g. `-1y`, `+30d`, `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelativeOffset {
    pub seconds: i64,
}

impl RelativeOffset {
    pub const NOW: RelativeOffset = RelativeOffset { seconds: 0 };
    pub const ONE_YEAR_AGO: RelativeOffset = RelativeOffset {
        seconds: -365 * SECONDS_PER_DAY,
    };

    /// Parse `[+-]<n><unit>` with units `y` (365 days), `w`, `d`, `h`, `m`, `s`,
    /// or one of the aliases `now`, `today`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        if matches!(trimmed, "now" | "today" | "0") {
            return Ok(Self::NOW);
        }

        let (sign, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (-1, &trimmed[1..]),
            Some(b'+') => (1, &trimmed[1..]),
            _ => (1, trimmed),
        };
        let Some(unit) = body.chars().last() else {
            return Err(format!("invalid relative offset '{text}'"));
        };
        let amount: i64 = body[..body.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| format!("invalid relative offset '{text}'"))?;
        let unit_seconds = match unit {
            'y' => 365 * SECONDS_PER_DAY,
            'w' => 7 * SECONDS_PER_DAY,
            'd' => SECONDS_PER_DAY,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return Err(format!("invalid relative offset '{text}': unknown unit '{unit}'")),
        };

        amount
            .checked_mul(unit_seconds)
            .and_then(|seconds| seconds.checked_mul(sign))
            .map(|seconds| Self { seconds })
            .ok_or_else(|| format!("relative offset '{text}' is out of range"))
    }

    pub fn apply(self, anchor: NaiveDateTime) -> NaiveDateTime {
        Duration::try_seconds(self.seconds)
            .and_then(|offset| anchor.checked_add_signed(offset))
            .unwrap_or(anchor)
    }
}

/// Relative window a `date`/`timestamp` field samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: RelativeOffset,
    pub to: RelativeOffset,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            from: RelativeOffset::ONE_YEAR_AGO,
            to: RelativeOffset::NOW,
        }
    }
}

impl DateWindow {
    pub fn new(from: RelativeOffset, to: RelativeOffset) -> Result<Self, String> {
        if from >= to {
            return Err("window start must be before window end".to_string());
        }
        Ok(Self { from, to })
    }

    /// Absolute `(start, end)` bounds for a given anchor.
    pub fn resolve(&self, anchor: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        (self.from.apply(anchor), self.to.apply(anchor))
    }
}

/// Token of a `code` template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeToken {
    Literal(String),
    /// `{date:<strftime>}`
    Date(String),
    /// `{seq:<width>}`
    Seq { width: usize },
    /// `{alpha}`
    Alpha,
    /// Any other placeholder; renders as `<UNKNOWN:token>`.
    Unknown(String),
}

/// Parsed `code` template. `source` keys the shared sequence counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePattern {
    pub source: String,
    pub tokens: Vec<CodeToken>,
}

impl CodePattern {
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let mut tokens = Vec::new();
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                break;
            };
            if open > 0 {
                tokens.push(CodeToken::Literal(rest[..open].to_string()));
            }
            tokens.push(parse_token(&after[..close])?);
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            tokens.push(CodeToken::Literal(rest.to_string()));
        }

        Ok(Self {
            source: pattern.to_string(),
            tokens,
        })
    }
}

fn parse_token(token: &str) -> Result<CodeToken, String> {
    if let Some(format) = token.strip_prefix("date:") {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid date format '{format}' in code token"));
        }
        return Ok(CodeToken::Date(format.to_string()));
    }
    if let Some(width) = token.strip_prefix("seq:") {
        let width = width
            .parse::<usize>()
            .map_err(|_| format!("invalid sequence width '{width}' in code token"))?;
        return Ok(CodeToken::Seq { width });
    }
    if token == "alpha" {
        return Ok(CodeToken::Alpha);
    }
    Ok(CodeToken::Unknown(token.to_string()))
}
