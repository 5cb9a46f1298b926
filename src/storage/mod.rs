//! Record store: natural-key upsert and filtered reads.
//!
//! Each stage writes one table. A record's [`NaturalKey`] is its business
//! identity; writing the same key twice replaces the stored fields.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::errors::{StorageError, StorageWriteError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// Ordered `(field, value)` pairs identifying a record within its table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NaturalKey {
    parts: Vec<(String, String)>,
}

impl NaturalKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl ToString) -> Self {
        self.parts.push((field.to_string(), value.to_string()));
        self
    }

    pub fn parts(&self) -> &[(String, String)] {
        &self.parts
    }

    /// `field=value|field=value`, the stored form. `%`, `|` and `=` inside a
    /// field or value are percent-escaped so distinct keys never collide.
    pub fn canonical(&self) -> String {
        self.parts
            .iter()
            .map(|(field, value)| {
                format!("{}={}", escape_key_part(field), escape_key_part(value))
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}

fn escape_key_part(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', '|', '=']) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 6);
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '|' => escaped.push_str("%7C"),
            '=' => escaped.push_str("%3D"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// A structured record produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub table: &'static str,
    pub key: NaturalKey,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(table: &'static str, key: NaturalKey) -> Self {
        Self {
            table,
            key,
            fields: Map::new(),
        }
    }

    /// Set a field; `None` becomes JSON null.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// A record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub key: String,
    pub fields: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn u64_field(&self, field: &str) -> Option<u64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    OneOf(Vec<Value>),
}

/// Conjunction of field conditions. The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    conditions: Vec<(String, Condition)>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Eq(value.into())));
        self
    }

    /// Ignored when `values` is empty.
    pub fn one_of<V: Into<Value>>(mut self, field: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.conditions
                .push((field.to_string(), Condition::OneOf(values)));
        }
        self
    }

    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            let Some(actual) = fields.get(field) else {
                return false;
            };
            match condition {
                Condition::Eq(expected) => values_equal(actual, expected),
                Condition::OneOf(options) => options.iter().any(|o| values_equal(actual, o)),
            }
        })
    }
}

/// Numbers and their string forms compare equal so CLI filters like
/// `competition_id=9` match numeric fields.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
            a.to_string() == *b
        }
        _ => actual == expected,
    }
}

/// Persistence seam used by the stage runner and input selection.
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record identified by `key` in `table`.
    fn upsert(
        &self,
        table: &str,
        key: &NaturalKey,
        fields: &Map<String, Value>,
    ) -> Result<(), StorageWriteError>;

    /// Records of `table` matching `filter`, in first-insertion order.
    fn query(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_natural_key_canonical_form() {
        let key = NaturalKey::new()
            .with("competition_id", 9)
            .with("season", "2024-2025");
        assert_eq!(key.canonical(), "competition_id=9|season=2024-2025");
    }

    #[test]
    fn test_natural_key_separators_do_not_collide() {
        let piped = NaturalKey::new().with("team", "a|season=b");
        let split = NaturalKey::new().with("team", "a").with("season", "b");
        assert_ne!(piped.canonical(), split.canonical());
        assert_eq!(piped.canonical(), "team=a%7Cseason%3Db");

        let literal = NaturalKey::new().with("team", "a%7Cb");
        assert_ne!(literal.canonical(), NaturalKey::new().with("team", "a|b").canonical());
    }

    #[test]
    fn test_filter_matches_numbers_and_strings() {
        let fields = json!({"competition_id": 9, "season": "2024-2025"})
            .as_object()
            .cloned()
            .unwrap();

        assert!(RecordFilter::all().matches(&fields));
        assert!(RecordFilter::all().eq("competition_id", "9").matches(&fields));
        assert!(RecordFilter::all()
            .one_of("season", ["2023-2024", "2024-2025"])
            .matches(&fields));
        assert!(!RecordFilter::all().eq("season", "2023-2024").matches(&fields));
        assert!(!RecordFilter::all().eq("missing", 1).matches(&fields));
        assert!(RecordFilter::all()
            .one_of("season", Vec::<String>::new())
            .matches(&fields));
    }

    #[test]
    fn test_record_set_accepts_options() {
        let mut record = Record::new("season", NaturalKey::new().with("season", "2020"));
        record.set("champion", Some("Liverpool")).set("points", None::<i64>);
        assert_eq!(record.get_str("champion"), Some("Liverpool"));
        assert_eq!(record.fields["points"], Value::Null);
    }
}
