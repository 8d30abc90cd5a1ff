//! Item values and identifiers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// An item: a keyed mapping of field names to JSON values.
pub type Item = Map<String, Value>;

/// Identifier of a persisted item or junction row.
///
/// Ids arrive as JSON numbers or strings depending on the collection's key
/// type; both are kept in canonical text form so `5` and `"5"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    /// Create an id from its text form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Read an id from a JSON scalar. Null, booleans, arrays and objects are
    /// not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Text form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ItemId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("expected an item id, found {}", value)))
    }
}

/// Persisted id of a row: the row's id attribute when it is an object, or the
/// row itself when it is a bare id.
pub fn row_id(row: &Value, id_field: &str) -> Option<ItemId> {
    match row {
        Value::Object(map) => map.get(id_field).and_then(ItemId::from_value),
        other => ItemId::from_value(other),
    }
}

/// Sort position of a row. Missing or non-numeric positions sort as 0.
pub fn sort_key(row: &Value, sort_field: &str) -> f64 {
    row.get(sort_field).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Stable ascending sort by position.
pub fn sort_rows(rows: &mut [Value], sort_field: &str) {
    rows.sort_by(|a, b| sort_key(a, sort_field).total_cmp(&sort_key(b, sort_field)));
}
