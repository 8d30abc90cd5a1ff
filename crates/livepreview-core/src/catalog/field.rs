//! Field metadata for collections.

use serde::{Deserialize, Serialize};

/// Schema metadata for one field of one collection.
///
/// The relation hint is read from `relation_hint`, a top-level
/// `foreign_key_table`, or the store's nested `schema.foreign_key_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldDescriptor")]
pub struct FieldDescriptor {
    /// Owning collection.
    pub collection: String,
    /// Field name.
    pub field: String,
    /// Foreign table the field points at, when the store reports one.
    pub relation_hint: Option<String>,
}

/// Column schema reported alongside a field.
#[derive(Debug, Default, Deserialize)]
struct ColumnSchema {
    #[serde(default)]
    foreign_key_table: Option<String>,
}

#[derive(Deserialize)]
struct RawFieldDescriptor {
    collection: String,
    field: String,
    #[serde(default, alias = "foreign_key_table")]
    relation_hint: Option<String>,
    #[serde(default)]
    schema: Option<ColumnSchema>,
}

impl From<RawFieldDescriptor> for FieldDescriptor {
    fn from(raw: RawFieldDescriptor) -> Self {
        let relation_hint = raw
            .relation_hint
            .or_else(|| raw.schema.and_then(|schema| schema.foreign_key_table));
        Self {
            collection: raw.collection,
            field: raw.field,
            relation_hint,
        }
    }
}

impl FieldDescriptor {
    /// Create a field descriptor without a relation hint.
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            relation_hint: None,
        }
    }

    /// Set the relation hint.
    pub fn with_relation_hint(mut self, table: impl Into<String>) -> Self {
        self.relation_hint = Some(table.into());
        self
    }
}
