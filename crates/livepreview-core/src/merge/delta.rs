//! Draft values as submitted by the form layer.

use serde::Deserialize;
use serde_json::Value;

use crate::value::{Item, ItemId};

/// Submitted value of a many-to-one field.
#[derive(Debug, Clone, PartialEq)]
pub enum ManyToOneValue {
    /// Reference to a persisted item.
    Ref(ItemId),
    /// An unsaved related item, submitted inline.
    Inline(Item),
}

impl ManyToOneValue {
    /// Read a raw form value. `None` when the form holds no value (absent,
    /// null, or something that is neither an id nor an object).
    pub fn from_form(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Object(item) => Some(Self::Inline(item.clone())),
            other => ItemId::from_value(other).map(Self::Ref),
        }
    }
}

/// Pending create/update/delete operations on a relational field.
///
/// A missing key means no operation of that kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelationDelta {
    /// New rows, or envelopes referencing rows to attach.
    pub create: Vec<Value>,
    /// Partial rows keyed by id.
    pub update: Vec<Value>,
    /// Ids (or junction row ids) to remove.
    pub delete: Vec<ItemId>,
}

impl RelationDelta {
    /// Decode the raw form value of a relational field. Absent or null means
    /// the field has no delta.
    pub fn from_form(value: Option<&Value>) -> Result<Option<Self>, String> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| e.to_string()),
            Some(other) => Err(format!(
                "expected an object with create/update/delete, found {}",
                other
            )),
        }
    }

    /// Check if the delta carries no operation.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}
