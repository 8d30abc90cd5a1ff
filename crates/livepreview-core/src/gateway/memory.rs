//! In-memory schema gateway backed by a JSON snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SchemaGateway;
use crate::catalog::{FieldDescriptor, Relation};
use crate::config::DEFAULT_ID_FIELD;
use crate::error::GatewayError;
use crate::value::{Item, ItemId};

/// Serialized schema and item store.
///
/// Items are stored already expanded; the memory gateway ignores the
/// requested expansion depth and returns them as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Relation descriptors.
    pub relations: Vec<Relation>,
    /// Field descriptors per collection.
    pub fields: BTreeMap<String, Vec<FieldDescriptor>>,
    /// Items per collection, including junction rows.
    pub items: BTreeMap<String, Vec<Item>>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Add plain fields to a collection.
    pub fn with_fields<I, S>(mut self, collection: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.fields.entry(collection.to_string()).or_default();
        entry.extend(
            fields
                .into_iter()
                .map(|field| FieldDescriptor::new(collection, field)),
        );
        self
    }

    /// Add a field descriptor.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields
            .entry(field.collection.clone())
            .or_default()
            .push(field);
        self
    }

    /// Add an item. Values that are not JSON objects are ignored.
    pub fn with_item(mut self, collection: &str, item: Value) -> Self {
        if let Value::Object(item) = item {
            self.items.entry(collection.to_string()).or_default().push(item);
        }
        self
    }
}

/// A recorded gateway request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ListRelations,
    ListFields(String),
    FetchItem {
        collection: String,
        id: ItemId,
        depth: u8,
    },
    FetchJunctionRow {
        junction: String,
        id: ItemId,
    },
}

/// Schema gateway answering from a [`Snapshot`].
///
/// Every request is recorded; individual collections and items can be made
/// to fail.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    relations: Vec<Relation>,
    fields: HashMap<String, Vec<FieldDescriptor>>,
    items: HashMap<String, HashMap<ItemId, Item>>,
    failing_relations: bool,
    failing_fields: HashSet<String>,
    failing_items: HashSet<(String, ItemId)>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl MemoryGateway {
    /// Create a gateway from a snapshot. Items without an id are dropped.
    pub fn new(snapshot: Snapshot) -> Self {
        let mut items: HashMap<String, HashMap<ItemId, Item>> = HashMap::new();
        for (collection, rows) in snapshot.items {
            let by_id = items.entry(collection.clone()).or_default();
            for row in rows {
                match row.get(DEFAULT_ID_FIELD).and_then(ItemId::from_value) {
                    Some(id) => {
                        by_id.insert(id, row);
                    }
                    None => {
                        tracing::warn!(collection = %collection, "snapshot item without id skipped");
                    }
                }
            }
        }

        Self {
            relations: snapshot.relations,
            fields: snapshot.fields.into_iter().collect(),
            items,
            ..Self::default()
        }
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Fail every `list_relations` call.
    pub fn with_failing_relations(mut self) -> Self {
        self.failing_relations = true;
        self
    }

    /// Fail `list_fields` for a collection.
    pub fn with_failing_fields(mut self, collection: impl Into<String>) -> Self {
        self.failing_fields.insert(collection.into());
        self
    }

    /// Fail fetches of one item or junction row.
    pub fn with_failing_item(mut self, collection: impl Into<String>, id: impl Into<ItemId>) -> Self {
        self.failing_items.insert((collection.into(), id.into()));
        self
    }

    /// Requests recorded so far.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Number of `fetch_item` requests recorded so far.
    pub fn item_fetches(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, GatewayCall::FetchItem { .. }))
            .count()
    }

    /// Forget recorded requests.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn lookup(&self, collection: &str, id: &ItemId) -> Result<Item, GatewayError> {
        if self
            .failing_items
            .contains(&(collection.to_string(), id.clone()))
        {
            return Err(GatewayError::Unavailable(format!(
                "{} {} is unavailable",
                collection, id
            )));
        }

        self.items
            .get(collection)
            .and_then(|rows| rows.get(id))
            .cloned()
            .ok_or(GatewayError::NotFound)
    }
}

#[async_trait]
impl SchemaGateway for MemoryGateway {
    async fn list_relations(&self) -> Result<Vec<Relation>, GatewayError> {
        self.record(GatewayCall::ListRelations);
        if self.failing_relations {
            return Err(GatewayError::Unavailable("relations are unavailable".into()));
        }
        Ok(self.relations.clone())
    }

    async fn list_fields(&self, collection: &str) -> Result<Vec<FieldDescriptor>, GatewayError> {
        self.record(GatewayCall::ListFields(collection.to_string()));
        if self.failing_fields.contains(collection) {
            return Err(GatewayError::Unavailable(format!(
                "fields of {} are unavailable",
                collection
            )));
        }
        self.fields
            .get(collection)
            .cloned()
            .ok_or(GatewayError::NotFound)
    }

    async fn fetch_item(
        &self,
        collection: &str,
        id: &ItemId,
        depth: u8,
    ) -> Result<Item, GatewayError> {
        self.record(GatewayCall::FetchItem {
            collection: collection.to_string(),
            id: id.clone(),
            depth,
        });
        self.lookup(collection, id)
    }

    async fn fetch_junction_row(
        &self,
        junction: &str,
        id: &ItemId,
    ) -> Result<Item, GatewayError> {
        self.record(GatewayCall::FetchJunctionRow {
            junction: junction.to_string(),
            id: id.clone(),
        });
        self.lookup(junction, id)
    }
}
