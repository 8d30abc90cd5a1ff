//! Schema gateway: the metadata and item store the preview reads from.
//!
//! The preview never writes. It lists relations once per schema snapshot,
//! lists fields per collection (cached for one pass), and fetches persisted
//! items and junction rows when a draft points at them.

mod cache;
mod memory;

use async_trait::async_trait;

use crate::catalog::{FieldDescriptor, Relation};
use crate::error::GatewayError;
use crate::value::{Item, ItemId};

pub use cache::FieldCache;
pub use memory::{GatewayCall, MemoryGateway, Snapshot};

/// Read access to schema metadata and persisted items.
#[async_trait]
pub trait SchemaGateway: Send + Sync {
    /// All relation descriptors of the active schema.
    async fn list_relations(&self) -> Result<Vec<Relation>, GatewayError>;

    /// Field metadata of one collection.
    async fn list_fields(&self, collection: &str) -> Result<Vec<FieldDescriptor>, GatewayError>;

    /// One persisted item with related fields expanded `depth` levels deep.
    async fn fetch_item(
        &self,
        collection: &str,
        id: &ItemId,
        depth: u8,
    ) -> Result<Item, GatewayError>;

    /// One junction row of a many-to-many or many-to-any relation.
    async fn fetch_junction_row(&self, junction: &str, id: &ItemId)
        -> Result<Item, GatewayError>;
}
