//! Per-pass field metadata cache.

use std::collections::HashMap;
use std::sync::Arc;

use super::SchemaGateway;
use crate::catalog::FieldDescriptor;
use crate::error::GatewayError;

/// Field descriptors fetched during one walk or merge pass, keyed by
/// collection. Failures are not cached.
#[derive(Debug, Default)]
pub struct FieldCache {
    entries: HashMap<String, Arc<Vec<FieldDescriptor>>>,
}

impl FieldCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields of `collection`, fetched from the gateway on first use.
    pub async fn get(
        &mut self,
        gateway: &dyn SchemaGateway,
        collection: &str,
    ) -> Result<Arc<Vec<FieldDescriptor>>, GatewayError> {
        if let Some(fields) = self.entries.get(collection) {
            return Ok(Arc::clone(fields));
        }

        let fields = Arc::new(gateway.list_fields(collection).await?);
        tracing::debug!(collection, count = fields.len(), "fields loaded");
        self.entries
            .insert(collection.to_string(), Arc::clone(&fields));
        Ok(fields)
    }

    /// Number of cached collections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
