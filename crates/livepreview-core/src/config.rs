//! Preview engine configuration.

/// Default relation expansion depth requested when fetching related items.
pub const DEFAULT_EXPANSION_DEPTH: u8 = 5;

/// Default key tagging many-to-any items with their collection.
pub const DEFAULT_COLLECTION_TAG: &str = "__typename";

/// Default sort attribute on related rows.
pub const DEFAULT_SORT_FIELD: &str = "sort";

/// Default primary key attribute.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Preview engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    /// Depth of related fields expanded by `fetch_item`.
    pub expansion_depth: u8,

    /// Key added to many-to-any items naming their collection.
    pub collection_tag: String,

    /// Attribute ordering one-to-many and many-to-any sequences.
    pub sort_field: String,

    /// Primary key attribute of items.
    pub id_field: String,

    /// Fields skipped during field path discovery.
    pub ignored_fields: Vec<String>,
}

impl PreviewConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            expansion_depth: DEFAULT_EXPANSION_DEPTH,
            collection_tag: DEFAULT_COLLECTION_TAG.to_string(),
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            ignored_fields: Vec::new(),
        }
    }

    /// Set the expansion depth.
    pub fn with_expansion_depth(mut self, depth: u8) -> Self {
        self.expansion_depth = depth;
        self
    }

    /// Set the collection tag key.
    pub fn with_collection_tag(mut self, tag: impl Into<String>) -> Self {
        self.collection_tag = tag.into();
        self
    }

    /// Set the sort attribute.
    pub fn with_sort_field(mut self, field: impl Into<String>) -> Self {
        self.sort_field = field.into();
        self
    }

    /// Set the primary key attribute.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Skip a field during field path discovery.
    pub fn with_ignored_field(mut self, field: impl Into<String>) -> Self {
        self.ignored_fields.push(field.into());
        self
    }

    /// Check if a field is skipped during field path discovery.
    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored_fields.iter().any(|f| f == field)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self::new()
    }
}
