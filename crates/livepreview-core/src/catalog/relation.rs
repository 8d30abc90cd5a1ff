//! Relation descriptors between collections.

use serde::{Deserialize, Serialize};

/// Descriptive metadata attached to a relation.
///
/// Every key is optional; a plain foreign key only carries the
/// `many_*`/`one_*` pairs, a junction relation additionally carries
/// `junction_field`, and a many-to-any relation carries
/// `one_allowed_collections`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationMeta {
    /// Collection on the "one" side.
    pub one_collection: Option<String>,
    /// Alias field on the "one" side listing the related rows.
    pub one_field: Option<String>,
    /// Collection holding the foreign key.
    pub many_collection: Option<String>,
    /// Foreign key field on the "many" side.
    pub many_field: Option<String>,
    /// Field on a junction collection pointing at the other side.
    pub junction_field: Option<String>,
    /// Collections a polymorphic relation may point at.
    pub one_allowed_collections: Option<Vec<String>>,
    /// Field on a polymorphic junction naming the target collection of a row.
    pub one_collection_field: Option<String>,
}

/// A relation definition between two collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Source collection (the one holding the foreign key).
    pub collection: String,
    /// Foreign key field on the source collection.
    pub field: String,
    /// Target collection. Absent for polymorphic relations.
    #[serde(default)]
    pub related_collection: Option<String>,
    /// Relation metadata.
    #[serde(default)]
    pub meta: Option<RelationMeta>,
}

impl Relation {
    /// Create a relation without metadata.
    pub fn new(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field: field.into(),
            related_collection: None,
            meta: None,
        }
    }

    /// Create a many-to-one foreign key `collection.field -> related`, with
    /// an optional alias field on the related side.
    pub fn many_to_one(
        collection: impl Into<String>,
        field: impl Into<String>,
        related: impl Into<String>,
        one_field: Option<&str>,
    ) -> Self {
        let collection = collection.into();
        let field = field.into();
        let related = related.into();
        Self {
            meta: Some(RelationMeta {
                one_collection: Some(related.clone()),
                one_field: one_field.map(String::from),
                many_collection: Some(collection.clone()),
                many_field: Some(field.clone()),
                ..RelationMeta::default()
            }),
            collection,
            field,
            related_collection: Some(related),
        }
    }

    /// Set the related collection.
    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related_collection = Some(related.into());
        self
    }

    /// Set the relation metadata.
    pub fn with_meta(mut self, meta: RelationMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Set the junction field, turning this into one half of a junction pair.
    pub fn with_junction_field(mut self, junction_field: impl Into<String>) -> Self {
        self.meta.get_or_insert_with(RelationMeta::default).junction_field =
            Some(junction_field.into());
        self
    }

    /// Metadata, or an empty set when the relation has none.
    pub fn meta(&self) -> &RelationMeta {
        static EMPTY: RelationMeta = RelationMeta {
            one_collection: None,
            one_field: None,
            many_collection: None,
            many_field: None,
            junction_field: None,
            one_allowed_collections: None,
            one_collection_field: None,
        };
        self.meta.as_ref().unwrap_or(&EMPTY)
    }

    /// Alias field on the related side (`meta.one_field`).
    pub fn one_field(&self) -> Option<&str> {
        self.meta().one_field.as_deref()
    }

    /// Junction field, when this relation is part of a junction pair.
    pub fn junction_field(&self) -> Option<&str> {
        self.meta().junction_field.as_deref()
    }

    /// Collections a polymorphic relation may point at.
    pub fn allowed_collections(&self) -> Option<&[String]> {
        self.meta().one_allowed_collections.as_deref()
    }

    /// Junction key naming each polymorphic row's collection.
    pub fn collection_field(&self) -> Option<&str> {
        self.meta().one_collection_field.as_deref()
    }

    /// Whether the relation touches `collection` as source or target.
    pub fn touches_collection(&self, collection: &str) -> bool {
        self.collection == collection || self.related_collection.as_deref() == Some(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_one_relation() {
        let rel = Relation::many_to_one("posts", "author", "users", Some("posts"));

        assert_eq!(rel.related_collection.as_deref(), Some("users"));
        assert_eq!(rel.meta().many_collection.as_deref(), Some("posts"));
        assert_eq!(rel.meta().many_field.as_deref(), Some("author"));
        assert_eq!(rel.one_field(), Some("posts"));
        assert!(rel.junction_field().is_none());
    }

    #[test]
    fn test_missing_meta_reads_as_empty() {
        let rel = Relation::new("posts", "legacy");

        assert!(rel.meta.is_none());
        assert!(rel.one_field().is_none());
        assert!(rel.allowed_collections().is_none());
    }

    #[test]
    fn test_deserialize_relation() {
        let rel: Relation = serde_json::from_value(serde_json::json!({
            "collection": "pages_blocks",
            "field": "item",
            "related_collection": null,
            "meta": {
                "one_field": null,
                "junction_field": "pages_id",
                "one_allowed_collections": ["hero", "gallery"],
                "one_collection_field": "collection",
                "sort_field": null
            }
        }))
        .unwrap();

        assert_eq!(rel.collection, "pages_blocks");
        assert!(rel.related_collection.is_none());
        assert_eq!(rel.junction_field(), Some("pages_id"));
        assert_eq!(
            rel.allowed_collections(),
            Some(&["hero".to_string(), "gallery".to_string()][..])
        );
        assert_eq!(rel.collection_field(), Some("collection"));
    }

    #[test]
    fn test_touches_collection() {
        let rel = Relation::many_to_one("posts", "author", "users", None);

        assert!(rel.touches_collection("posts"));
        assert!(rel.touches_collection("users"));
        assert!(!rel.touches_collection("tags"));
    }
}
