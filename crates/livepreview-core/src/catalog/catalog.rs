//! In-memory index over the relation descriptors of one schema snapshot.

use super::Relation;
use crate::gateway::SchemaGateway;

/// Read-only relation index for a schema snapshot.
#[derive(Debug, Clone, Default)]
pub struct RelationCatalog {
    relations: Vec<Relation>,
}

impl RelationCatalog {
    /// Build a catalog from relation descriptors.
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// Load every relation from the gateway.
    ///
    /// A failing gateway yields an empty catalog: every field then classifies
    /// as non-relational and the preview degrades to plain value replacement.
    pub async fn load(gateway: &dyn SchemaGateway) -> Self {
        match gateway.list_relations().await {
            Ok(relations) => {
                tracing::debug!(count = relations.len(), "relations loaded");
                Self::new(relations)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to retrieve relations");
                Self::default()
            }
        }
    }

    /// All relations in the snapshot.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Number of relations.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if the catalog holds no relations.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Relations touching `collection.field`.
    ///
    /// Matches relations whose source is the field, or whose target is the
    /// collection with `field` as the reverse alias. When the first match is
    /// one half of a junction pair, the junction-to-related half is appended
    /// so the caller sees the full relationship.
    pub fn relations_for_field(&self, collection: &str, field: &str) -> Vec<&Relation> {
        let mut found: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| {
                (r.collection == collection && r.field == field)
                    || (r.related_collection.as_deref() == Some(collection)
                        && r.one_field() == Some(field))
            })
            .collect();

        let secondary = found.first().and_then(|first| {
            let junction_field = first.junction_field()?;
            self.relations
                .iter()
                .find(|r| r.collection == first.collection && r.field == junction_field)
        });
        if let Some(secondary) = secondary {
            found.push(secondary);
        }

        found
    }

    /// Relations where `collection` is either the source or the target.
    pub fn relations_for_collection(&self, collection: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.touches_collection(collection))
            .collect()
    }
}

impl From<Vec<Relation>> for RelationCatalog {
    fn from(relations: Vec<Relation>) -> Self {
        Self::new(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationMeta;

    /// posts.author -> users, posts.tags <-> tags through posts_tags.
    fn blog_catalog() -> RelationCatalog {
        RelationCatalog::new(vec![
            Relation::many_to_one("posts", "author", "users", Some("posts")),
            Relation::many_to_one("posts_tags", "posts_id", "posts", Some("tags"))
                .with_junction_field("tags_id"),
            Relation::many_to_one("posts_tags", "tags_id", "tags", None)
                .with_junction_field("posts_id"),
        ])
    }

    #[test]
    fn test_field_without_relations() {
        let catalog = blog_catalog();
        assert!(catalog.relations_for_field("posts", "title").is_empty());
    }

    #[test]
    fn test_source_side_match() {
        let catalog = blog_catalog();
        let found = catalog.relations_for_field("posts", "author");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].field, "author");
    }

    #[test]
    fn test_alias_side_match() {
        let catalog = blog_catalog();
        let found = catalog.relations_for_field("users", "posts");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].collection, "posts");
    }

    #[test]
    fn test_junction_pair_appends_secondary() {
        let catalog = blog_catalog();
        let found = catalog.relations_for_field("posts", "tags");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].field, "posts_id");
        assert_eq!(found[1].field, "tags_id");
    }

    #[test]
    fn test_missing_meta_is_not_a_junction() {
        let catalog = RelationCatalog::new(vec![Relation::new("posts", "legacy")
            .with_related("users")
            .with_meta(RelationMeta::default())]);

        assert_eq!(catalog.relations_for_field("posts", "legacy").len(), 1);
    }

    #[test]
    fn test_relations_for_collection() {
        let catalog = blog_catalog();

        assert_eq!(catalog.relations_for_collection("posts").len(), 2);
        assert_eq!(catalog.relations_for_collection("posts_tags").len(), 2);
        assert_eq!(catalog.relations_for_collection("users").len(), 1);
        assert!(catalog.relations_for_collection("nothing").is_empty());
    }
}
