//! Relation kind classification for a single field.

use std::fmt;

use serde::Serialize;

use super::Relation;

/// How a field relates to other collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Plain value, or a relation shape the preview does not expand.
    None,
    /// Single reference to an item of another collection.
    ManyToOne,
    /// Alias listing the rows of another collection that reference this item.
    OneToMany,
    /// Polymorphic list where each entry may come from a different collection.
    ManyToAny,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::None => write!(f, "none"),
            RelationKind::ManyToOne => write!(f, "m2o"),
            RelationKind::OneToMany => write!(f, "o2m"),
            RelationKind::ManyToAny => write!(f, "m2a"),
        }
    }
}

/// Result of classifying a field: its kind and the relation governing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification<'a> {
    pub kind: RelationKind,
    pub relation: Option<&'a Relation>,
}

impl<'a> Classification<'a> {
    /// A non-relational field.
    pub const NONE: Classification<'static> = Classification {
        kind: RelationKind::None,
        relation: None,
    };

    fn new(kind: RelationKind, relation: Option<&'a Relation>) -> Self {
        Self { kind, relation }
    }
}

/// Classify `collection.field` from the relations touching it.
///
/// The checks run in a fixed order (many-to-one, one-to-many, many-to-any)
/// and the first match wins, since one relation list can satisfy several
/// shapes at once.
pub fn classify<'a>(relations: &[&'a Relation], collection: &str, field: &str) -> Classification<'a> {
    let single = relations.len() == 1;

    // m2o
    let is_m2o = |r: &Relation| {
        let meta = r.meta();
        meta.many_collection.as_deref() == Some(collection)
            && meta.many_field.as_deref() == Some(field)
            && r.related_collection.is_some()
    };
    if single {
        if let Some(relation) = relations.iter().find(|r| is_m2o(**r)) {
            return Classification::new(RelationKind::ManyToOne, Some(*relation));
        }
    }

    // o2m
    let is_o2m = |r: &Relation| {
        let meta = r.meta();
        meta.one_collection.as_deref() == Some(collection) && meta.one_field.as_deref() == Some(field)
    };
    if single && relations.iter().any(|r| is_o2m(*r)) {
        // A self-referencing alias has no separate many side to govern it.
        let governing = relations
            .iter()
            .find(|r| is_o2m(**r) && r.meta().many_collection.as_deref() != Some(collection))
            .copied();
        return Classification::new(RelationKind::OneToMany, governing);
    }

    // m2a
    if let Some(relation) = relations.iter().find(|r| r.allowed_collections().is_some()) {
        return Classification::new(RelationKind::ManyToAny, Some(*relation));
    }

    Classification::NONE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RelationCatalog, RelationMeta};

    fn m2a_pair() -> Vec<Relation> {
        vec![
            Relation::many_to_one("pages_blocks", "pages_id", "pages", Some("blocks"))
                .with_junction_field("item"),
            Relation::new("pages_blocks", "item").with_meta(RelationMeta {
                one_allowed_collections: Some(vec!["hero".into(), "gallery".into()]),
                junction_field: Some("pages_id".into()),
                ..RelationMeta::default()
            }),
        ]
    }

    #[test]
    fn test_no_relations_is_none() {
        let c = classify(&[], "posts", "title");
        assert_eq!(c.kind, RelationKind::None);
        assert!(c.relation.is_none());
    }

    #[test]
    fn test_many_to_one() {
        let rel = Relation::many_to_one("posts", "author", "users", Some("posts"));
        let c = classify(&[&rel], "posts", "author");

        assert_eq!(c.kind, RelationKind::ManyToOne);
        assert_eq!(c.relation, Some(&rel));
    }

    #[test]
    fn test_many_to_one_requires_related_collection() {
        let mut rel = Relation::many_to_one("posts", "author", "users", None);
        rel.related_collection = None;

        assert_eq!(classify(&[&rel], "posts", "author").kind, RelationKind::None);
    }

    #[test]
    fn test_one_to_many() {
        let rel = Relation::many_to_one("comments", "post", "posts", Some("comments"));
        let c = classify(&[&rel], "posts", "comments");

        assert_eq!(c.kind, RelationKind::OneToMany);
        assert_eq!(c.relation, Some(&rel));
    }

    #[test]
    fn test_self_referencing_one_to_many_has_no_governing_relation() {
        let rel = Relation::many_to_one("categories", "parent", "categories", Some("children"));

        let alias = classify(&[&rel], "categories", "children");
        assert_eq!(alias.kind, RelationKind::OneToMany);
        assert!(alias.relation.is_none());

        let fk = classify(&[&rel], "categories", "parent");
        assert_eq!(fk.kind, RelationKind::ManyToOne);
    }

    #[test]
    fn test_many_to_any() {
        let catalog = RelationCatalog::new(m2a_pair());
        let found = catalog.relations_for_field("pages", "blocks");
        let c = classify(&found, "pages", "blocks");

        assert_eq!(found.len(), 2);
        assert_eq!(c.kind, RelationKind::ManyToAny);
        assert_eq!(c.relation.map(|r| r.field.as_str()), Some("item"));
    }

    #[test]
    fn test_junction_pair_without_allowed_collections_is_none() {
        let catalog = RelationCatalog::new(vec![
            Relation::many_to_one("posts_tags", "posts_id", "posts", Some("tags"))
                .with_junction_field("tags_id"),
            Relation::many_to_one("posts_tags", "tags_id", "tags", None)
                .with_junction_field("posts_id"),
        ]);
        let found = catalog.relations_for_field("posts", "tags");

        assert_eq!(classify(&found, "posts", "tags").kind, RelationKind::None);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RelationKind::ManyToAny.to_string(), "m2a");
        assert_eq!(RelationKind::None.to_string(), "none");
    }
}
