//! Relational field path discovery.
//!
//! Walks a collection's fields, and recursively the collections its relations
//! point at, listing every field path that carries a relation. Each collection
//! is entered at most once per walk so cyclic schemas terminate.

use std::collections::HashSet;

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::catalog::{classify, FieldDescriptor, RelationCatalog, RelationKind};
use crate::config::PreviewConfig;
use crate::diagnostics::{join_path, Diagnostics};
use crate::error::{Error, Result};
use crate::gateway::{FieldCache, SchemaGateway};

/// A relational field path and the collection owning its last segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPath {
    pub path: String,
    pub collection: String,
}

/// Discovered paths and the subtrees that could not be walked.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkOutcome {
    pub paths: Vec<FieldPath>,
    pub diagnostics: Diagnostics,
}

#[derive(Default)]
struct Walk {
    visited: HashSet<String>,
    paths: Vec<FieldPath>,
    fields: FieldCache,
    diagnostics: Diagnostics,
}

/// Enumerates relational field paths reachable from a collection.
pub struct FieldPathWalker<'a> {
    gateway: &'a dyn SchemaGateway,
    catalog: &'a RelationCatalog,
    config: PreviewConfig,
    cancel: CancelToken,
}

impl<'a> FieldPathWalker<'a> {
    /// Create a walker with the default configuration.
    pub fn new(gateway: &'a dyn SchemaGateway, catalog: &'a RelationCatalog) -> Self {
        Self {
            gateway,
            catalog,
            config: PreviewConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Set the configuration. Its ignored fields are skipped.
    pub fn with_config(mut self, config: PreviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop walks once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Walk from `root`.
    pub async fn walk(&self, root: &str) -> Result<WalkOutcome> {
        self.walk_from(root, "").await
    }

    /// Walk from `root`, prefixing every path with `prefix`.
    ///
    /// Fails when the root collection's fields cannot be listed. Nested
    /// collections that cannot be listed are skipped with a diagnostic.
    pub async fn walk_from(&self, root: &str, prefix: &str) -> Result<WalkOutcome> {
        let mut walk = Walk::default();
        walk.visited.insert(root.to_string());

        self.cancel.check()?;
        let fields = walk
            .fields
            .get(self.gateway, root)
            .await
            .map_err(|source| Error::SchemaFetch {
                collection: root.to_string(),
                source,
            })?;

        self.walk_fields(root, prefix, &fields, &mut walk).await?;

        tracing::debug!(
            root,
            paths = walk.paths.len(),
            collections = walk.visited.len(),
            "field paths discovered"
        );
        Ok(WalkOutcome {
            paths: walk.paths,
            diagnostics: walk.diagnostics,
        })
    }

    async fn walk_fields(
        &self,
        collection: &str,
        prefix: &str,
        fields: &[FieldDescriptor],
        walk: &mut Walk,
    ) -> Result<()> {
        for descriptor in fields {
            self.cancel.check()?;

            let name = descriptor.field.as_str();
            if self.config.is_ignored(name) {
                continue;
            }

            let relations = self
                .catalog
                .relations_for_field(&descriptor.collection, name);
            if relations.is_empty() {
                continue;
            }

            let path = join_path(prefix, name);
            walk.paths.push(FieldPath {
                path: path.clone(),
                collection: collection.to_string(),
            });

            let classification = classify(&relations, &descriptor.collection, name);
            let targets: Vec<String> = match (classification.kind, classification.relation) {
                (RelationKind::ManyToOne, Some(relation)) => {
                    relation.related_collection.iter().cloned().collect()
                }
                (RelationKind::OneToMany, Some(relation)) => {
                    relation.meta().many_collection.iter().cloned().collect()
                }
                (RelationKind::ManyToAny, Some(relation)) => {
                    relation.allowed_collections().unwrap_or_default().to_vec()
                }
                _ => Vec::new(),
            };

            for target in &targets {
                self.descend(target, &path, walk).await?;
            }
        }

        Ok(())
    }

    fn descend<'b>(
        &'b self,
        collection: &'b str,
        prefix: &'b str,
        walk: &'b mut Walk,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            if !walk.visited.insert(collection.to_string()) {
                return Ok(());
            }

            self.cancel.check()?;
            let fields = match walk.fields.get(self.gateway, collection).await {
                Ok(fields) => fields,
                Err(source) => {
                    walk.diagnostics.push(
                        prefix,
                        Error::SchemaFetch {
                            collection: collection.to_string(),
                            source,
                        },
                    );
                    return Ok(());
                }
            };

            self.walk_fields(collection, prefix, &fields, walk).await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Relation, RelationMeta};
    use crate::gateway::{MemoryGateway, Snapshot};

    fn paths(outcome: &WalkOutcome) -> Vec<(&str, &str)> {
        outcome
            .paths
            .iter()
            .map(|p| (p.path.as_str(), p.collection.as_str()))
            .collect()
    }

    fn blog() -> Snapshot {
        Snapshot::new()
            .with_fields("posts", ["id", "title", "author", "comments"])
            .with_fields("users", ["id", "name", "avatar"])
            .with_fields("comments", ["id", "text", "post"])
            .with_fields("files", ["id"])
            .with_relation(Relation::many_to_one("posts", "author", "users", None))
            .with_relation(Relation::many_to_one("users", "avatar", "files", None))
            .with_relation(Relation::many_to_one(
                "comments",
                "post",
                "posts",
                Some("comments"),
            ))
    }

    async fn walk(snapshot: Snapshot, root: &str) -> WalkOutcome {
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot);
        FieldPathWalker::new(&gateway, &catalog)
            .walk(root)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_walk_follows_relations() {
        let outcome = walk(blog(), "posts").await;

        assert_eq!(
            paths(&outcome),
            vec![
                ("author", "posts"),
                ("author.avatar", "users"),
                ("comments", "posts"),
                ("comments.post", "comments"),
            ]
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_self_reference_terminates() {
        let snapshot = Snapshot::new()
            .with_fields("categories", ["id", "parent", "children"])
            .with_relation(Relation::many_to_one(
                "categories",
                "parent",
                "categories",
                Some("children"),
            ));
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot);

        let outcome = FieldPathWalker::new(&gateway, &catalog)
            .walk("categories")
            .await
            .unwrap();

        assert_eq!(
            paths(&outcome),
            vec![("parent", "categories"), ("children", "categories")]
        );
        let listed = gateway
            .calls()
            .into_iter()
            .filter(|c| matches!(c, crate::gateway::GatewayCall::ListFields(_)))
            .count();
        assert_eq!(listed, 1);
    }

    #[tokio::test]
    async fn test_many_to_any_visits_every_allowed_collection() {
        let snapshot = Snapshot::new()
            .with_fields("pages", ["id", "blocks"])
            .with_fields("hero", ["id", "image"])
            .with_fields("gallery", ["id"])
            .with_fields("files", ["id"])
            .with_relation(
                Relation::many_to_one("pages_blocks", "pages_id", "pages", Some("blocks"))
                    .with_junction_field("item"),
            )
            .with_relation(Relation::new("pages_blocks", "item").with_meta(RelationMeta {
                one_allowed_collections: Some(vec!["hero".into(), "gallery".into()]),
                junction_field: Some("pages_id".into()),
                ..RelationMeta::default()
            }))
            .with_relation(Relation::many_to_one("hero", "image", "files", None));

        let outcome = walk(snapshot, "pages").await;

        assert_eq!(
            paths(&outcome),
            vec![("blocks", "pages"), ("blocks.image", "hero")]
        );
    }

    #[tokio::test]
    async fn test_ignored_fields_are_skipped() {
        let snapshot = blog();
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot);

        let outcome = FieldPathWalker::new(&gateway, &catalog)
            .with_config(PreviewConfig::new().with_ignored_field("comments"))
            .walk("posts")
            .await
            .unwrap();

        assert_eq!(
            paths(&outcome),
            vec![("author", "posts"), ("author.avatar", "users")]
        );
    }

    #[tokio::test]
    async fn test_prefix_is_applied() {
        let snapshot = blog();
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot);

        let outcome = FieldPathWalker::new(&gateway, &catalog)
            .walk_from("users", "author")
            .await
            .unwrap();

        assert_eq!(paths(&outcome), vec![("author.avatar", "users")]);
    }

    #[tokio::test]
    async fn test_nested_schema_failure_truncates_subtree() {
        let snapshot = blog();
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot).with_failing_fields("users");

        let outcome = FieldPathWalker::new(&gateway, &catalog)
            .walk("posts")
            .await
            .unwrap();

        assert_eq!(
            paths(&outcome),
            vec![
                ("author", "posts"),
                ("comments", "posts"),
                ("comments.post", "comments"),
            ]
        );
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics.entries()[0].path, "author");
    }

    #[tokio::test]
    async fn test_root_schema_failure_aborts() {
        let snapshot = blog();
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot).with_failing_fields("posts");

        let result = FieldPathWalker::new(&gateway, &catalog).walk("posts").await;

        assert!(matches!(result, Err(Error::SchemaFetch { collection, .. }) if collection == "posts"));
    }

    #[tokio::test]
    async fn test_cancelled_walk() {
        let snapshot = blog();
        let catalog = RelationCatalog::new(snapshot.relations.clone());
        let gateway = MemoryGateway::new(snapshot);
        let token = CancelToken::new();
        token.cancel();

        let result = FieldPathWalker::new(&gateway, &catalog)
            .with_cancel_token(token)
            .walk("posts")
            .await;

        assert_eq!(result, Err(Error::Cancelled));
        assert!(gateway.calls().is_empty());
    }
}
