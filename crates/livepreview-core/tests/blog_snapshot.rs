//! End-to-end runs against the blog demo snapshot.

use livepreview_core::{
    find_delta_paths, DraftMergeEngine, FieldPathWalker, Item, MemoryGateway, RelationCatalog,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const SNAPSHOT: &str = include_str!("../../../demos/blog/snapshot.json");
const ITEM: &str = include_str!("../../../demos/blog/item.json");
const OLD_FORM: &str = include_str!("../../../demos/blog/old.json");
const NEW_FORM: &str = include_str!("../../../demos/blog/new.json");

fn object(text: &str) -> Item {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_blog_paths() {
    let gateway = MemoryGateway::from_json(SNAPSHOT).unwrap();
    let catalog = RelationCatalog::load(&gateway).await;
    assert_eq!(catalog.len(), 4);

    let outcome = FieldPathWalker::new(&gateway, &catalog)
        .walk("posts")
        .await
        .unwrap();

    let paths: Vec<&str> = outcome.paths.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["author", "comments", "comments.post", "blocks"]);
    assert!(outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn test_blog_preview() {
    let gateway = MemoryGateway::from_json(SNAPSHOT).unwrap();
    let catalog = RelationCatalog::load(&gateway).await;

    let outcome = DraftMergeEngine::new(&gateway, &catalog)
        .merge("posts", &object(ITEM), &object(OLD_FORM), &object(NEW_FORM))
        .await
        .unwrap();

    assert!(outcome.diagnostics.is_empty());
    assert_eq!(
        Value::Object(outcome.item),
        json!({
            "id": 1,
            "title": "Hello again",
            "author": { "id": "u2", "name": "Grace" },
            "comments": [
                { "text": "hi" },
                { "id": 5, "text": "second", "sort": 2 }
            ],
            "blocks": [
                {
                    "collection": "hero",
                    "item": { "__typename": "hero", "id": 8, "title": "Second hero" }
                },
                {
                    "id": 100,
                    "sort": 1,
                    "collection": "hero",
                    "item": { "id": 7, "title": "new", "tags": ["intro"] }
                }
            ]
        })
    );
}

#[test]
fn test_blog_form_deltas() {
    let form: Value = serde_json::from_str(NEW_FORM).unwrap();
    assert_eq!(find_delta_paths(&form), vec!["blocks", "comments"]);
}
