//! Live preview core - relation classification, field path discovery, and
//! draft merging.
//!
//! Given relation descriptors and field metadata from a [`SchemaGateway`],
//! this crate computes what an item would look like once an editor's pending
//! create/update/delete operations are applied, without saving anything.
//!
//! ```ignore
//! use livepreview_core::{DraftMergeEngine, MemoryGateway, RelationCatalog};
//!
//! let gateway = MemoryGateway::from_json(&snapshot_json)?;
//! let catalog = RelationCatalog::load(&gateway).await;
//! let outcome = DraftMergeEngine::new(&gateway, &catalog)
//!     .merge("posts", &item, &old_form, &new_form)
//!     .await?;
//!
//! for diagnostic in outcome.diagnostics.entries() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

pub mod cancel;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod inspect;
pub mod merge;
pub mod value;
pub mod walker;

pub use cancel::CancelToken;
pub use catalog::{
    classify, Classification, FieldDescriptor, Relation, RelationCatalog, RelationKind,
    RelationMeta,
};
pub use config::PreviewConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Error, GatewayError, Result};
pub use gateway::{FieldCache, GatewayCall, MemoryGateway, SchemaGateway, Snapshot};
pub use inspect::{find_delta_paths, find_differences, resolve_path, Difference};
pub use merge::{DraftMergeEngine, ManyToOneValue, MergeOutcome, RelationDelta};
pub use value::{Item, ItemId};
pub use walker::{FieldPath, FieldPathWalker, WalkOutcome};
