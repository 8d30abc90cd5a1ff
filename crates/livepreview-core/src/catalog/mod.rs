//! Relation catalog for live preview.
//!
//! The catalog indexes relation descriptors and classifies fields by the
//! relations touching them.

mod catalog;
mod classify;
mod field;
mod relation;

pub use catalog::RelationCatalog;
pub use classify::{classify, Classification, RelationKind};
pub use field::FieldDescriptor;
pub use relation::{Relation, RelationMeta};
