//! Draft merging for live preview.

mod delta;
mod engine;

pub use delta::{ManyToOneValue, RelationDelta};
pub use engine::{DraftMergeEngine, MergeOutcome};
