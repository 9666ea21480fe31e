/// Data model for scan results.
///
/// Re-exports the arena-allocated scan tree and supporting types.
pub mod category;
pub mod entry;
pub mod size;
pub mod tree;

pub use category::Category;
pub use entry::{Entry, EntryKind, EntryNode, NodeIndex};
pub use size::{format_count, format_size};
pub use tree::ScanTree;
