/// Flat categorized scan results.
///
/// A flat scan shares the tree scan's traversal, exclusion, and
/// classification by construction: it is derived from a finished
/// [`ScanTree`], so the two views cannot disagree.
use std::collections::HashMap;

use crate::model::{Category, Entry, ScanTree};

/// Flat listing of every non-directory entry found by a scan, plus a
/// grouping index keyed by category.
#[derive(Debug, Default)]
pub struct FlatResult {
    pub files: Vec<Entry>,
    pub by_category: HashMap<Category, Vec<Entry>>,
    pub total_count: usize,
    pub total_size: u64,
}

/// Flatten a scan tree, discarding shape and grouping by category.
///
/// Directories and error placeholders are skipped; files, symlinks, and
/// other non-regular entries are listed with their full paths.
pub fn flatten(tree: &ScanTree) -> FlatResult {
    let mut files = Vec::new();
    let mut by_category: HashMap<Category, Vec<Entry>> = HashMap::new();
    let mut total_size = 0u64;

    for (i, node) in tree.nodes.iter().enumerate() {
        if node.is_dir() || node.is_error {
            continue;
        }
        let entry = Entry {
            name: node.name.to_string(),
            path: tree.full_path(crate::model::NodeIndex::new(i)),
            kind: node.kind,
            size_bytes: node.size,
            modified: node.modified,
            category: node.category,
        };
        total_size += entry.size_bytes;
        by_category
            .entry(entry.category)
            .or_default()
            .push(entry.clone());
        files.push(entry);
    }

    FlatResult {
        total_count: files.len(),
        files,
        by_category,
        total_size,
    }
}
