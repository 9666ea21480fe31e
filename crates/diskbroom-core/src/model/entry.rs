/// A single node in the arena-allocated scan tree, plus the flat [`Entry`]
/// value handed to callers.
///
/// Nodes are stored in a flat `Vec<EntryNode>` for cache-friendly traversal.
/// Parent-child relationships use indices rather than pointers, which also
/// makes serialisation trivial and avoids reference-counting overhead.
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

use super::category::Category;

/// Lightweight index into the arena `Vec<EntryNode>`.
///
/// Uses `u32` to keep nodes small — supports up to ~4 billion nodes,
/// which is more than enough for any real filesystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Create a new `NodeIndex` from a `usize`, panicking if it exceeds `u32::MAX`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// What kind of filesystem object an entry is.
///
/// Symlinks are never followed during scanning; they are recorded as
/// `Symlink` entries so link loops cannot cause unbounded traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// FIFOs, sockets, device nodes.
    Other,
}

impl EntryKind {
    /// Derive the kind from a [`std::fs::FileType`] obtained via `lstat`.
    pub fn of(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else if file_type.is_symlink() {
            Self::Symlink
        } else {
            Self::Other
        }
    }
}

/// One filesystem object observed during a scan, as a plain value.
///
/// Used for directory listings and flat scan results. Immutable snapshot:
/// a new scan produces new entries, never mutates prior ones.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
    pub category: Category,
}

/// A single node in the scan tree.
///
/// Stored in a flat arena (`Vec<EntryNode>`). Children are linked via a
/// `first_child` / `next_sibling` linked list so that no separate
/// `Vec<NodeIndex>` allocation is needed per node.
#[derive(Debug, Clone)]
pub struct EntryNode {
    /// Entry name only (NOT the full path). Full paths are reconstructed
    /// on demand by walking up via `parent`.
    pub name: CompactString,

    pub kind: EntryKind,

    /// Size in bytes. For directories this is the sum of the direct
    /// children's sizes, computed in a single bottom-up pass after the walk.
    /// Directories at the depth limit keep their best-effort shallow size.
    pub size: u64,

    /// Depth below the scan root (root = 0, its immediate entries = 1).
    pub depth: u32,

    pub modified: Option<SystemTime>,

    pub category: Category,

    /// Index of the parent node. `None` only for the scan root.
    pub parent: Option<NodeIndex>,

    /// First child (directories only). Children form a singly-linked list
    /// via [`EntryNode::next_sibling`].
    pub first_child: Option<NodeIndex>,

    /// Next sibling under the same parent.
    pub next_sibling: Option<NodeIndex>,

    /// `true` if this entry's metadata could not be read. The node stays in
    /// the tree with size 0 so callers can see where failures occurred.
    pub is_error: bool,
}

impl EntryNode {
    /// Create a file node with the given name, size, and mtime.
    pub fn file(
        name: CompactString,
        size: u64,
        modified: Option<SystemTime>,
        depth: u32,
        parent: Option<NodeIndex>,
    ) -> Self {
        let category = Category::of(&name, EntryKind::File);
        Self {
            name,
            kind: EntryKind::File,
            size,
            depth,
            modified,
            category,
            parent,
            first_child: None,
            next_sibling: None,
            is_error: false,
        }
    }

    /// Create a directory node. Size starts at 0 and is filled in by
    /// aggregation (or by a shallow stat for depth-limit directories).
    pub fn dir(name: CompactString, depth: u32, parent: Option<NodeIndex>) -> Self {
        Self {
            name,
            kind: EntryKind::Directory,
            size: 0,
            depth,
            modified: None,
            category: Category::Other,
            parent,
            first_child: None,
            next_sibling: None,
            is_error: false,
        }
    }

    /// Create a node for a symlink or other non-regular entry. `size` is the
    /// lstat length of the entry itself; links are never followed.
    pub fn leaf(
        name: CompactString,
        kind: EntryKind,
        size: u64,
        modified: Option<SystemTime>,
        depth: u32,
        parent: Option<NodeIndex>,
    ) -> Self {
        let category = Category::of(&name, kind);
        Self {
            name,
            kind,
            size,
            depth,
            modified,
            category,
            parent,
            first_child: None,
            next_sibling: None,
            is_error: false,
        }
    }

    /// Create an error placeholder node (e.g. metadata read failed).
    pub fn error(name: CompactString, kind: EntryKind, depth: u32, parent: Option<NodeIndex>) -> Self {
        Self {
            name,
            kind,
            size: 0,
            depth,
            modified: None,
            category: Category::Other,
            parent,
            first_child: None,
            next_sibling: None,
            is_error: true,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
