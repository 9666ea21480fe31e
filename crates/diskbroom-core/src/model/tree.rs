/// Arena-backed scan tree with O(n) bottom-up size aggregation.
///
/// All nodes live in a single `Vec<EntryNode>`. Relationships between nodes
/// use `NodeIndex` (a thin `u32` wrapper) rather than heap pointers, giving
/// cache-friendly traversal and no per-node allocations.
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use super::entry::{EntryNode, NodeIndex};

/// The complete tree produced by one scan of one root path.
///
/// A finished tree is an immutable snapshot; rescans build a new tree.
#[derive(Debug)]
pub struct ScanTree {
    /// Arena: every node in a flat, cache-friendly vector. Index 0 is the root.
    pub nodes: Vec<EntryNode>,

    /// Absolute path of the scanned root directory.
    pub root_path: PathBuf,

    /// Total size in bytes below the root, filled in by [`ScanTree::aggregate_sizes`].
    pub total_size: u64,
}

impl ScanTree {
    /// Create a tree containing only the root directory node.
    ///
    /// `estimated_nodes` pre-allocates the arena; it will grow if needed, but
    /// pre-allocation avoids repeated re-allocation during scanning.
    pub fn new(root_path: PathBuf, estimated_nodes: usize) -> Self {
        let root_name = root_path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(root_path.to_string_lossy()));
        let mut nodes = Vec::with_capacity(estimated_nodes.max(1));
        nodes.push(EntryNode::dir(root_name, 0, None));
        Self {
            nodes,
            root_path,
            total_size: 0,
        }
    }

    /// Index of the root node.
    #[inline]
    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Allocate a new node in the arena and return its index.
    pub fn add_node(&mut self, node: EntryNode) -> NodeIndex {
        let idx = NodeIndex::new(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    /// Attach `child` as a child of `parent`, prepending to the sibling list.
    ///
    /// O(1) — new children are inserted at the head of the linked list.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) {
        let old_first = self.nodes[parent.idx()].first_child;
        self.nodes[child.idx()].next_sibling = old_first;
        self.nodes[child.idx()].parent = Some(parent);
        self.nodes[parent.idx()].first_child = Some(child);
    }

    /// Compute directory sizes in a single bottom-up pass.
    ///
    /// Because children are always inserted after their parent in the arena
    /// (walk order is parent-first), iterating in *reverse* guarantees that
    /// every child is processed before its parent. This gives O(n)
    /// aggregation with no recursion and no stack, and acts as the per-parent
    /// join: a parent's sum is only read once all its children are summed.
    ///
    /// Directories with children have their size reset and recomputed as the
    /// exact sum of direct children. Childless directories (empty, or at the
    /// depth limit) keep their assigned size, which for depth-limit
    /// directories is the best-effort shallow stat.
    pub fn aggregate_sizes(&mut self) {
        for node in self.nodes.iter_mut() {
            if node.is_dir() && node.first_child.is_some() {
                node.size = 0;
            }
        }

        // Reverse pass: children before parents.
        for i in (1..self.nodes.len()).rev() {
            let size = self.nodes[i].size;
            if let Some(parent_idx) = self.nodes[i].parent {
                self.nodes[parent_idx.idx()].size += size;
            }
        }

        self.total_size = self.nodes[0].size;
    }

    /// Reconstruct the absolute path for a node by walking up to the root.
    pub fn full_path(&self, index: NodeIndex) -> PathBuf {
        let mut segments: Vec<&str> = Vec::new();
        let mut current = Some(index);
        while let Some(idx) = current {
            let node = &self.nodes[idx.idx()];
            if node.parent.is_some() {
                segments.push(node.name.as_str());
            }
            current = node.parent;
        }
        let mut path = self.root_path.clone();
        for segment in segments.into_iter().rev() {
            path.push(segment);
        }
        path
    }

    /// Find the node for an absolute path under the root, if present.
    pub fn find(&self, path: &Path) -> Option<NodeIndex> {
        let relative = path.strip_prefix(&self.root_path).ok()?;
        let mut current = self.root();
        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy();
            current = self
                .children(current)
                .into_iter()
                .find(|&c| self.nodes[c.idx()].name.as_str() == name)?;
        }
        Some(current)
    }

    /// Get direct children of a node (unsorted).
    pub fn children(&self, parent: NodeIndex) -> Vec<NodeIndex> {
        let mut children = Vec::new();
        let mut child = self.nodes[parent.idx()].first_child;
        while let Some(idx) = child {
            children.push(idx);
            child = self.nodes[idx.idx()].next_sibling;
        }
        children
    }

    /// Get direct children sorted directories-first, then by size descending.
    pub fn children_sorted_by_size(&self, parent: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.children(parent);
        children.sort_unstable_by(|a, b| {
            let a_node = &self.nodes[a.idx()];
            let b_node = &self.nodes[b.idx()];
            b_node
                .is_dir()
                .cmp(&a_node.is_dir())
                .then(b_node.size.cmp(&a_node.size))
        });
        children
    }

    /// Get the node at the given index.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &EntryNode {
        &self.nodes[index.idx()]
    }

    /// Total number of nodes in the tree (including the root).
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
