/// Parallel depth-bounded directory walker built on `jwalk`.
///
/// The walker fans directory reads out over a small rayon pool (bounded, to
/// cap simultaneously open descriptors) while the tree itself is built
/// single-owner on the calling worker thread: nodes are appended to the
/// arena as entries stream in, and the finished tree is *moved* to the
/// requester — nothing is shared across the thread boundary.
///
/// Per-entry failures never abort the walk: the entry becomes a zero-size
/// error node, a warning is logged, and an `EntryError` event is emitted.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use compact_str::CompactString;
use crossbeam_channel::Sender;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{EntryKind, EntryNode, NodeIndex, ScanTree};
use crate::scanner::progress::ScanEvent;
use crate::scanner::{ScanOptions, MAX_SCAN_FANOUT};
use crate::statcache::StatCache;

/// Entries between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1_000;

/// Entries between progress updates.
const UPDATE_INTERVAL: u64 = 5_000;

/// Initial arena capacity. Grows as needed; pre-allocation just avoids the
/// first few re-allocations on typical project directories.
const ESTIMATED_NODES: usize = 4_096;

/// A completed walk: the aggregated tree plus how many entries failed.
#[derive(Debug)]
pub(crate) struct Walked {
    pub tree: ScanTree,
    pub error_count: u64,
}

/// Walk `root` to the configured depth, building a size-aggregated tree.
///
/// Returns `Ok(None)` when cancelled. Fails only for root-level problems
/// (missing root, root not a directory); everything below that degrades
/// gracefully.
pub(crate) fn walk_tree(
    root: &Path,
    opts: &ScanOptions,
    cache: Option<&StatCache>,
    events: Option<&Sender<ScanEvent>>,
    cancel: Option<&AtomicBool>,
) -> Result<Option<Walked>> {
    let root_meta =
        std::fs::symlink_metadata(root).map_err(|e| Error::from_io(e, root))?;
    if !root_meta.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let mut tree = ScanTree::new(root.to_path_buf(), ESTIMATED_NODES);
    let root_idx = tree.root();

    // Map from directory path to its NodeIndex in the arena. Scan-lifetime
    // only; if an entry's parent is ever missing, `ensure_ancestors`
    // recreates the chain from the root.
    let mut dir_map: HashMap<PathBuf, NodeIndex> = HashMap::with_capacity(1_024);
    dir_map.insert(root.to_path_buf(), root_idx);

    let mut files_seen: u64 = 0;
    let mut dirs_seen: u64 = 1; // count the root
    let mut bytes_seen: u64 = 0;
    let mut error_count: u64 = 0;
    let mut entry_counter: u64 = 0;

    // Depth mapping: max_depth 0 means "immediate entries only", so the
    // walker is allowed one level more than the configured depth; dirs
    // yielded at that last level are included but not read.
    let walker_depth = opts.max_depth.saturating_add(1);
    let excludes = opts.excludes.clone();

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .max_depth(walker_depth)
        .parallelism(jwalk::Parallelism::RayonNewPool(
            num_cpus::get().min(MAX_SCAN_FANOUT),
        ))
        .process_read_dir(move |_depth, _path, _state, children| {
            // Noise directories are dropped by name before any stat happens,
            // which both skips the subtree and keeps it out of size totals.
            children.retain(|res| match res {
                Ok(entry) => !excludes.contains(entry.file_name().to_string_lossy().as_ref()),
                Err(_) => true,
            });
        });

    for entry_result in walker {
        entry_counter += 1;
        if entry_counter.is_multiple_of(CANCEL_CHECK_INTERVAL) {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Ok(None);
                }
            }
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                // jwalk errors are typically access-denied on directory reads.
                error_count += 1;
                let err_path = err.path().map(Path::to_path_buf).unwrap_or_default();
                warn!(path = %err_path.display(), error = %err, "unreadable entry skipped");

                // Keep a placeholder node if the parent is known, so callers
                // can see where the hole is.
                if let Some(parent_path) = err_path.parent() {
                    if let Some(&parent_idx) = dir_map.get(parent_path) {
                        let name = err_path
                            .file_name()
                            .map(|n| CompactString::new(n.to_string_lossy()))
                            .unwrap_or_else(|| CompactString::new("<unreadable>"));
                        let depth = tree.node(parent_idx).depth + 1;
                        let node =
                            EntryNode::error(name, EntryKind::Directory, depth, Some(parent_idx));
                        let idx = tree.add_node(node);
                        tree.add_child(parent_idx, idx);
                    }
                }

                if let Some(tx) = events {
                    let _ = tx.send(ScanEvent::EntryError {
                        path: err_path,
                        message: err.to_string(),
                    });
                }
                continue;
            }
        };

        let path = entry.path();
        if path == *root {
            continue;
        }

        let parent_path = match path.parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };
        let parent_idx = match dir_map.get(&parent_path) {
            Some(&idx) => idx,
            None => ensure_ancestors(&mut tree, &mut dir_map, &parent_path, root, root_idx),
        };

        let depth = entry.depth as u32;
        let name = CompactString::new(entry.file_name().to_string_lossy());
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let mut node = EntryNode::dir(name, depth, Some(parent_idx));
            if entry.depth == walker_depth {
                // At the depth limit: include the directory unexpanded with a
                // best-effort shallow size (0 if the stat fails).
                node.size = shallow_dir_size(&path, cache);
            }
            let idx = tree.add_node(node);
            tree.add_child(parent_idx, idx);
            dir_map.insert(path.clone(), idx);
            dirs_seen += 1;
        } else {
            // lstat the entry — symlinks report their own length, never the
            // target's, because links are recorded and not followed.
            match std::fs::symlink_metadata(&path) {
                Ok(meta) => {
                    let kind = EntryKind::of(file_type);
                    let node = if kind == EntryKind::File {
                        files_seen += 1;
                        bytes_seen += meta.len();
                        EntryNode::file(
                            name,
                            meta.len(),
                            meta.modified().ok(),
                            depth,
                            Some(parent_idx),
                        )
                    } else {
                        EntryNode::leaf(
                            name,
                            kind,
                            meta.len(),
                            meta.modified().ok(),
                            depth,
                            Some(parent_idx),
                        )
                    };
                    let idx = tree.add_node(node);
                    tree.add_child(parent_idx, idx);
                }
                Err(err) => {
                    error_count += 1;
                    warn!(path = %path.display(), error = %err, "stat failed, entry omitted from totals");
                    let node =
                        EntryNode::error(name, EntryKind::of(file_type), depth, Some(parent_idx));
                    let idx = tree.add_node(node);
                    tree.add_child(parent_idx, idx);
                    if let Some(tx) = events {
                        let _ = tx.send(ScanEvent::EntryError {
                            path: path.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        if entry_counter.is_multiple_of(UPDATE_INTERVAL) {
            if let Some(tx) = events {
                let _ = tx.send(ScanEvent::Update {
                    files_seen,
                    dirs_seen,
                    bytes_seen,
                    current_path: path.display().to_string(),
                });
            }
        }
    }

    tree.aggregate_sizes();
    Ok(Some(Walked { tree, error_count }))
}

/// Best-effort size for a directory at the depth limit.
fn shallow_dir_size(path: &Path, cache: Option<&StatCache>) -> u64 {
    match cache {
        Some(cache) => cache.stat(path).map(|m| m.len).unwrap_or(0),
        None => std::fs::symlink_metadata(path).map(|m| m.len()).unwrap_or(0),
    }
}

/// Ensure all ancestor directories of `target` exist in the tree and
/// `dir_map`.
///
/// Called only when a parent path is missing from the map (rare, caused by
/// jwalk ordering on very wide trees). Missing ancestors are created as
/// plain directory nodes chained down from the nearest known one.
fn ensure_ancestors(
    tree: &mut ScanTree,
    dir_map: &mut HashMap<PathBuf, NodeIndex>,
    target: &Path,
    root: &Path,
    root_idx: NodeIndex,
) -> NodeIndex {
    let mut missing: Vec<PathBuf> = Vec::new();
    let mut current = target.to_path_buf();

    while !dir_map.contains_key(&current) && current != *root {
        missing.push(current.clone());
        match current.parent() {
            Some(p) => current = p.to_path_buf(),
            None => break,
        }
    }

    let mut parent_idx = dir_map.get(&current).copied().unwrap_or(root_idx);

    for ancestor in missing.into_iter().rev() {
        let name = ancestor
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        let depth = tree.node(parent_idx).depth + 1;
        let node = EntryNode::dir(name, depth, Some(parent_idx));
        let idx = tree.add_node(node);
        tree.add_child(parent_idx, idx);
        dir_map.insert(ancestor, idx);
        parent_idx = idx;
    }

    parent_idx
}
