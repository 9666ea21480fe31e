/// Scanner module — depth-bounded filesystem scanning.
///
/// Two result shapes over one traversal:
/// - **Tree:** size-aggregated directory tree ([`crate::model::ScanTree`]).
/// - **Flat:** categorized file listing ([`flat::FlatResult`]), derived from
///   the same walk so the views never disagree.
///
/// Scans run on a dedicated worker thread; the requester receives progress
/// and the finished result over a bounded channel. Nothing is shared across
/// the boundary — the result is moved, not locked.
pub mod flat;
pub mod progress;
pub(crate) mod walk;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::ScanTree;
use crate::statcache::StatCache;
pub use flat::FlatResult;
pub use progress::{ScanEvent, ScanOutcome};

/// Which result shape a scan produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Tree,
    Flat,
}

/// Upper bound on concurrent directory reads within one scan.
///
/// Entries are read in parallel up to this fan-out; anything higher mostly
/// burns file descriptors without improving throughput on a single volume.
pub const MAX_SCAN_FANOUT: usize = 4;

/// Maximum number of progress messages that may queue up in the channel.
///
/// The consumer drains at its own cadence; a burst of 4 096 messages gives
/// the scanner generous headroom before back-pressure causes `send` to
/// block. If the consumer falls behind, the scanner stalls briefly rather
/// than consuming unbounded heap.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Parameters for one scan request.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Recursion bound: 0 lists only the root's immediate entries.
    /// Directories at the limit are included unexpanded.
    pub max_depth: usize,
    /// Directory names skipped by name, without being stat'd.
    pub excludes: Arc<HashSet<String>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            excludes: default_excludes(),
        }
    }
}

impl ScanOptions {
    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

/// Version-control metadata and package-manager caches: skipped by default
/// because they dominate entry counts while telling the user nothing about
/// their own data.
pub fn default_excludes() -> Arc<HashSet<String>> {
    Arc::new(
        [".git", ".hg", ".svn", "node_modules", "__pycache__", ".cache"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
    )
}

/// Scan a directory into a size-aggregated tree, blocking the caller.
///
/// Per-entry failures degrade to error nodes; only root-level problems fail.
pub fn scan_tree(root: &Path, opts: &ScanOptions, cache: Option<&StatCache>) -> Result<ScanTree> {
    let walked = walk::walk_tree(root, opts, cache, None, None)?
        .expect("uncancellable walk cannot be cancelled");
    Ok(walked.tree)
}

/// Scan a directory into a flat categorized listing, blocking the caller.
pub fn scan_flat(root: &Path, opts: &ScanOptions, cache: Option<&StatCache>) -> Result<FlatResult> {
    let tree = scan_tree(root, opts, cache)?;
    Ok(flat::flatten(&tree))
}

/// Handle to a running scan. Allows cancellation and receiving events.
pub struct ScanHandle {
    /// Receiver for progress and the terminal event from the scan thread.
    pub events: Receiver<ScanEvent>,
    cancel_flag: Arc<AtomicBool>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}

/// Start a scan on a background thread.
///
/// The terminal event is one of `Finished`, `Failed`, or `Cancelled`; the
/// finished outcome is moved through the channel.
pub fn start_scan(root: PathBuf, mode: ScanMode, opts: ScanOptions) -> ScanHandle {
    let (tx, rx) = crossbeam_channel::bounded::<ScanEvent>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_clone = cancel_flag.clone();

    let thread = thread::Builder::new()
        .name("diskbroom-scan".into())
        .spawn(move || {
            info!(path = %root.display(), ?mode, "starting scan");
            let start = Instant::now();

            let walked = match walk::walk_tree(&root, &opts, None, Some(&tx), Some(&cancel_clone)) {
                Ok(Some(walked)) => walked,
                Ok(None) => {
                    let _ = tx.send(ScanEvent::Cancelled);
                    return;
                }
                Err(err) => {
                    let _ = tx.send(ScanEvent::Failed(err));
                    return;
                }
            };

            let duration = start.elapsed();
            debug!(
                nodes = walked.tree.len(),
                errors = walked.error_count,
                ?duration,
                "walk complete"
            );

            let outcome = match mode {
                ScanMode::Tree => ScanOutcome::Tree(walked.tree),
                ScanMode::Flat => ScanOutcome::Flat(flat::flatten(&walked.tree)),
            };
            let _ = tx.send(ScanEvent::Finished {
                outcome: Box::new(outcome),
                duration,
                error_count: walked.error_count,
            });
        })
        .expect("failed to spawn scanner thread");

    ScanHandle {
        events: rx,
        cancel_flag,
        _thread: Some(thread),
    }
}
