/// Scan progress reporting — messages sent from the scan worker to the
/// requesting context via a crossbeam channel.
///
/// The finished tree or flat listing travels inside the terminal message by
/// move, so no data is shared across the thread boundary.
use crate::error::Error;
use crate::model::ScanTree;
use crate::scanner::flat::FlatResult;
use std::path::PathBuf;
use std::time::Duration;

/// The payload of a completed scan.
#[derive(Debug)]
pub enum ScanOutcome {
    Tree(ScanTree),
    Flat(FlatResult),
}

impl ScanOutcome {
    /// Total size in bytes observed by the scan.
    pub fn total_size(&self) -> u64 {
        match self {
            Self::Tree(tree) => tree.total_size,
            Self::Flat(flat) => flat.total_size,
        }
    }
}

/// Events sent from the scan worker thread.
#[derive(Debug)]
pub enum ScanEvent {
    /// Periodic update with running totals.
    Update {
        files_seen: u64,
        dirs_seen: u64,
        bytes_seen: u64,
        current_path: String,
    },
    /// A non-fatal per-entry failure (e.g. permission denied on one file).
    /// The entry was recorded as a zero-size error node and the scan went on.
    EntryError { path: PathBuf, message: String },
    /// Scanning completed; the result is moved to the receiver.
    Finished {
        outcome: Box<ScanOutcome>,
        duration: Duration,
        error_count: u64,
    },
    /// The scan could not start at all (root missing, not a directory).
    Failed(Error),
    /// Scan was cancelled by the caller.
    Cancelled,
}
