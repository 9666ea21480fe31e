/// DiskBroom Core — scanning, trash management, and data model.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (CLI, TUI, GUI).
///
/// # Modules
///
/// - [`model`] — Arena-allocated scan tree and supporting types.
/// - [`scanner`] — Depth-bounded filesystem scanning with progress reporting.
/// - [`scheduler`] — Debounced, keyed scan scheduling with a worker pool.
/// - [`trash`] — Journaled soft delete with crash recovery.
/// - [`watch`] — Native filesystem change notifications.
/// - [`ops`] — The facade a frontend consumes.
/// - [`path`] — Untrusted path resolution.
/// - [`statcache`] — Bounded, mtime-invalidated metadata cache.
pub mod error;
pub mod model;
pub mod ops;
pub mod path;
pub mod scanner;
pub mod scheduler;
pub mod statcache;
pub mod trash;
pub mod watch;

pub use error::{Error, Result};
