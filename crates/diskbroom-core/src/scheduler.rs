/// Scan scheduler — debounces and coalesces scan requests.
///
/// Requests are keyed by `(path, mode)`. Rapid repeats of one key within the
/// debounce window collapse into a single scan, executed once the window
/// lapses quietly. At most one scan per key is in flight: requests arriving
/// during a flight attach to its result, and the key is additionally marked
/// dirty so one follow-up scan runs after the flight completes — an
/// in-flight scan is never forcibly aborted by a newer same-key request.
///
/// Scans execute on a small fixed pool of worker threads, so the requesting
/// context never blocks; results are delivered asynchronously over
/// per-request channels as shared [`ScanReply`] values.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::scanner::progress::ScanOutcome;
use crate::scanner::{self, ScanMode, ScanOptions};
use crate::statcache::StatCache;

/// A logical request stream: one directory in one result shape.
pub type ScanKey = (PathBuf, ScanMode);

/// Shared result of one scan execution, delivered to every attached waiter.
pub type ScanReply = Arc<Result<ScanOutcome, Error>>;

/// How long a key must stay quiet before its scan runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Worker threads executing scans. Distinct keys run concurrently up to
/// this bound; the per-scan directory fan-out is bounded separately.
pub const DEFAULT_WORKERS: usize = 2;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub debounce: Duration,
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            workers: DEFAULT_WORKERS,
        }
    }
}

enum CtlMsg {
    Request {
        key: ScanKey,
        opts: ScanOptions,
        reply: Sender<ScanReply>,
    },
    Changed {
        path: PathBuf,
    },
    Done {
        key: ScanKey,
        result: ScanReply,
    },
    Shutdown,
}

struct Job {
    key: ScanKey,
    opts: ScanOptions,
}

/// Per-key scheduling state, owned by the control thread.
#[derive(Default)]
struct KeyState {
    /// Debounce deadline for the next scan; `Some` means a scan is pending.
    deadline: Option<Instant>,
    /// Options for the pending scan (last request wins).
    opts: Option<ScanOptions>,
    /// Waiters for the pending (not yet dispatched) scan.
    pending_waiters: Vec<Sender<ScanReply>>,
    /// Waiters attached to the in-flight scan.
    flight_waiters: Vec<Sender<ScanReply>>,
    in_flight: bool,
    /// A request or change arrived during the flight; rescan on completion.
    dirty: bool,
}

/// Handle to the scheduler. Cheap to clone; the underlying control and
/// worker threads shut down when [`Scheduler::shutdown`] is called or the
/// last handle is dropped.
#[derive(Clone)]
pub struct Scheduler {
    ctl_tx: Sender<CtlMsg>,
    scans_executed: Arc<AtomicU64>,
    _guard: Arc<ShutdownGuard>,
}

struct ShutdownGuard {
    ctl_tx: Sender<CtlMsg>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.ctl_tx.send(CtlMsg::Shutdown);
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (ctl_tx, ctl_rx) = crossbeam_channel::unbounded::<CtlMsg>();
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(64);
        let scans_executed = Arc::new(AtomicU64::new(0));

        for worker_id in 0..config.workers.max(1) {
            let job_rx = job_rx.clone();
            let ctl_tx = ctl_tx.clone();
            thread::Builder::new()
                .name(format!("diskbroom-sched-{worker_id}"))
                .spawn(move || worker_loop(job_rx, ctl_tx))
                .expect("failed to spawn scheduler worker");
        }

        {
            let ctl_rx = ctl_rx;
            let debounce = config.debounce;
            let scans_executed = scans_executed.clone();
            thread::Builder::new()
                .name("diskbroom-sched-ctl".into())
                .spawn(move || control_loop(ctl_rx, job_tx, debounce, scans_executed))
                .expect("failed to spawn scheduler control thread");
        }

        Self {
            ctl_tx: ctl_tx.clone(),
            scans_executed,
            _guard: Arc::new(ShutdownGuard { ctl_tx }),
        }
    }

    /// Request a scan of `path` in `mode`. The returned channel yields the
    /// result of whichever scan execution this request ends up attached to.
    pub fn request(&self, path: PathBuf, mode: ScanMode, opts: ScanOptions) -> Receiver<ScanReply> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<ScanReply>(1);
        let _ = self.ctl_tx.send(CtlMsg::Request {
            key: (path, mode),
            opts,
            reply: reply_tx,
        });
        reply_rx
    }

    /// Signal that `path` changed on disk (watch bridge entry point).
    /// Re-arms the debounce for every known key on that path; unknown paths
    /// are ignored.
    pub fn notify_changed(&self, path: &Path) {
        let _ = self.ctl_tx.send(CtlMsg::Changed {
            path: path.to_path_buf(),
        });
    }

    /// Number of scan executions dispatched so far. Coalesced or attached
    /// requests do not increment this.
    pub fn scans_executed(&self) -> u64 {
        self.scans_executed.load(Ordering::Relaxed)
    }

    /// Stop the control thread and workers. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.ctl_tx.send(CtlMsg::Shutdown);
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("scans_executed", &self.scans_executed())
            .finish()
    }
}

fn control_loop(
    ctl_rx: Receiver<CtlMsg>,
    job_tx: Sender<Job>,
    debounce: Duration,
    scans_executed: Arc<AtomicU64>,
) {
    let mut keys: HashMap<ScanKey, KeyState> = HashMap::new();

    loop {
        let now = Instant::now();
        let next_deadline = keys
            .values()
            .filter_map(|s| s.deadline)
            .min()
            .map(|d| d.saturating_duration_since(now));

        let msg = match next_deadline {
            Some(timeout) => match ctl_rx.recv_timeout(timeout) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match ctl_rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        match msg {
            Some(CtlMsg::Request { key, opts, reply }) => {
                let state = keys.entry(key.clone()).or_default();
                if state.in_flight {
                    // Attach to the in-flight scan's result; defer a fresh
                    // scan until it completes.
                    state.flight_waiters.push(reply);
                    state.dirty = true;
                    state.opts = Some(opts);
                } else {
                    state.pending_waiters.push(reply);
                    state.opts = Some(opts);
                    state.deadline = Some(Instant::now() + debounce);
                }
            }
            Some(CtlMsg::Changed { path }) => {
                let mut known = false;
                for (key, state) in keys.iter_mut() {
                    if key.0 != path {
                        continue;
                    }
                    known = true;
                    if state.in_flight {
                        state.dirty = true;
                    } else {
                        state.deadline = Some(Instant::now() + debounce);
                    }
                }
                if !known {
                    debug!(path = %path.display(), "change signal for unwatched key, ignored");
                }
            }
            Some(CtlMsg::Done { key, result }) => {
                let mut idle = false;
                if let Some(state) = keys.get_mut(&key) {
                    state.in_flight = false;
                    for waiter in state.flight_waiters.drain(..) {
                        let _ = waiter.send(result.clone());
                    }
                    if state.dirty {
                        state.dirty = false;
                        state.deadline = Some(Instant::now() + debounce);
                    }
                    idle = state.deadline.is_none() && state.pending_waiters.is_empty();
                } else {
                    warn!("scan completed for untracked key");
                }
                // Fully idle keys are forgotten so the map tracks only
                // active request streams, not every key ever scanned.
                if idle {
                    keys.remove(&key);
                }
            }
            Some(CtlMsg::Shutdown) => break,
            None => {}
        }

        // Dispatch every key whose quiet window has elapsed.
        let now = Instant::now();
        for (key, state) in keys.iter_mut() {
            let due = state.deadline.is_some_and(|d| d <= now);
            if !due || state.in_flight {
                continue;
            }
            state.deadline = None;
            state.in_flight = true;
            state.flight_waiters = std::mem::take(&mut state.pending_waiters);
            let opts = state.opts.clone().unwrap_or_default();
            scans_executed.fetch_add(1, Ordering::Relaxed);
            debug!(path = %key.0.display(), mode = ?key.1, "dispatching scan");
            if job_tx
                .send(Job {
                    key: key.clone(),
                    opts,
                })
                .is_err()
            {
                // Workers are gone; nothing more to do.
                return;
            }
        }
    }

    info!("scan scheduler stopped");
}

fn worker_loop(job_rx: Receiver<Job>, ctl_tx: Sender<CtlMsg>) {
    // One cache per worker, cleared per scan pass: memoisation is scoped to
    // a single pass, never carried across rescans.
    let cache = StatCache::default();
    for job in job_rx.iter() {
        cache.clear();
        let (path, mode) = &job.key;
        let result = match mode {
            ScanMode::Tree => {
                scanner::scan_tree(path, &job.opts, Some(&cache)).map(ScanOutcome::Tree)
            }
            ScanMode::Flat => {
                scanner::scan_flat(path, &job.opts, Some(&cache)).map(ScanOutcome::Flat)
            }
        };
        if ctl_tx
            .send(CtlMsg::Done {
                key: job.key,
                result: Arc::new(result),
            })
            .is_err()
        {
            break;
        }
    }
}
