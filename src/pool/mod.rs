//! Bounded worker pools: a fixed set of threads per pool pulling type-erased tasks off an
//! unbounded channel. Submission never blocks; concurrency is capped by the thread count.
//!
//! Each task settles exactly once through its completion callback:
//! [`TaskOutcome::Completed`], [`TaskOutcome::Failed`] or [`TaskOutcome::Discarded`].
//! Panics inside a task body are caught at the pool boundary and reported as failures.

pub mod watchdog;

pub use watchdog::Watchdog;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, warn};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{PipelineError, TaskError};
use crate::utils::config::{PoolSizes, StageTimeouts};

/// Which stage a pool serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    Search,
    Crawl,
    Parse,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolKind::Search => "search",
            PoolKind::Crawl => "crawl",
            PoolKind::Parse => "parse",
        };
        f.write_str(s)
    }
}

/// Terminal state of a task, delivered to its completion callback.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(TaskError),
    /// Cancelled before the body ran, or after; no result to report.
    Discarded,
}

type Body<T> = Box<dyn FnOnce() -> Result<T, TaskError> + Send>;
type Completion<T> = Box<dyn FnOnce(TaskOutcome<T>) + Send>;

/// A unit of work: a body to run on a pool thread and a callback that receives its outcome.
pub struct Task<T> {
    label: String,
    body: Body<T>,
    on_complete: Completion<T>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<B, C>(label: impl Into<String>, body: B, on_complete: C) -> Self
    where
        B: FnOnce() -> Result<T, TaskError> + Send + 'static,
        C: FnOnce(TaskOutcome<T>) + Send + 'static,
    {
        Self {
            label: label.into(),
            body: Box::new(body),
            on_complete: Box::new(on_complete),
            cancelled: None,
        }
    }

    /// When `flag` is set before the body starts, the task settles as [`TaskOutcome::Discarded`]
    /// without running.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }
}

/// Holds the completion callback until the first of {worker, watchdog, shutdown} settles it.
struct CompletionSlot<T> {
    callback: Mutex<Option<Completion<T>>>,
    settled: Arc<AtomicBool>,
}

impl<T> CompletionSlot<T> {
    /// Run the callback with `outcome` if nobody has yet. Returns false when already settled.
    fn settle(&self, outcome: TaskOutcome<T>) -> bool {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match callback {
            Some(cb) => {
                self.settled.store(true, Ordering::Release);
                cb(outcome);
                true
            }
            None => false,
        }
    }
}

/// Returned by [`WorkerPool::submit`].
#[derive(Clone, Debug)]
pub struct TaskHandle {
    id: u64,
    settled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once the completion callback has run (or is running).
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

/// Object-safe view of a queued task so one channel can carry tasks of any result type.
trait Runnable: Send {
    fn run(self: Box<Self>);
    fn abandon(self: Box<Self>);
}

struct Queued<T> {
    id: u64,
    kind: PoolKind,
    label: String,
    body: Body<T>,
    cancelled: Option<Arc<AtomicBool>>,
    slot: Arc<CompletionSlot<T>>,
    timeout: Option<(Duration, Arc<Watchdog>)>,
}

impl<T: Send + 'static> Runnable for Queued<T> {
    fn run(self: Box<Self>) {
        let Queued {
            id,
            kind,
            label,
            body,
            cancelled,
            slot,
            timeout,
        } = *self;

        if cancelled.as_ref().is_some_and(|c| c.load(Ordering::Acquire)) {
            slot.settle(TaskOutcome::Discarded);
            return;
        }

        let deadline = timeout.map(|(limit, watchdog)| {
            let slot_w = Arc::clone(&slot);
            let label_w = label.clone();
            let key = watchdog.register(Instant::now() + limit, move || {
                if slot_w.settle(TaskOutcome::Failed(TaskError::TimedOut(limit))) {
                    warn!("{kind} task #{id} ({label_w}) timed out after {limit:?}");
                }
            });
            (watchdog, key)
        });

        let outcome = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(Ok(value)) => TaskOutcome::Completed(value),
            Ok(Err(e)) => TaskOutcome::Failed(e),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!("{kind} task #{id} ({label}) panicked: {msg}");
                TaskOutcome::Failed(TaskError::Panicked(msg))
            }
        };
        if let Some((watchdog, key)) = deadline {
            watchdog.cancel(key);
        }
        if !slot.settle(outcome) {
            debug!("{kind} task #{id} ({label}) finished after being settled; result dropped");
        }
    }

    fn abandon(self: Box<Self>) {
        let kind = self.kind;
        self.slot.settle(TaskOutcome::Failed(TaskError::PoolClosed(kind)));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

type Work = Box<dyn Runnable>;

/// Single worker: pull tasks until the channel closes. After an abandoning shutdown, queued
/// tasks are settled as [`TaskError::PoolClosed`] instead of run.
fn worker_loop(
    kind: PoolKind,
    rx: Receiver<Work>,
    abandon: Arc<AtomicBool>,
) {
    while let Ok(work) = rx.recv() {
        if abandon.load(Ordering::Acquire) {
            work.abandon();
            continue;
        }
        if panic::catch_unwind(AssertUnwindSafe(|| work.run())).is_err() {
            error!("{kind} worker: completion callback panicked");
        }
    }
}

/// Fixed-size pool of worker threads for one stage.
pub struct WorkerPool {
    kind: PoolKind,
    size: usize,
    tx: Mutex<Option<Sender<Work>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    abandon: Arc<AtomicBool>,
    next_id: AtomicU64,
    timeout: Option<(Duration, Arc<Watchdog>)>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    pub fn new(kind: PoolKind, size: usize) -> Result<Self, PipelineError> {
        Self::build(kind, size, None)
    }

    /// Like [`WorkerPool::new`], but each task that runs longer than `timeout` is settled as
    /// [`TaskError::TimedOut`] by `watchdog`.
    pub fn with_timeout(
        kind: PoolKind,
        size: usize,
        timeout: Duration,
        watchdog: Arc<Watchdog>,
    ) -> Result<Self, PipelineError> {
        Self::build(kind, size, Some((timeout, watchdog)))
    }

    fn build(
        kind: PoolKind,
        size: usize,
        timeout: Option<(Duration, Arc<Watchdog>)>,
    ) -> Result<Self, PipelineError> {
        let size = size.max(1);
        let (tx, rx) = unbounded::<Work>();
        let abandon = Arc::new(AtomicBool::new(false));
        let workers = (0..size)
            .map(|i| {
                let rx = rx.clone();
                let abandon = Arc::clone(&abandon);
                thread::Builder::new()
                    .name(format!("flair-{kind}-{i}"))
                    .spawn(move || worker_loop(kind, rx, abandon))
                    .map_err(|e| PipelineError::PoolStart {
                        kind,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("{kind} pool: started {size} workers");
        Ok(Self {
            kind,
            size,
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            abandon,
            next_id: AtomicU64::new(0),
            timeout,
        })
    }

    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_shut_down(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Queue `task`. Never blocks. Fails only after [`WorkerPool::shutdown`]; the task's
    /// completion callback is then dropped without running and the caller accounts for it.
    pub fn submit<T: Send + 'static>(&self, task: Task<T>) -> Result<TaskHandle, TaskError> {
        let Task {
            label,
            body,
            on_complete,
            cancelled,
        } = task;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let settled = Arc::new(AtomicBool::new(false));
        let slot = Arc::new(CompletionSlot {
            callback: Mutex::new(Some(on_complete)),
            settled: Arc::clone(&settled),
        });
        let work: Work = Box::new(Queued {
            id,
            kind: self.kind,
            label,
            body,
            cancelled,
            slot,
            timeout: self.timeout.clone(),
        });

        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) if tx.send(work).is_ok() => Ok(TaskHandle { id, settled }),
            _ => Err(TaskError::PoolClosed(self.kind)),
        }
    }

    /// Stop accepting tasks. With `drain_pending`, queued tasks still run and this call waits for
    /// the workers to finish. Without it, queued tasks are settled as closed and running tasks are
    /// left to finish on their own; the call returns immediately.
    pub fn shutdown(&self, drain_pending: bool) {
        let mut guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            return;
        }
        if !drain_pending {
            // Set before closing so no worker picks up a queued task in between.
            self.abandon.store(true, Ordering::Release);
        }
        drop(guard.take());
        drop(guard);
        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if drain_pending {
            debug!("{} pool: draining {} workers", self.kind, workers.len());
            for h in workers {
                let _ = h.join();
            }
        } else {
            debug!("{} pool: abandoning pending tasks", self.kind);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets idle workers exit; nothing is joined here.
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
    }
}

/// The three stage pools plus the watchdog that enforces their timeouts.
pub struct WorkerPools {
    pub search: WorkerPool,
    pub crawl: WorkerPool,
    pub parse: WorkerPool,
    watchdog: Arc<Watchdog>,
}

impl WorkerPools {
    pub fn new(sizes: &PoolSizes, timeouts: &StageTimeouts) -> Result<Self, PipelineError> {
        let watchdog = Arc::new(Watchdog::start().map_err(|e| PipelineError::PoolStart {
            kind: PoolKind::Search,
            reason: format!("watchdog: {e}"),
        })?);
        let pool = |kind: PoolKind, size: usize, timeout: Option<Duration>| match timeout {
            Some(t) => WorkerPool::with_timeout(kind, size, t, Arc::clone(&watchdog)),
            None => WorkerPool::new(kind, size),
        };
        Ok(Self {
            search: pool(PoolKind::Search, sizes.search, timeouts.search)?,
            crawl: pool(PoolKind::Crawl, sizes.crawl, timeouts.crawl)?,
            parse: pool(PoolKind::Parse, sizes.parse, timeouts.parse)?,
            watchdog,
        })
    }

    pub fn get(&self, kind: PoolKind) -> &WorkerPool {
        match kind {
            PoolKind::Search => &self.search,
            PoolKind::Crawl => &self.crawl,
            PoolKind::Parse => &self.parse,
        }
    }

    /// Shut down all three pools, then the watchdog.
    pub fn shutdown(&self, drain_pending: bool) {
        self.search.shutdown(drain_pending);
        self.crawl.shutdown(drain_pending);
        self.parse.shutdown(drain_pending);
        self.watchdog.stop();
    }
}
