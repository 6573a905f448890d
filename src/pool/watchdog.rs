//! Deadline watchdog for pool tasks.
//!
//! One thread holds a min-heap of deadlines. When a deadline passes its action runs; for pool
//! tasks the action settles the task as timed out. The blocking call itself keeps running on its
//! worker thread and its late result is dropped by the completion slot. Tasks that finish in
//! time cancel their registration so nothing is held until the deadline.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, error};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

type Action = Box<dyn FnOnce() + Send>;

enum Command {
    Register {
        key: u64,
        deadline: Instant,
        action: Action,
    },
    Cancel(u64),
}

/// Runs registered actions once their deadline passes.
pub struct Watchdog {
    tx: Mutex<Option<Sender<Command>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    next_key: AtomicU64,
    pending: Arc<AtomicUsize>,
}

impl Watchdog {
    /// Start the watchdog thread.
    pub fn start() -> std::io::Result<Self> {
        let (tx, rx) = unbounded::<Command>();
        let pending = Arc::new(AtomicUsize::new(0));
        let pending_w = Arc::clone(&pending);
        let thread = thread::Builder::new()
            .name("flair-watchdog".to_string())
            .spawn(move || watchdog_loop(rx, pending_w))?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            thread: Mutex::new(Some(thread)),
            next_key: AtomicU64::new(0),
            pending,
        })
    }

    fn send(&self, command: Command) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(command);
        }
    }

    /// Schedule `action` to run at `deadline`. Ignored after [`Watchdog::stop`]. The returned key
    /// withdraws it through [`Watchdog::cancel`].
    pub fn register<F>(&self, deadline: Instant, action: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.send(Command::Register {
            key,
            deadline,
            action: Box::new(action),
        });
        key
    }

    /// Drop a registered action before its deadline. No-op if it already ran.
    pub fn cancel(&self, key: u64) {
        self.send(Command::Cancel(key));
    }

    /// Actions registered and neither run nor cancelled, as of the thread's last wakeup.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Stop the thread. Pending deadlines are dropped without running.
    pub fn stop(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        if let Some(h) = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            let _ = h.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
    }
}

/// Stale heap entries (cancelled keys) tolerated before the heap is rebuilt.
const STALE_SLACK: usize = 64;

fn watchdog_loop(rx: Receiver<Command>, pending: Arc<AtomicUsize>) {
    let mut heap: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    let mut actions: HashMap<u64, Action> = HashMap::new();

    loop {
        let received = match heap.peek() {
            Some(Reverse((deadline, _))) => match rx.recv_deadline(*deadline) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            },
        };
        match received {
            Some(Command::Register {
                key,
                deadline,
                action,
            }) => {
                heap.push(Reverse((deadline, key)));
                actions.insert(key, action);
            }
            Some(Command::Cancel(key)) => {
                actions.remove(&key);
                if heap.len() > 2 * actions.len() + STALE_SLACK {
                    heap.retain(|Reverse((_, k))| actions.contains_key(k));
                }
            }
            None => {}
        }

        let now = Instant::now();
        while let Some(Reverse((deadline, key))) = heap.peek().copied() {
            if deadline > now {
                break;
            }
            heap.pop();
            if let Some(action) = actions.remove(&key)
                && panic::catch_unwind(AssertUnwindSafe(action)).is_err()
            {
                error!("watchdog: deadline action panicked");
            }
        }
        pending.store(actions.len(), Ordering::Release);
    }
    debug!("watchdog: stopped with {} pending deadlines", actions.len());
}
