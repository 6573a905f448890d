//! Shared job bookkeeping: state, outstanding-work accounting, the document accumulator and
//! the event channel. Every mutation goes through one mutex per job.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::events::{JobEvent, JobOutcome, JobState};
use crate::document::{Document, DocumentCollection};
use crate::error::PipelineError;
use crate::pool::WorkerPools;
use crate::services::{KeywordSearcher, ParserCache};
use crate::{KeywordSet, Language, OperationKind, SearchResult};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handles every job needs to submit parse work.
#[derive(Clone)]
pub struct JobContext {
    pub pools: Arc<WorkerPools>,
    pub parsers: Arc<ParserCache>,
    pub keywords: Arc<dyn KeywordSearcher>,
    pub keyword_set: Arc<KeywordSet>,
}

/// A job the pipeline can start. Not reusable: [`Job::start`] runs once per instance.
pub trait Job: Send + Sync + 'static {
    fn core(&self) -> &Arc<JobCore>;

    /// Submit the first stage. Returns without waiting for any task.
    fn start(self: Arc<Self>);
}

struct JobInner {
    state: JobState,
    /// Submitted crawl/parse slots not yet settled. A crawl slot turns into a parse slot.
    pending: usize,
    /// No more slots will be added.
    fan_out_done: bool,
    collection: DocumentCollection,
    num_failed: usize,
    outcome: Option<JobOutcome>,
}

/// State machine and accumulator behind one job.
pub struct JobCore {
    id: u64,
    kind: OperationKind,
    language: Language,
    cancelled: Arc<AtomicBool>,
    inner: Mutex<JobInner>,
    done: Condvar,
    events: Sender<JobEvent>,
}

impl JobCore {
    /// New core in [`JobState::Created`] and the receiving end of its event channel.
    pub fn new(kind: OperationKind, language: Language) -> (Arc<Self>, Receiver<JobEvent>) {
        let (tx, rx) = unbounded();
        let core = Arc::new(Self {
            id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            language,
            cancelled: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(JobInner {
                state: JobState::Created,
                pending: 0,
                fan_out_done: false,
                collection: DocumentCollection::new(language),
                num_failed: 0,
                outcome: None,
            }),
            done: Condvar::new(),
            events: tx,
        });
        (core, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Flag handed to every task so queued work is discarded once the job is cancelled.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, JobInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: JobEvent) {
        // Nobody listening is fine; the outcome is still recorded.
        let _ = self.events.send(event);
    }

    fn set_state(&self, inner: &mut JobInner, to: JobState) {
        if inner.state != to {
            debug!("job #{}: {} -> {}", self.id, inner.state, to);
            inner.state = to;
        }
    }

    /// True while results may still be aggregated.
    fn is_live(&self, inner: &JobInner) -> bool {
        !self.is_cancelled() && !inner.state.is_terminal()
    }

    /// Move to a non-terminal stage. False when the job is already over.
    pub fn enter(&self, to: JobState) -> bool {
        let mut inner = self.lock();
        if !self.is_live(&inner) {
            return false;
        }
        // Stages only move forward; a late crawl never drags the job back from parsing.
        if (inner.state as u8) < (to as u8) {
            self.set_state(&mut inner, to);
        }
        true
    }

    /// Emit an event if the job is still live.
    pub fn emit_live(&self, event: JobEvent) -> bool {
        let inner = self.lock();
        if !self.is_live(&inner) {
            return false;
        }
        self.emit(event);
        true
    }

    /// Reserve `n` slots before submitting their tasks. False when the job is already over.
    pub fn add_pending(&self, n: usize) -> bool {
        let mut inner = self.lock();
        if !self.is_live(&inner) {
            return false;
        }
        inner.pending += n;
        true
    }

    /// No more slots will be reserved. Completes the job if nothing is outstanding.
    pub fn finish_fan_out(&self) {
        let mut inner = self.lock();
        inner.fan_out_done = true;
        self.try_finish(&mut inner);
    }

    /// Report a crawl. A failed crawl settles its slot; a successful one keeps it for the
    /// parse that follows. Returns false when the result was discarded.
    pub fn crawl_complete(&self, result: SearchResult, extracted: bool) -> bool {
        let mut inner = self.lock();
        if !self.is_live(&inner) {
            debug!(
                "job #{}: discarding crawl of {} after cancel",
                self.id, result.url
            );
            return false;
        }
        self.emit(JobEvent::CrawlComplete { result, extracted });
        if !extracted {
            self.settle_failed_locked(&mut inner);
        }
        true
    }

    /// Aggregate a parsed document and settle its slot.
    pub fn parse_complete(&self, document: Arc<Document>) {
        let mut inner = self.lock();
        if !self.is_live(&inner) {
            debug!(
                "job #{}: discarding document #{} after cancel",
                self.id,
                document.rank()
            );
            return;
        }
        match inner.collection.add(Arc::clone(&document)) {
            Ok(()) => {
                self.emit(JobEvent::ParseComplete { document });
                inner.pending = inner.pending.saturating_sub(1);
                self.try_finish(&mut inner);
            }
            Err(e) => {
                warn!("job #{}: {e}", self.id);
                self.settle_failed_locked(&mut inner);
            }
        }
    }

    /// Settle one slot that produced no document.
    pub fn settle_failed(&self) {
        let mut inner = self.lock();
        if self.is_live(&inner) {
            self.settle_failed_locked(&mut inner);
        }
    }

    fn settle_failed_locked(&self, inner: &mut JobInner) {
        inner.pending = inner.pending.saturating_sub(1);
        inner.num_failed += 1;
        self.try_finish(inner);
    }

    /// Fire `JobComplete` once every slot settled after fan-out.
    fn try_finish(&self, inner: &mut JobInner) {
        if !self.is_live(inner) || !inner.fan_out_done || inner.pending > 0 {
            return;
        }
        let collection = Arc::new(inner.collection.clone());
        let num_failed = inner.num_failed;
        self.set_state(inner, JobState::Complete);
        info!(
            "Job #{} complete: {} documents, {} failed",
            self.id,
            collection.len(),
            num_failed
        );
        self.emit(JobEvent::JobComplete {
            collection: Arc::clone(&collection),
            num_failed,
        });
        inner.outcome = Some(JobOutcome::Completed {
            collection,
            num_failed,
        });
        self.done.notify_all();
    }

    /// Stage-level failure: one `JobFailed`, terminal, no `JobComplete`.
    pub fn fail(&self, error: PipelineError) {
        let mut inner = self.lock();
        if !self.is_live(&inner) {
            return;
        }
        error!("Job #{} failed: {error}", self.id);
        self.set_state(&mut inner, JobState::Failed);
        self.emit(JobEvent::JobFailed {
            error: error.clone(),
        });
        inner.outcome = Some(JobOutcome::Failed(error));
        self.done.notify_all();
    }

    /// Cancel the job. False when it had already finished.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        self.cancelled.store(true, Ordering::Release);
        self.set_state(&mut inner, JobState::Cancelled);
        info!("Job #{} cancelled", self.id);
        self.emit(JobEvent::Cancelled);
        inner.outcome = Some(JobOutcome::Cancelled);
        self.done.notify_all();
        true
    }

    /// Block until the job is terminal.
    pub fn wait(&self) -> JobOutcome {
        let mut inner = self.lock();
        loop {
            if let Some(outcome) = &inner.outcome {
                return outcome.clone();
            }
            inner = self
                .done
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`JobCore::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if let Some(outcome) = &inner.outcome {
                return Some(outcome.clone());
            }
            let left = deadline.checked_duration_since(Instant::now())?;
            inner = self
                .done
                .wait_timeout(inner, left)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
