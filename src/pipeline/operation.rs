//! Cancelable, waitable handles over one job each.

use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::custom_parse::CustomParseJob;
use super::events::{JobEvent, JobOutcome, JobState};
use super::job::Job;
use super::search_crawl_parse::SearchCrawlParseJob;
use crate::error::PipelineError;
use crate::services::SearchCursor;
use crate::{Language, OperationKind};

/// Handle over exactly one job. Events queue in the channel from creation on, so nothing is
/// missed by attaching a reader after [`Operation::begin`].
pub struct Operation<J: Job> {
    job: Arc<J>,
    begun: AtomicBool,
    events: Receiver<JobEvent>,
}

pub type SearchCrawlParseOperation = Operation<SearchCrawlParseJob>;
pub type CustomParseOperation = Operation<CustomParseJob>;

impl<J: Job> Operation<J> {
    pub fn new(job: Arc<J>, events: Receiver<JobEvent>) -> Self {
        Self {
            job,
            begun: AtomicBool::new(false),
            events,
        }
    }

    pub fn id(&self) -> u64 {
        self.job.core().id()
    }

    pub fn kind(&self) -> OperationKind {
        self.job.core().kind()
    }

    pub fn language(&self) -> Language {
        self.job.core().language()
    }

    pub fn job(&self) -> &Arc<J> {
        &self.job
    }

    /// Start the job. A second call is an error.
    pub fn begin(&self) -> Result<(), PipelineError> {
        if self.begun.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::AlreadyBegun);
        }
        Arc::clone(&self.job).start();
        Ok(())
    }

    pub fn is_begun(&self) -> bool {
        self.begun.load(Ordering::Acquire)
    }

    /// Cancel the job. False when it had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        self.job.core().cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.job.core().is_cancelled()
    }

    /// Completed, cancelled or failed.
    pub fn is_completed(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn state(&self) -> JobState {
        self.job.core().state()
    }

    /// Block until the job is terminal. Waiting on an operation that was never begun (and
    /// not cancelled) would block forever and is an error instead.
    pub fn wait_for_completion(&self) -> Result<JobOutcome, PipelineError> {
        self.check_waitable()?;
        Ok(self.job.core().wait())
    }

    /// `Ok(None)` when `timeout` elapsed first.
    pub fn wait_for_completion_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<JobOutcome>, PipelineError> {
        self.check_waitable()?;
        Ok(self.job.core().wait_timeout(timeout))
    }

    fn check_waitable(&self) -> Result<(), PipelineError> {
        if !self.is_begun() && !self.is_cancelled() {
            return Err(PipelineError::NotBegun);
        }
        Ok(())
    }

    /// Events emitted since the last call, without blocking.
    pub fn drain_events(&self) -> Vec<JobEvent> {
        self.events.try_iter().collect()
    }

    /// A receiver for this operation's events. Clones share one queue; each event is delivered
    /// to exactly one of them.
    pub fn event_receiver(&self) -> Receiver<JobEvent> {
        self.events.clone()
    }
}

impl SearchCrawlParseOperation {
    /// The search cursor for a "more results" follow-up. Call after the job finished.
    pub fn take_cursor(&self) -> Option<SearchCursor> {
        self.job.take_cursor()
    }
}

/// Object-safe view over either operation kind.
pub trait PipelineOperation: Send + Sync {
    fn id(&self) -> u64;
    fn kind(&self) -> OperationKind;
    fn begin(&self) -> Result<(), PipelineError>;
    fn cancel(&self) -> bool;
    fn is_cancelled(&self) -> bool;
    fn is_completed(&self) -> bool;
    fn state(&self) -> JobState;
    fn wait_for_completion(&self) -> Result<JobOutcome, PipelineError>;
    fn event_receiver(&self) -> Receiver<JobEvent>;
}

impl<J: Job> PipelineOperation for Operation<J> {
    fn id(&self) -> u64 {
        Operation::id(self)
    }

    fn kind(&self) -> OperationKind {
        Operation::kind(self)
    }

    fn begin(&self) -> Result<(), PipelineError> {
        Operation::begin(self)
    }

    fn cancel(&self) -> bool {
        Operation::cancel(self)
    }

    fn is_cancelled(&self) -> bool {
        Operation::is_cancelled(self)
    }

    fn is_completed(&self) -> bool {
        Operation::is_completed(self)
    }

    fn state(&self) -> JobState {
        Operation::state(self)
    }

    fn wait_for_completion(&self) -> Result<JobOutcome, PipelineError> {
        Operation::wait_for_completion(self)
    }

    fn event_receiver(&self) -> Receiver<JobEvent> {
        Operation::event_receiver(self)
    }
}
