//! Typed job events and terminal outcomes.

use std::fmt;
use std::sync::Arc;

use crate::document::{Document, DocumentCollection};
use crate::error::PipelineError;
use crate::{SearchResult, SourceInfo};

/// Lifecycle of one job. `Complete`, `Cancelled` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Searching,
    Crawling,
    Parsing,
    Complete,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Complete | JobState::Cancelled | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Created => "created",
            JobState::Searching => "searching",
            JobState::Crawling => "crawling",
            JobState::Parsing => "parsing",
            JobState::Complete => "complete",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything a job reports, in the order it happened. Within one search result a
/// `CrawlComplete` always precedes its `ParseComplete`; across results there is no order.
#[derive(Clone, Debug)]
pub enum JobEvent {
    /// Custom-parse only: the batch about to be parsed.
    JobBegin { sources: Vec<SourceInfo> },
    /// A crawl finished. `extracted` is false when it failed; no parse follows then.
    CrawlComplete { result: SearchResult, extracted: bool },
    ParseComplete { document: Arc<Document> },
    /// Fired once, after every submitted task settled. Never follows a cancel or failure.
    JobComplete {
        collection: Arc<DocumentCollection>,
        num_failed: usize,
    },
    /// The search stage failed; the job is over.
    JobFailed { error: PipelineError },
    Cancelled,
}

impl JobEvent {
    /// True for the last event a job emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobEvent::JobComplete { .. } | JobEvent::JobFailed { .. } | JobEvent::Cancelled
        )
    }
}

/// How a job ended, returned by
/// [`Operation::wait_for_completion`](super::Operation::wait_for_completion).
#[derive(Clone, Debug)]
pub enum JobOutcome {
    Completed {
        collection: Arc<DocumentCollection>,
        /// Crawl and parse tasks that produced no document.
        num_failed: usize,
    },
    Cancelled,
    Failed(PipelineError),
}

impl JobOutcome {
    pub fn collection(&self) -> Option<&Arc<DocumentCollection>> {
        match self {
            JobOutcome::Completed { collection, .. } => Some(collection),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }
}
