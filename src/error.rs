//! Error types for the pipeline, its tasks and the collaborator services.

use std::time::Duration;
use thiserror::Error;

use crate::Language;
use crate::pool::PoolKind;

/// Contract violations and job-level failures. Task-level failures are [`TaskError`]s and never
/// surface here except through [`PipelineError::SearchStage`].
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("operation already begun")]
    AlreadyBegun,

    #[error("operation has not been begun")]
    NotBegun,

    #[error("previous state not cleared: an operation is still active")]
    PreviousStateNotCleared,

    #[error("language '{0}' is not supported by the configured parser")]
    UnsupportedLanguage(Language),

    #[error("document language '{found}' does not match collection language '{expected}'")]
    LanguageMismatch { expected: Language, found: Language },

    #[error("document #{0} was already flagged as parsed")]
    AlreadyParsed(usize),

    #[error("no document collection is cached for this session")]
    NoCollection,

    #[error("no search cursor is available to continue from")]
    NoCursor,

    #[error("search stage failed: {0}")]
    SearchStage(TaskError),

    #[error("failed to start {kind} pool: {reason}")]
    PoolStart { kind: PoolKind, reason: String },

    #[error("failed to start session relay: {0}")]
    RelayStart(String),
}

/// Why a single search/crawl/parse task did not produce a result.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0} pool is shut down")]
    PoolClosed(PoolKind),
}

#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("search provider rejected credentials: {0}")]
    Unauthorized(String),

    #[error("search provider unreachable: {0}")]
    Unreachable(String),

    #[error("search provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("no text could be extracted from {0}")]
    NoText(String),
}

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("language '{0}' is not supported by this parser")]
    Unsupported(Language),

    #[error("source #{0} has no text to parse")]
    Empty(usize),

    #[error("parser failed: {0}")]
    Engine(String),
}
