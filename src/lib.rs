//! Flair: a concurrent search, crawl and parse pipeline that feeds a document ranker for
//! language learners.
//!
//! Build a [`MasterJobPipeline`] once, create operations from it (directly or through a
//! [`SessionState`]), then rank the finished [`DocumentCollection`] with a [`DocumentRanker`].

pub mod document;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod rank;
pub mod services;
pub mod session;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use document::{
    Construction, Document, DocumentCollection, Readability, ReadabilityLevel, TextStats,
};
pub use error::{CrawlError, ParseError, PipelineError, SearchError, TaskError};
pub use pipeline::{
    CustomParseOperation, JobEvent, JobOutcome, JobState, MasterJobPipeline, PipelineOperation,
    SearchCrawlParseOperation,
};
pub use rank::{DocumentRanker, RankerConfig, Ranking};
pub use services::Services;
pub use session::{SessionMessage, SessionState};
pub use utils::config::PipelineConfig;

/// Result alias for the library's fallible operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
