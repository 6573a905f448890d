//! Job orchestration: state machines over the stage pools, operation handles, and the factory
//! that wires them.

pub mod custom_parse;
pub mod events;
pub mod job;
pub mod master;
pub mod operation;
pub mod search_crawl_parse;
mod stages;

pub use custom_parse::CustomParseJob;
pub use events::{JobEvent, JobOutcome, JobState};
pub use job::{Job, JobContext, JobCore};
pub use master::MasterJobPipeline;
pub use operation::{
    CustomParseOperation, Operation, PipelineOperation, SearchCrawlParseOperation,
};
pub use search_crawl_parse::SearchCrawlParseJob;
