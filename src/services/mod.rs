//! Collaborator seams the pipeline drives (search, crawl, parse, keyword search) and the
//! built-in implementations the CLI runs with.

pub mod crawl;
pub mod heuristic;
pub mod keyword;
pub mod parser;
pub mod search;

pub use crawl::{CrawledPage, Crawler, FileCrawler, strip_html};
pub use heuristic::{HeuristicParser, HeuristicParserFactory};
pub use keyword::{KeywordSearcher, SimpleKeywordSearcher};
pub use parser::{Parser, ParserCache, ParserFactory, SharedParser};
pub use search::{LocalCorpusSearch, SearchCursor, SearchPage, SearchProvider, UrlBlacklist};

use std::sync::Arc;

/// The collaborators a [`MasterJobPipeline`](crate::pipeline::MasterJobPipeline) wires into
/// every job it creates.
#[derive(Clone)]
pub struct Services {
    pub search: Arc<dyn SearchProvider>,
    pub crawler: Arc<dyn Crawler>,
    pub parsers: Arc<dyn ParserFactory>,
    pub keywords: Arc<dyn KeywordSearcher>,
}

impl Services {
    /// Local-corpus search, file crawler, heuristic parsers and the simple keyword searcher.
    pub fn local(search: Arc<dyn SearchProvider>) -> Self {
        Self {
            search,
            crawler: Arc::new(FileCrawler),
            parsers: Arc::new(HeuristicParserFactory),
            keywords: Arc::new(SimpleKeywordSearcher),
        }
    }
}
