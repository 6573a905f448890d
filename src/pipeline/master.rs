//! Factory for operations: owns the stage pools and the per-language parser cache.

use log::{debug, info};
use std::sync::Arc;

use super::custom_parse::CustomParseJob;
use super::job::{JobContext, JobCore};
use super::operation::{CustomParseOperation, Operation, SearchCrawlParseOperation};
use super::search_crawl_parse::SearchCrawlParseJob;
use crate::error::PipelineError;
use crate::pool::WorkerPools;
use crate::services::{ParserCache, SearchCursor, Services, SharedParser, UrlBlacklist};
use crate::utils::config::PipelineConfig;
use crate::{KeywordSet, Language, OperationKind, ParseSource, SearchQuery};

/// Built once per process and shared (via `Arc`) by every session. Creating an operation only
/// wires a job; nothing runs until [`Operation::begin`].
pub struct MasterJobPipeline {
    pools: Arc<WorkerPools>,
    parsers: Arc<ParserCache>,
    services: Services,
    blacklist: Arc<UrlBlacklist>,
}

impl MasterJobPipeline {
    pub fn new(config: &PipelineConfig, services: Services) -> Result<Self, PipelineError> {
        let pools = WorkerPools::new(&config.pool_sizes, &config.timeouts)?;
        info!(
            "Pipeline ready: search {}, crawl {}, parse {} workers",
            pools.search.size(),
            pools.crawl.size(),
            pools.parse.size()
        );
        Ok(Self {
            pools: Arc::new(pools),
            parsers: Arc::new(ParserCache::new(Arc::clone(&services.parsers))),
            blacklist: Arc::new(UrlBlacklist::new(config.blacklist.iter().cloned())),
            services,
        })
    }

    pub fn pools(&self) -> &WorkerPools {
        &self.pools
    }

    pub fn blacklist(&self) -> &UrlBlacklist {
        &self.blacklist
    }

    pub fn is_language_supported(&self, language: Language) -> bool {
        self.parsers.is_language_supported(language)
    }

    /// The shared parser for `language`, built on first use.
    pub fn parser_for(&self, language: Language) -> Result<Arc<SharedParser>, PipelineError> {
        self.parsers
            .get(language)
            .map_err(|_| PipelineError::UnsupportedLanguage(language))
    }

    /// Languages whose parser has been constructed.
    pub fn loaded_parsers(&self) -> Vec<Language> {
        self.parsers.loaded()
    }

    fn context(&self, keywords: KeywordSet) -> JobContext {
        JobContext {
            pools: Arc::clone(&self.pools),
            parsers: Arc::clone(&self.parsers),
            keywords: Arc::clone(&self.services.keywords),
            keyword_set: Arc::new(keywords),
        }
    }

    fn check_language(&self, language: Language) -> Result<(), PipelineError> {
        if !self.is_language_supported(language) {
            return Err(PipelineError::UnsupportedLanguage(language));
        }
        Ok(())
    }

    pub fn do_search_crawl_parse(
        &self,
        language: Language,
        query: &str,
        use_restricted_domains: bool,
        num_results: usize,
        keywords: KeywordSet,
    ) -> Result<SearchCrawlParseOperation, PipelineError> {
        let query = SearchQuery::new(language, query, use_restricted_domains);
        let cursor = SearchCursor::new(Arc::clone(&self.services.search), query);
        self.search_operation(cursor, num_results, keywords)
    }

    /// Continue `cursor`'s result stream in a new operation ("more results").
    pub fn do_search_more(
        &self,
        cursor: SearchCursor,
        num_results: usize,
        keywords: KeywordSet,
    ) -> Result<SearchCrawlParseOperation, PipelineError> {
        debug!(
            "search more: '{}' from page {}",
            cursor.query().query,
            cursor.pages_fetched()
        );
        self.search_operation(cursor, num_results, keywords)
    }

    fn search_operation(
        &self,
        cursor: SearchCursor,
        num_results: usize,
        keywords: KeywordSet,
    ) -> Result<SearchCrawlParseOperation, PipelineError> {
        let language = cursor.query().language;
        self.check_language(language)?;
        let (core, events) = JobCore::new(OperationKind::SearchCrawlParse, language);
        let job = SearchCrawlParseJob::new(
            core,
            self.context(keywords),
            Arc::clone(&self.services.crawler),
            Arc::clone(&self.blacklist),
            cursor,
            num_results,
        );
        Ok(Operation::new(Arc::new(job), events))
    }

    pub fn do_document_parsing(
        &self,
        language: Language,
        sources: Vec<ParseSource>,
        keywords: KeywordSet,
    ) -> Result<CustomParseOperation, PipelineError> {
        self.check_language(language)?;
        let (core, events) = JobCore::new(OperationKind::CustomParse, language);
        let job = CustomParseJob::new(core, self.context(keywords), sources);
        Ok(Operation::new(Arc::new(job), events))
    }

    /// Tear down all pools without waiting for running tasks.
    pub fn shutdown(&self) {
        info!("Pipeline shutting down");
        self.pools.shutdown(false);
    }
}
