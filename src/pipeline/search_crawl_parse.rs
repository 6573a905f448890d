//! Search, then crawl every result, then parse every page that yielded text.

use log::{debug, warn};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use super::events::JobState;
use super::job::{Job, JobContext, JobCore};
use super::stages::submit_parse;
use crate::error::{PipelineError, TaskError};
use crate::pool::{Task, TaskOutcome};
use crate::services::{CrawledPage, Crawler, SearchCursor, UrlBlacklist};
use crate::{ParseSource, SearchResult};

/// Drives `CREATED -> SEARCHING -> CRAWLING -> PARSING -> COMPLETE`.
///
/// The search cursor lives in the job while it runs and can be taken afterwards to continue
/// the same result stream in a new job.
pub struct SearchCrawlParseJob {
    core: Arc<JobCore>,
    ctx: JobContext,
    crawler: Arc<dyn Crawler>,
    blacklist: Arc<UrlBlacklist>,
    num_results: usize,
    cursor: Mutex<Option<SearchCursor>>,
}

impl SearchCrawlParseJob {
    pub fn new(
        core: Arc<JobCore>,
        ctx: JobContext,
        crawler: Arc<dyn Crawler>,
        blacklist: Arc<UrlBlacklist>,
        cursor: SearchCursor,
        num_results: usize,
    ) -> Self {
        Self {
            core,
            ctx,
            crawler,
            blacklist,
            num_results,
            cursor: Mutex::new(Some(cursor)),
        }
    }

    /// The cursor, once the search stage is done with it. `None` while a search still holds it
    /// (e.g. one that outlived its timeout) or after it was taken.
    pub fn take_cursor(&self) -> Option<SearchCursor> {
        match self.cursor.try_lock() {
            Ok(mut guard) => guard.take(),
            Err(TryLockError::Poisoned(p)) => p.into_inner().take(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn search(&self) -> Result<Vec<SearchResult>, TaskError> {
        let mut guard = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let cursor = guard
            .as_mut()
            .ok_or_else(|| TaskError::Failed("search cursor already taken".to_string()))?;
        Ok(cursor.fetch(self.num_results, &self.blacklist)?)
    }

    fn on_search_complete(self: &Arc<Self>, outcome: TaskOutcome<Vec<SearchResult>>) {
        let results = match outcome {
            TaskOutcome::Completed(results) => results,
            TaskOutcome::Failed(e) => {
                self.core.fail(PipelineError::SearchStage(e));
                return;
            }
            TaskOutcome::Discarded => return,
        };
        debug!(
            "job #{}: search returned {} results",
            self.core.id(),
            results.len()
        );
        if !self.core.enter(JobState::Crawling) || !self.core.add_pending(results.len()) {
            return;
        }
        for result in results {
            self.submit_crawl(result);
        }
        self.core.finish_fan_out();
    }

    fn submit_crawl(self: &Arc<Self>, result: SearchResult) {
        let crawler = Arc::clone(&self.crawler);
        let target = result.clone();
        let body = move || crawler.crawl(&target).map_err(TaskError::from);

        let job = Arc::clone(self);
        let settled = result.clone();
        let on_complete = move |outcome| job.on_crawl_complete(settled, outcome);

        let task = Task::new(format!("crawl #{} {}", result.rank, result.url), body, on_complete)
            .with_cancel_flag(self.core.cancel_flag());
        if let Err(e) = self.ctx.pools.crawl.submit(task) {
            warn!("job #{}: could not submit crawl: {e}", self.core.id());
            self.core.crawl_complete(result, false);
        }
    }

    fn on_crawl_complete(&self, result: SearchResult, outcome: TaskOutcome<CrawledPage>) {
        match outcome {
            TaskOutcome::Completed(page) => {
                let rank = result.rank;
                if !self.core.crawl_complete(result, true) || !self.core.enter(JobState::Parsing)
                {
                    return;
                }
                let source = ParseSource::new(rank, page.title, page.text).with_url(page.url);
                submit_parse(&self.core, &self.ctx, source);
            }
            TaskOutcome::Failed(e) => {
                warn!("job #{}: crawl of {} failed: {e}", self.core.id(), result.url);
                self.core.crawl_complete(result, false);
            }
            TaskOutcome::Discarded => {}
        }
    }
}

impl Job for SearchCrawlParseJob {
    fn core(&self) -> &Arc<JobCore> {
        &self.core
    }

    fn start(self: Arc<Self>) {
        if !self.core.enter(JobState::Searching) {
            return;
        }
        let job = Arc::clone(&self);
        let body = move || job.search();
        let job = Arc::clone(&self);
        let on_complete = move |outcome| job.on_search_complete(outcome);

        let task = Task::new(format!("search job #{}", self.core.id()), body, on_complete)
            .with_cancel_flag(self.core.cancel_flag());
        if let Err(e) = self.ctx.pools.search.submit(task) {
            self.core.fail(PipelineError::SearchStage(e));
        }
    }
}
