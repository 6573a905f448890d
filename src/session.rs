//! Per-user session: at most one active operation, a pull queue of outbound messages, and the
//! cached collection the user reranks.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use log::{debug, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::document::{DocumentCollection, ReadabilityLevel};
use crate::error::PipelineError;
use crate::pipeline::{
    CustomParseOperation, JobEvent, JobOutcome, MasterJobPipeline, PipelineOperation,
    SearchCrawlParseOperation,
};
use crate::rank::{DocumentRanker, RankerConfig, Ranking};
use crate::services::SearchCursor;
use crate::{KeywordSet, Language, ParseSource, SearchResult, SourceInfo};

/// Notification for the client, tagged with the operation it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    JobBegin {
        operation: u64,
        sources: Vec<SourceInfo>,
    },
    CrawlComplete {
        operation: u64,
        result: SearchResult,
        extracted: bool,
    },
    ParseComplete {
        operation: u64,
        rank: usize,
        title: String,
        words: usize,
        level: ReadabilityLevel,
    },
    JobComplete {
        operation: u64,
        documents: usize,
        failed: usize,
    },
    Error {
        operation: u64,
        message: String,
    },
    Cancelled {
        operation: u64,
    },
}

impl SessionMessage {
    pub fn operation(&self) -> u64 {
        match self {
            SessionMessage::JobBegin { operation, .. }
            | SessionMessage::CrawlComplete { operation, .. }
            | SessionMessage::ParseComplete { operation, .. }
            | SessionMessage::JobComplete { operation, .. }
            | SessionMessage::Error { operation, .. }
            | SessionMessage::Cancelled { operation } => *operation,
        }
    }
}

/// FIFO of outbound messages. Nothing enqueued is lost before the next [`MessageQueue::drain_all`].
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<VecDeque<SessionMessage>>,
}

impl MessageQueue {
    fn lock(&self) -> MutexGuard<'_, VecDeque<SessionMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: SessionMessage) {
        self.lock().push_back(message);
    }

    pub fn drain_all(&self) -> Vec<SessionMessage> {
        self.lock().drain(..).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

enum ActiveOperation {
    SearchCrawlParse(Arc<SearchCrawlParseOperation>),
    CustomParse(Arc<CustomParseOperation>),
}

impl ActiveOperation {
    fn as_dyn(&self) -> Arc<dyn PipelineOperation> {
        match self {
            ActiveOperation::SearchCrawlParse(op) => Arc::clone(op) as Arc<dyn PipelineOperation>,
            ActiveOperation::CustomParse(op) => Arc::clone(op) as Arc<dyn PipelineOperation>,
        }
    }
}

/// Completion signal of one relay thread. The thread holds the sender and never sends; the
/// channel disconnects when the thread exits, panicking or not.
#[derive(Clone)]
struct RelayDone(Receiver<()>);

impl RelayDone {
    fn is_finished(&self) -> bool {
        matches!(self.0.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn wait(&self) {
        let _ = self.0.recv();
    }
}

#[derive(Default)]
struct SessionInner {
    active: Option<ActiveOperation>,
    /// Set while the current operation's events may still be in flight to the queue.
    relay: Option<RelayDone>,
    collection: Option<Arc<DocumentCollection>>,
    /// Documents a "more results" operation is appended to.
    base: Option<Arc<DocumentCollection>>,
    cursor: Option<SearchCursor>,
    keywords: KeywordSet,
}

struct Shared {
    messages: MessageQueue,
    inner: Mutex<SessionInner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionInner {
    fn is_current(&self, id: u64) -> bool {
        self.active.as_ref().is_some_and(|a| a.as_dyn().id() == id)
    }

    /// The current operation is terminal but its relay is still queueing messages or caching
    /// the collection.
    fn pending_relay(&self) -> Option<RelayDone> {
        self.relay.as_ref().filter(|r| !r.is_finished()).cloned()
    }
}

/// One user's view of the pipeline. All operation state sits behind one mutex.
pub struct SessionState {
    pipeline: Arc<MasterJobPipeline>,
    shared: Arc<Shared>,
}

impl SessionState {
    pub fn new(pipeline: Arc<MasterJobPipeline>) -> Self {
        Self {
            pipeline,
            shared: Arc::new(Shared {
                messages: MessageQueue::default(),
                inner: Mutex::new(SessionInner::default()),
            }),
        }
    }

    pub fn pipeline(&self) -> &Arc<MasterJobPipeline> {
        &self.pipeline
    }

    /// Start a search-crawl-parse operation. Returns its id.
    pub fn search_crawl_parse(
        &self,
        language: Language,
        query: &str,
        use_restricted_domains: bool,
        num_results: usize,
        keywords: KeywordSet,
    ) -> Result<u64, PipelineError> {
        let mut inner = self.idle_inner()?;
        let op = self.pipeline.do_search_crawl_parse(
            language,
            query,
            use_restricted_domains,
            num_results,
            keywords.clone(),
        )?;
        inner.base = None;
        inner.keywords = keywords;
        self.launch(&mut inner, ActiveOperation::SearchCrawlParse(Arc::new(op)))
    }

    /// Parse uploaded sources. Returns the operation id.
    pub fn parse_documents(
        &self,
        language: Language,
        sources: Vec<ParseSource>,
        keywords: KeywordSet,
    ) -> Result<u64, PipelineError> {
        let mut inner = self.idle_inner()?;
        let op = self
            .pipeline
            .do_document_parsing(language, sources, keywords.clone())?;
        inner.base = None;
        inner.cursor = None;
        inner.keywords = keywords;
        self.launch(&mut inner, ActiveOperation::CustomParse(Arc::new(op)))
    }

    /// Continue the last search. New documents are appended to the cached collection.
    pub fn load_more_results(&self, num_results: usize) -> Result<u64, PipelineError> {
        let mut inner = self.idle_inner()?;
        let cursor = inner.cursor.take().ok_or(PipelineError::NoCursor)?;
        let keywords = inner.keywords.clone();
        let op = self
            .pipeline
            .do_search_more(cursor, num_results, keywords)?;
        inner.base = inner.collection.clone();
        self.launch(&mut inner, ActiveOperation::SearchCrawlParse(Arc::new(op)))
    }

    /// Lock the session for a new operation. Refuses while one runs. A finished operation is
    /// retired only after its relay has queued every message and cached the collection; the
    /// lock is released while waiting because the relay needs it.
    fn idle_inner(&self) -> Result<MutexGuard<'_, SessionInner>, PipelineError> {
        loop {
            let mut inner = self.shared.lock();
            if let Some(active) = &inner.active {
                if !active.as_dyn().is_completed() {
                    return Err(PipelineError::PreviousStateNotCleared);
                }
            }
            match inner.pending_relay() {
                Some(relay) => {
                    drop(inner);
                    relay.wait();
                }
                None => {
                    retire(&mut inner);
                    return Ok(inner);
                }
            }
        }
    }

    fn launch(
        &self,
        inner: &mut SessionInner,
        active: ActiveOperation,
    ) -> Result<u64, PipelineError> {
        let op = active.as_dyn();
        let id = op.id();
        self.shared.messages.clear();
        let events = op.event_receiver();
        let shared = Arc::clone(&self.shared);
        let (done_tx, done_rx) = bounded::<()>(0);
        thread::Builder::new()
            .name(format!("flair-session-relay-{id}"))
            .spawn(move || relay_events(shared, id, events, done_tx))
            .map_err(|e| PipelineError::RelayStart(e.to_string()))?;
        inner.active = Some(active);
        inner.relay = Some(RelayDone(done_rx));
        op.begin()?;
        debug!("session: operation #{id} begun");
        Ok(id)
    }

    /// Id of the current operation, finished or not.
    pub fn active_operation(&self) -> Option<u64> {
        self.shared.lock().active.as_ref().map(|a| a.as_dyn().id())
    }

    /// An operation is running, or its last messages and collection are not stored yet.
    pub fn is_busy(&self) -> bool {
        let inner = self.shared.lock();
        let running = inner
            .active
            .as_ref()
            .is_some_and(|a| !a.as_dyn().is_completed());
        running || inner.pending_relay().is_some()
    }

    /// Cancel the running operation. False when nothing was running.
    pub fn cancel_operation(&self) -> bool {
        let inner = self.shared.lock();
        inner.active.as_ref().is_some_and(|a| a.as_dyn().cancel())
    }

    /// Block until the current operation is terminal and its messages are queued.
    pub fn wait_for_operation(&self) -> Result<JobOutcome, PipelineError> {
        let (op, relay) = {
            let mut inner = self.shared.lock();
            let op = inner
                .active
                .as_ref()
                .map(ActiveOperation::as_dyn)
                .ok_or(PipelineError::NotBegun)?;
            (op, inner.relay.clone())
        };
        let outcome = op.wait_for_completion()?;
        if let Some(relay) = relay {
            relay.wait();
        }
        if let JobOutcome::Completed { .. } = outcome {
            let mut inner = self.shared.lock();
            stash_cursor(&mut inner);
        }
        Ok(outcome)
    }

    /// Cancel anything running and drop all session state.
    pub fn release(&self) {
        let mut inner = self.shared.lock();
        if let Some(active) = &inner.active {
            active.as_dyn().cancel();
        }
        *inner = SessionInner::default();
        self.shared.messages.clear();
    }

    /// Dequeue every pending message.
    pub fn fetch_messages(&self) -> Vec<SessionMessage> {
        self.shared.messages.drain_all()
    }

    pub fn collection(&self) -> Option<Arc<DocumentCollection>> {
        self.shared.lock().collection.clone()
    }

    /// A search cursor is available for [`SessionState::load_more_results`].
    pub fn can_load_more(&self) -> bool {
        let mut inner = self.shared.lock();
        stash_cursor(&mut inner);
        inner
            .cursor
            .as_ref()
            .is_some_and(|c| !c.has_no_more_results())
    }

    /// Rank the cached collection.
    pub fn rerank(&self, config: &RankerConfig) -> Result<Ranking, PipelineError> {
        let collection = self.collection().ok_or(PipelineError::NoCollection)?;
        Ok(DocumentRanker::new(config.clone()).rerank(&collection))
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        let inner = self.shared.lock();
        if let Some(active) = &inner.active {
            active.as_dyn().cancel();
        }
    }
}

/// Keep the finished search's cursor for "more results".
fn stash_cursor(inner: &mut SessionInner) {
    if let Some(ActiveOperation::SearchCrawlParse(op)) = &inner.active {
        if op.is_completed() {
            if let Some(cursor) = op.take_cursor() {
                inner.cursor = Some(cursor);
            }
        }
    }
}

fn retire(inner: &mut SessionInner) {
    stash_cursor(inner);
    inner.active = None;
    inner.relay = None;
}

/// Forward one operation's events into the session queue until its terminal event. Each
/// message is checked against the current operation and queued under the session lock, so a
/// released or replaced operation never leaks into the new one's queue.
fn relay_events(shared: Arc<Shared>, id: u64, events: Receiver<JobEvent>, _done: Sender<()>) {
    for event in events.iter() {
        let terminal = event.is_terminal();
        let mut inner = shared.lock();
        if !inner.is_current(id) {
            if terminal {
                break;
            }
            continue;
        }
        let message = match event {
            JobEvent::JobBegin { sources } => SessionMessage::JobBegin {
                operation: id,
                sources,
            },
            JobEvent::CrawlComplete { result, extracted } => SessionMessage::CrawlComplete {
                operation: id,
                result,
                extracted,
            },
            JobEvent::ParseComplete { document } => SessionMessage::ParseComplete {
                operation: id,
                rank: document.rank(),
                title: document.title().to_string(),
                words: document.length(),
                level: document.readability_level(),
            },
            JobEvent::JobComplete {
                collection,
                num_failed,
            } => SessionMessage::JobComplete {
                operation: id,
                documents: cache_collection(&mut inner, collection),
                failed: num_failed,
            },
            JobEvent::JobFailed { error } => SessionMessage::Error {
                operation: id,
                message: error.to_string(),
            },
            JobEvent::Cancelled => SessionMessage::Cancelled { operation: id },
        };
        shared.messages.push(message);
        drop(inner);
        if terminal {
            break;
        }
    }
    debug!("session: relay for operation #{id} done");
}

/// Store the finished collection, appended to the base for "more results". Returns its size.
fn cache_collection(inner: &mut SessionInner, collection: Arc<DocumentCollection>) -> usize {
    let merged = match inner.base.take() {
        Some(base) => {
            let mut merged = (*base).clone();
            for doc in collection.iter() {
                if let Err(e) = merged.add(Arc::clone(doc)) {
                    warn!("session: dropping document #{}: {e}", doc.rank());
                }
            }
            Arc::new(merged)
        }
        None => collection,
    };
    let len = merged.len();
    inner.collection = Some(merged);
    len
}
