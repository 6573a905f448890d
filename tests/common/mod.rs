#![allow(dead_code)]

use flair::document::{Construction, Document, Readability, ReadabilityLevel, TextStats};
use flair::error::{CrawlError, ParseError, SearchError};
use flair::pipeline::{JobEvent, MasterJobPipeline, Operation};
use flair::pipeline::job::Job;
use flair::services::{
    CrawledPage, Crawler, HeuristicParser, Parser, ParserFactory, SearchPage, SearchProvider,
    Services, SimpleKeywordSearcher,
};
use flair::utils::config::{PipelineConfig, PoolSizes, StageTimeouts};
use flair::{Language, ParseSource, SearchQuery, SearchResult, Span};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

// --- gate ---

/// One-shot latch: `wait` blocks until `open`.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.cv.wait(open).unwrap();
        }
    }
}

// --- search ---

pub fn result(rank: usize, url: &str) -> SearchResult {
    SearchResult {
        title: format!("Result {rank}"),
        url: url.to_string(),
        display_url: url.trim_start_matches("https://").to_string(),
        snippet: String::new(),
        rank,
    }
}

/// Serves a fixed result list page by page, or fails every call.
pub struct StaticSearch {
    results: Vec<SearchResult>,
    error: Option<SearchError>,
    pub calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(urls: &[&str]) -> Self {
        Self {
            results: urls.iter().enumerate().map(|(i, u)| result(i, u)).collect(),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: SearchError) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error),
            calls: AtomicUsize::new(0),
        }
    }
}

impl SearchProvider for StaticSearch {
    fn search(
        &self,
        _query: &SearchQuery,
        page: usize,
        results_per_page: usize,
    ) -> Result<SearchPage, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let start = (page * results_per_page).min(self.results.len());
        let end = (start + results_per_page).min(self.results.len());
        Ok(SearchPage {
            results: self.results[start..end].to_vec(),
            no_more_results: end >= self.results.len(),
        })
    }
}

// --- crawl ---

/// Returns scripted text per URL; unknown URLs fail. URLs in `gated` wait for the gate.
#[derive(Default)]
pub struct MapCrawler {
    pages: HashMap<String, String>,
    gated: HashMap<String, Arc<Gate>>,
    pub calls: AtomicUsize,
}

impl MapCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn gated(mut self, url: &str, gate: Arc<Gate>) -> Self {
        self.gated.insert(url.to_string(), gate);
        self
    }
}

impl Crawler for MapCrawler {
    fn crawl(&self, result: &SearchResult) -> Result<CrawledPage, CrawlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gated.get(&result.url) {
            gate.wait();
        }
        match self.pages.get(&result.url) {
            Some(text) => Ok(CrawledPage {
                url: result.url.clone(),
                title: result.title.clone(),
                text: text.clone(),
            }),
            None => Err(CrawlError::Fetch {
                url: result.url.clone(),
                reason: "404".to_string(),
            }),
        }
    }
}

// --- parse ---

/// Heuristic parser with failure hooks: text containing `FAIL` errors, `PANIC` panics, and
/// every call waits on the gate if one is set. Tracks concurrent calls.
pub struct TestParser {
    inner: HeuristicParser,
    gate: Option<Arc<Gate>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl Parser for TestParser {
    fn is_language_supported(&self, language: Language) -> bool {
        self.inner.is_language_supported(language)
    }

    fn parse(&mut self, source: &ParseSource, language: Language) -> Result<Document, ParseError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        let out = if source.text.contains("PANIC") {
            self.active.fetch_sub(1, Ordering::SeqCst);
            panic!("parser blew up on #{}", source.rank);
        } else if source.text.contains("FAIL") {
            Err(ParseError::Engine(format!("cannot parse #{}", source.rank)))
        } else {
            std::thread::sleep(Duration::from_millis(2));
            self.inner.parse(source, language)
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[derive(Default)]
pub struct TestParserFactory {
    pub unsupported: Vec<Language>,
    pub gate: Option<Arc<Gate>>,
    pub created: AtomicUsize,
    pub active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
}

impl TestParserFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }
}

impl ParserFactory for TestParserFactory {
    fn is_language_supported(&self, language: Language) -> bool {
        !self.unsupported.contains(&language)
    }

    fn create(&self, language: Language) -> Result<Box<dyn Parser>, ParseError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TestParser {
            inner: HeuristicParser::new(language),
            gate: self.gate.clone(),
            active: Arc::clone(&self.active),
            max_active: Arc::clone(&self.max_active),
        }))
    }
}

// --- pipeline ---

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        pool_sizes: PoolSizes {
            search: 1,
            crawl: 4,
            parse: 4,
        },
        timeouts: StageTimeouts::none(),
        blacklist: Vec::new(),
    }
}

pub fn services(
    search: Arc<dyn SearchProvider>,
    crawler: Arc<dyn Crawler>,
    parsers: Arc<dyn ParserFactory>,
) -> Services {
    Services {
        search,
        crawler,
        parsers,
        keywords: Arc::new(SimpleKeywordSearcher),
    }
}

pub fn pipeline(
    search: Arc<dyn SearchProvider>,
    crawler: Arc<dyn Crawler>,
    parsers: Arc<dyn ParserFactory>,
) -> MasterJobPipeline {
    MasterJobPipeline::new(&test_config(), services(search, crawler, parsers)).unwrap()
}

/// [`pipeline`] with per-stage timeouts enforced by the watchdog.
pub fn pipeline_with_timeouts(
    search: Arc<dyn SearchProvider>,
    crawler: Arc<dyn Crawler>,
    parsers: Arc<dyn ParserFactory>,
    timeouts: StageTimeouts,
) -> MasterJobPipeline {
    let config = PipelineConfig {
        timeouts,
        ..test_config()
    };
    MasterJobPipeline::new(&config, services(search, crawler, parsers)).unwrap()
}

/// Receive events until the terminal one (or panic after [`EVENT_TIMEOUT`]).
pub fn events_until_terminal<J: Job>(op: &Operation<J>) -> Vec<JobEvent> {
    let rx = op.event_receiver();
    let deadline = Instant::now() + EVENT_TIMEOUT;
    let mut out = Vec::new();
    loop {
        let event = rx
            .recv_deadline(deadline)
            .expect("operation did not reach a terminal event in time");
        let terminal = event.is_terminal();
        out.push(event);
        if terminal {
            return out;
        }
    }
}

/// Receive events until `pred` matches one; returns everything received.
pub fn events_until<J: Job>(op: &Operation<J>, pred: impl Fn(&JobEvent) -> bool) -> Vec<JobEvent> {
    let rx = op.event_receiver();
    let deadline = Instant::now() + EVENT_TIMEOUT;
    let mut out = Vec::new();
    loop {
        let event = rx
            .recv_deadline(deadline)
            .expect("expected event did not arrive in time");
        let hit = pred(&event);
        out.push(event);
        if hit {
            return out;
        }
    }
}

pub fn count(events: &[JobEvent], pred: impl Fn(&JobEvent) -> bool) -> usize {
    events.iter().filter(|&e| pred(e)).count()
}

pub fn is_crawl(e: &JobEvent) -> bool {
    matches!(e, JobEvent::CrawlComplete { .. })
}

pub fn is_parse(e: &JobEvent) -> bool {
    matches!(e, JobEvent::ParseComplete { .. })
}

pub fn is_complete(e: &JobEvent) -> bool {
    matches!(e, JobEvent::JobComplete { .. })
}

// --- documents ---

pub const SHORT_TEXT: &str = "The cat sat on the mat. It was not happy.";
pub const LONG_TEXT: &str = "If the weather is good, we will walk to the river. \
    The bridge was built by the old king. Nobody could have known how long the road would be. \
    We were walking faster than the others.";

/// A parsed-looking document with fixed readability, length and construction counts.
pub fn doc(
    rank: usize,
    level: ReadabilityLevel,
    words: usize,
    constructions: &[(&str, usize)],
) -> Arc<Document> {
    let source = ParseSource::new(rank, format!("doc {rank}"), "text");
    let stats = TextStats {
        word_count: words,
        sentence_count: 1,
        syllable_count: words,
        long_word_count: 0,
    };
    let map: BTreeMap<Construction, Vec<Span>> = constructions
        .iter()
        .map(|(name, n)| {
            let spans = (0..*n).map(|i| Span::new(i, i + 1)).collect();
            (Construction::from(*name), spans)
        })
        .collect();
    let score = match level {
        ReadabilityLevel::A => 80.0,
        ReadabilityLevel::B => 45.0,
        ReadabilityLevel::C => 10.0,
    };
    let document = Document::new(&source, Language::English, stats, map)
        .with_readability(Readability::Standard { score, level });
    Arc::new(document)
}
