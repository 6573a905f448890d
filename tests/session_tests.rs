mod common;

use common::{Gate, LONG_TEXT, MapCrawler, SHORT_TEXT, StaticSearch, TestParserFactory, pipeline};
use flair::engine::cli::{Interrupt, handle_interrupt};
use flair::error::{PipelineError, SearchError};
use flair::rank::RankerConfig;
use flair::session::{MessageQueue, SessionMessage};
use flair::{KeywordSet, Language, ParseSource, SessionState};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const URL_A: &str = "https://one.example.org/a";

fn session_with(search: StaticSearch, crawler: MapCrawler) -> SessionState {
    let p = pipeline(
        Arc::new(search),
        Arc::new(crawler),
        Arc::new(TestParserFactory::new()),
    );
    SessionState::new(Arc::new(p))
}

fn idle_session() -> SessionState {
    session_with(StaticSearch::new(&[]), MapCrawler::new())
}

fn sources(n: usize) -> Vec<ParseSource> {
    (0..n)
        .map(|i| ParseSource::new(i, format!("upload {i}"), LONG_TEXT))
        .collect()
}

fn many_urls(n: usize) -> (Vec<String>, MapCrawler) {
    let urls: Vec<String> = (0..n).map(|i| format!("https://s{i}.example.org/p")).collect();
    let crawler = urls
        .iter()
        .fold(MapCrawler::new(), |c, u| c.page(u, SHORT_TEXT));
    (urls, crawler)
}

// --- one operation at a time ---

#[test]
fn test_second_operation_is_refused_while_first_runs() {
    let gate = Gate::new();
    let crawler = MapCrawler::new()
        .page(URL_A, SHORT_TEXT)
        .gated(URL_A, Arc::clone(&gate));
    let session = session_with(StaticSearch::new(&[URL_A]), crawler);

    let first = session
        .search_crawl_parse(Language::English, "q", false, 1, KeywordSet::default())
        .unwrap();
    assert!(session.is_busy());
    assert_eq!(session.active_operation(), Some(first));
    assert!(matches!(
        session.parse_documents(Language::English, sources(1), KeywordSet::default()),
        Err(PipelineError::PreviousStateNotCleared)
    ));
    assert!(matches!(
        session.load_more_results(5),
        Err(PipelineError::PreviousStateNotCleared)
    ));

    assert!(session.cancel_operation());
    gate.open();
    assert!(session.wait_for_operation().unwrap().is_cancelled());
    assert!(!session.is_busy());
    assert!(!session.cancel_operation());

    let second = session
        .parse_documents(Language::English, sources(1), KeywordSet::default())
        .unwrap();
    assert_ne!(first, second);
    assert!(session.wait_for_operation().unwrap().is_completed());
}

#[test]
fn test_wait_without_operation_is_an_error() {
    let session = idle_session();
    assert!(matches!(
        session.wait_for_operation(),
        Err(PipelineError::NotBegun)
    ));
    assert_eq!(session.active_operation(), None);
}

// --- message queue ---

#[test]
fn test_messages_arrive_in_order_for_custom_parse() {
    let session = idle_session();
    let id = session
        .parse_documents(Language::English, sources(2), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();

    let messages = session.fetch_messages();
    assert_eq!(messages.len(), 4);
    assert!(messages.iter().all(|m| m.operation() == id));
    assert!(matches!(&messages[0], SessionMessage::JobBegin { sources, .. } if sources.len() == 2));
    assert!(matches!(messages[1], SessionMessage::ParseComplete { .. }));
    assert!(matches!(messages[2], SessionMessage::ParseComplete { .. }));
    assert_eq!(
        messages[3],
        SessionMessage::JobComplete {
            operation: id,
            documents: 2,
            failed: 0,
        }
    );
    assert!(session.fetch_messages().is_empty());
}

#[test]
fn test_new_operation_clears_stale_messages() {
    let session = idle_session();
    session
        .parse_documents(Language::English, sources(3), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();

    // Nothing fetched from the first operation.
    let second = session
        .parse_documents(Language::English, sources(1), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();
    let messages = session.fetch_messages();
    assert!(!messages.is_empty());
    assert!(messages.iter().all(|m| m.operation() == second));
    assert_eq!(session.collection().unwrap().len(), 1);
}

#[test]
fn test_search_failure_becomes_error_message() {
    let session = session_with(
        StaticSearch::failing(SearchError::Unauthorized("bad key".into())),
        MapCrawler::new(),
    );
    let id = session
        .search_crawl_parse(Language::English, "q", false, 3, KeywordSet::default())
        .unwrap();
    assert!(!session.wait_for_operation().unwrap().is_completed());

    let messages = session.fetch_messages();
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        SessionMessage::Error { operation, message } => {
            assert_eq!(*operation, id);
            assert!(message.contains("bad key"));
        }
        other => panic!("expected error message, got {other:?}"),
    }
    assert!(session.collection().is_none());
}

#[test]
fn test_message_queue_drains_fifo() {
    let queue = MessageQueue::default();
    assert!(queue.is_empty());
    for operation in 1..=3 {
        queue.push(SessionMessage::Cancelled { operation });
    }
    assert_eq!(queue.len(), 3);
    let ids: Vec<u64> = queue.drain_all().iter().map(|m| m.operation()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(queue.is_empty());

    queue.push(SessionMessage::Cancelled { operation: 9 });
    queue.clear();
    assert!(queue.drain_all().is_empty());
}

#[test]
fn test_messages_serialize_with_type_tag() {
    let json = serde_json::to_value(SessionMessage::JobComplete {
        operation: 7,
        documents: 3,
        failed: 1,
    })
    .unwrap();
    assert_eq!(json["type"], "job_complete");
    assert_eq!(json["operation"], 7);
    assert_eq!(json["documents"], 3);
    assert_eq!(json["failed"], 1);

    let json = serde_json::to_value(SessionMessage::Cancelled { operation: 2 }).unwrap();
    assert_eq!(json["type"], "cancelled");
}

// --- collection and reranking ---

#[test]
fn test_rerank_needs_a_collection() {
    let session = idle_session();
    assert!(matches!(
        session.rerank(&RankerConfig::default()),
        Err(PipelineError::NoCollection)
    ));

    session
        .parse_documents(Language::English, sources(3), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();
    let ranking = session.rerank(&RankerConfig::default()).unwrap();
    assert_eq!(ranking.ranks(), vec![0, 1, 2]);

    // Reranking again with another config uses the same cached documents.
    let ranking = session
        .rerank(&RankerConfig::default().with_construction_weight("modal_verb", 1.0))
        .unwrap();
    assert_eq!(ranking.documents.len(), 3);
}

#[test]
fn test_load_more_appends_to_collection() {
    let (urls, crawler) = many_urls(15);
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let session = session_with(StaticSearch::new(&url_refs), crawler);

    session
        .search_crawl_parse(Language::English, "q", false, 10, KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();
    assert_eq!(session.collection().unwrap().len(), 10);
    assert!(session.can_load_more());

    session.load_more_results(10).unwrap();
    let outcome = session.wait_for_operation().unwrap();
    assert_eq!(outcome.collection().unwrap().len(), 5);

    let collection = session.collection().unwrap();
    assert_eq!(collection.len(), 15);
    let mut ranks: Vec<usize> = collection.iter().map(|d| d.rank()).collect();
    ranks.sort();
    assert_eq!(ranks, (0..15).collect::<Vec<_>>());
    assert!(!session.can_load_more());

    let messages = session.fetch_messages();
    assert!(matches!(
        messages.last(),
        Some(SessionMessage::JobComplete { documents: 15, .. })
    ));
}

fn spin_until_idle(session: &SessionState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while session.is_busy() {
        assert!(Instant::now() < deadline, "session stayed busy");
        thread::yield_now();
    }
}

#[test]
fn test_load_more_after_polling_busy_keeps_first_batch() {
    for _ in 0..30 {
        let (urls, crawler) = many_urls(15);
        let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let session = session_with(StaticSearch::new(&url_refs), crawler);

        session
            .search_crawl_parse(Language::English, "q", false, 10, KeywordSet::default())
            .unwrap();
        spin_until_idle(&session);
        // Not busy means the first batch is cached and every message is queued.
        assert_eq!(session.collection().unwrap().len(), 10);
        assert!(matches!(
            session.fetch_messages().last(),
            Some(SessionMessage::JobComplete { documents: 10, .. })
        ));

        session.load_more_results(10).unwrap();
        spin_until_idle(&session);
        assert_eq!(session.collection().unwrap().len(), 15);
    }
}

#[test]
fn test_new_operation_right_after_completion_gets_clean_queue() {
    for _ in 0..30 {
        let session = idle_session();
        let first = session
            .parse_documents(Language::English, sources(4), KeywordSet::default())
            .unwrap();
        // Start the next one as soon as the job itself is terminal, without waiting on the
        // session.
        let second = loop {
            match session.parse_documents(Language::English, sources(1), KeywordSet::default()) {
                Ok(id) => break id,
                Err(PipelineError::PreviousStateNotCleared) => thread::yield_now(),
                Err(e) => panic!("unexpected error: {e}"),
            }
        };
        assert_ne!(first, second);
        session.wait_for_operation().unwrap();
        let messages = session.fetch_messages();
        assert!(messages.iter().all(|m| m.operation() == second));
        assert_eq!(messages.len(), 3);
        assert_eq!(session.collection().unwrap().len(), 1);
    }
}

#[test]
fn test_interrupt_cancels_running_operation_or_exits() {
    let gate = Gate::new();
    let crawler = MapCrawler::new()
        .page(URL_A, SHORT_TEXT)
        .gated(URL_A, Arc::clone(&gate));
    let session = session_with(StaticSearch::new(&[URL_A]), crawler);
    assert_eq!(handle_interrupt(&session), Interrupt::Exit);

    session
        .search_crawl_parse(Language::English, "q", false, 1, KeywordSet::default())
        .unwrap();
    assert_eq!(handle_interrupt(&session), Interrupt::Cancelled);
    gate.open();
    assert!(session.wait_for_operation().unwrap().is_cancelled());
    // Ranking or printing afterwards: nothing left to cancel.
    assert_eq!(handle_interrupt(&session), Interrupt::Exit);
}

#[test]
fn test_load_more_without_search_has_no_cursor() {
    let session = idle_session();
    assert!(matches!(
        session.load_more_results(5),
        Err(PipelineError::NoCursor)
    ));

    session
        .parse_documents(Language::English, sources(1), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();
    assert!(!session.can_load_more());
    assert!(matches!(
        session.load_more_results(5),
        Err(PipelineError::NoCursor)
    ));
}

#[test]
fn test_release_drops_everything() {
    let session = idle_session();
    session
        .parse_documents(Language::English, sources(2), KeywordSet::default())
        .unwrap();
    session.wait_for_operation().unwrap();
    assert!(session.collection().is_some());

    session.release();
    assert!(session.collection().is_none());
    assert_eq!(session.active_operation(), None);
    assert!(session.fetch_messages().is_empty());
    assert!(matches!(
        session.rerank(&RankerConfig::default()),
        Err(PipelineError::NoCollection)
    ));
}

#[test]
fn test_unsupported_language_leaves_session_idle() {
    let factory = TestParserFactory {
        unsupported: vec![Language::German],
        ..TestParserFactory::new()
    };
    let p = pipeline(
        Arc::new(StaticSearch::new(&[])),
        Arc::new(MapCrawler::new()),
        Arc::new(factory),
    );
    let session = SessionState::new(Arc::new(p));
    assert!(matches!(
        session.parse_documents(Language::German, sources(1), KeywordSet::default()),
        Err(PipelineError::UnsupportedLanguage(Language::German))
    ));
    assert!(!session.is_busy());
    assert_eq!(session.active_operation(), None);
}
