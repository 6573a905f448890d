mod common;

use common::doc;
use flair::document::{Construction, Document, DocumentCollection, ReadabilityLevel};
use flair::rank::{Dimension, DocumentRanker, RankerConfig, SortMode};
use flair::{KeywordHits, Language, Span};
use std::sync::Arc;

const EPS: f64 = 1e-9;

fn collection(docs: Vec<Arc<Document>>) -> DocumentCollection {
    let mut c = DocumentCollection::new(Language::English);
    for d in docs {
        c.add(d).unwrap();
    }
    c
}

/// Three documents at levels A, B and C with ranks 0, 1, 2.
fn abc() -> DocumentCollection {
    collection(vec![
        doc(0, ReadabilityLevel::A, 100, &[]),
        doc(1, ReadabilityLevel::B, 100, &[]),
        doc(2, ReadabilityLevel::C, 100, &[]),
    ])
}

fn with_keywords(document: Arc<Document>, n: usize) -> Arc<Document> {
    let mut d = (*document).clone();
    let mut hits = KeywordHits::default();
    for i in 0..n {
        hits.push("river", Span::new(i, i + 5));
    }
    d.set_keyword_hits(hits);
    Arc::new(d)
}

fn negation() -> Dimension {
    Dimension::Construction(Construction::from("negation"))
}

// --- filtering ---

#[test]
fn test_no_weights_keeps_rank_order() {
    let ranking = DocumentRanker::new(RankerConfig::default()).rerank(&abc());
    assert_eq!(ranking.ranks(), vec![0, 1, 2]);
    assert_eq!(ranking.num_filtered, 0);
    assert_eq!(ranking.sort_mode, SortMode::Rank);
}

#[test]
fn test_disabled_level_is_filtered() {
    let config = RankerConfig::default().with_level(ReadabilityLevel::B, false);
    let ranking = DocumentRanker::new(config).rerank(&abc());
    assert_eq!(ranking.ranks(), vec![0, 2]);
    assert_eq!(ranking.num_filtered, 1);
}

#[test]
fn test_filtering_is_monotonic() {
    let c = abc();
    let mut config = RankerConfig::default();
    let mut last = DocumentRanker::new(config.clone()).rerank(&c).documents.len();
    for level in ReadabilityLevel::ALL {
        config = config.with_level(level, false);
        let ranking = DocumentRanker::new(config.clone()).rerank(&c);
        assert!(ranking.documents.len() <= last);
        assert_eq!(ranking.documents.len() + ranking.num_filtered, c.len());
        last = ranking.documents.len();
    }
    assert_eq!(last, 0);
}

#[test]
fn test_disabled_construction_drops_documents_containing_it() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 50, &[("passive_voice", 1)]),
        doc(1, ReadabilityLevel::A, 50, &[("negation", 2)]),
        doc(2, ReadabilityLevel::B, 50, &[("passive_voice", 0)]),
    ]);
    let config = RankerConfig::default().with_disabled_construction("passive_voice");
    let ranking = DocumentRanker::new(config).rerank(&c);
    // An empty span list does not count as containing the construction.
    assert_eq!(ranking.ranks(), vec![1, 2]);
    assert_eq!(ranking.num_filtered, 1);
}

#[test]
fn test_custom_filter_applies() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 20, &[]),
        doc(1, ReadabilityLevel::A, 200, &[]),
        doc(2, ReadabilityLevel::A, 80, &[]),
    ]);
    let config = RankerConfig::default().with_filter(|d| d.length() >= 50);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert_eq!(ranking.ranks(), vec![1, 2]);
    assert_eq!(ranking.num_filtered, 1);
}

// --- ordering ---

#[test]
fn test_construction_weight_sorts_by_score() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 100, &[]),
        doc(1, ReadabilityLevel::A, 100, &[("negation", 2)]),
        doc(2, ReadabilityLevel::A, 100, &[]),
        doc(3, ReadabilityLevel::A, 100, &[("negation", 2)]),
        doc(4, ReadabilityLevel::A, 100, &[("negation", 5)]),
    ]);
    let config = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert_eq!(ranking.sort_mode, SortMode::Score);
    // Ties keep rank order.
    assert_eq!(ranking.ranks(), vec![4, 1, 3, 0, 2]);
    let scores: Vec<f64> = ranking.documents.iter().map(|d| d.score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(scores[3], 0.0);
}

#[test]
fn test_length_weight_alone_sorts_shortest_first() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 300, &[]),
        doc(1, ReadabilityLevel::B, 100, &[]),
        doc(2, ReadabilityLevel::C, 200, &[]),
        doc(3, ReadabilityLevel::A, 100, &[]),
    ]);
    let config = RankerConfig::default().with_length_weight(5.0);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert_eq!(ranking.sort_mode, SortMode::Length);
    assert_eq!(ranking.ranks(), vec![1, 3, 2, 0]);
}

#[test]
fn test_unordered_collection_comes_back_in_rank_order() {
    let c = collection(vec![
        doc(2, ReadabilityLevel::A, 10, &[]),
        doc(0, ReadabilityLevel::A, 10, &[]),
        doc(1, ReadabilityLevel::A, 10, &[]),
    ]);
    let ranking = DocumentRanker::new(RankerConfig::default()).rerank(&c);
    assert_eq!(ranking.ranks(), vec![0, 1, 2]);
}

#[test]
fn test_level_weight_prefers_that_level() {
    let config = RankerConfig::default().with_level_weight(ReadabilityLevel::C, 1.0);
    assert!(config.has_scoring_weights());
    let ranking = DocumentRanker::new(config).rerank(&abc());
    assert_eq!(ranking.sort_mode, SortMode::Score);
    assert_eq!(ranking.ranks(), vec![2, 0, 1]);
    assert!(ranking.documents[0].score > 0.0);
}

#[test]
fn test_keyword_weight_scores_hits() {
    let c = collection(vec![
        with_keywords(doc(0, ReadabilityLevel::A, 100, &[]), 1),
        with_keywords(doc(1, ReadabilityLevel::A, 100, &[]), 4),
        doc(2, ReadabilityLevel::A, 100, &[]),
    ]);
    let config = RankerConfig::default().with_keyword_weight(1.0);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert_eq!(ranking.ranks(), vec![1, 0, 2]);
    assert_eq!(ranking.weights.get(&Dimension::Keywords).unwrap().df, 2);
}

#[test]
fn test_full_length_normalization_favours_shorter_documents() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 150, &[("negation", 1)]),
        doc(1, ReadabilityLevel::A, 50, &[("negation", 1)]),
    ]);

    let flat = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(flat.clone()).rerank(&c);
    assert_eq!(ranking.ranks(), vec![0, 1]);
    assert!((ranking.documents[0].score - ranking.documents[1].score).abs() < EPS);

    let normalized = flat.with_length_weight(10.0);
    let ranking = DocumentRanker::new(normalized).rerank(&c);
    assert_eq!(ranking.ranks(), vec![1, 0]);
    assert!((ranking.weights.b - 1.0).abs() < EPS);
}

// --- weights ---

#[test]
fn test_idf_and_score_values() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 100, &[("negation", 1)]),
        doc(1, ReadabilityLevel::A, 100, &[]),
    ]);
    let config = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(config).rerank(&c);

    let stats = ranking.weights.get(&negation()).unwrap();
    assert_eq!(stats.df, 1);
    assert!((stats.idf - 3f64.ln()).abs() < EPS);
    assert!((stats.weight - 1.0).abs() < EPS);
    assert!((ranking.weights.avg_length - 100.0).abs() < EPS);
    assert_eq!(ranking.weights.document_count, 2);

    // b = 0 and tf = 1: (k1 + 1) / (1 + k1) = 1, so the score is the idf.
    assert_eq!(ranking.ranks(), vec![0, 1]);
    assert!((ranking.documents[0].score - 3f64.ln()).abs() < EPS);
    assert_eq!(ranking.documents[1].score, 0.0);
}

#[test]
fn test_absent_dimension_has_zero_idf() {
    let config = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(config).rerank(&abc());
    let stats = ranking.weights.get(&negation()).unwrap();
    assert_eq!(stats.df, 0);
    assert_eq!(stats.idf, 0.0);
    assert!(ranking.documents.iter().all(|d| d.score == 0.0));
    assert_eq!(ranking.ranks(), vec![0, 1, 2]);
}

#[test]
fn test_weights_are_normalized_by_absolute_sum() {
    let config = RankerConfig::default()
        .with_construction_weight("negation", 3.0)
        .with_construction_weight("passive_voice", -2.0)
        .with_construction_weight("question", 0.0)
        .with_keyword_weight(1.0);
    let ranking = DocumentRanker::new(config).rerank(&abc());
    let w = |d: &Dimension| ranking.weights.get(d).unwrap().weight;

    assert!((w(&negation()) - 0.5).abs() < EPS);
    assert!((w(&Dimension::Construction(Construction::from("passive_voice"))) + 1.0 / 3.0).abs() < EPS);
    assert!((w(&Dimension::Keywords) - 1.0 / 6.0).abs() < EPS);
    // Zero-weight constructions are not dimensions.
    assert!(ranking
        .weights
        .get(&Dimension::Construction(Construction::from("question")))
        .is_none());
}

#[test]
fn test_zero_length_documents_score_zero() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::A, 0, &[("negation", 1)]),
        doc(1, ReadabilityLevel::A, 0, &[("negation", 3)]),
    ]);
    let config = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert_eq!(ranking.weights.avg_length, 0.0);
    assert!(ranking.documents.iter().all(|d| d.score == 0.0));
    assert_eq!(ranking.ranks(), vec![0, 1]);
}

#[test]
fn test_empty_collection_ranks_to_nothing() {
    let c = DocumentCollection::new(Language::German);
    let config = RankerConfig::default().with_construction_weight("negation", 1.0);
    let ranking = DocumentRanker::new(config).rerank(&c);
    assert!(ranking.documents.is_empty());
    assert_eq!(ranking.num_filtered, 0);
    assert_eq!(ranking.weights.document_count, 0);
    assert_eq!(ranking.weights.avg_length, 0.0);
}

// --- purity ---

#[test]
fn test_rerank_is_idempotent_and_leaves_collection_alone() {
    let c = collection(vec![
        doc(0, ReadabilityLevel::B, 120, &[("negation", 1)]),
        doc(1, ReadabilityLevel::A, 80, &[("negation", 3), ("question", 1)]),
        doc(2, ReadabilityLevel::C, 40, &[("question", 2)]),
    ]);
    let before: Vec<usize> = c.iter().map(|d| d.rank()).collect();
    let ranker = DocumentRanker::new(
        RankerConfig::default()
            .with_construction_weight("negation", 2.0)
            .with_construction_weight("question", 1.0)
            .with_length_weight(4.0),
    );

    let first = ranker.rerank(&c);
    let second = ranker.rerank(&c);
    assert_eq!(first.ranks(), second.ranks());
    for (a, b) in first.documents.iter().zip(&second.documents) {
        assert_eq!(a.score, b.score);
    }
    assert_eq!(first.weights, second.weights);
    let after: Vec<usize> = c.iter().map(|d| d.rank()).collect();
    assert_eq!(before, after);
    assert_eq!(c.len(), 3);
}

#[test]
fn test_length_weight_is_clamped() {
    assert_eq!(RankerConfig::default().with_length_weight(25.0).length_weight, 10.0);
    assert_eq!(RankerConfig::default().with_length_weight(-1.0).length_weight, 0.0);
}
