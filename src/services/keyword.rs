//! Keyword search over parsed documents.

use crate::document::Document;
use crate::utils::tools::word_spans;
use crate::{KeywordHits, KeywordSet, Span};

/// Finds keyword occurrences in a document.
pub trait KeywordSearcher: Send + Sync {
    fn search(&self, document: &Document, keywords: &KeywordSet) -> KeywordHits;
}

/// Case-insensitive whole-word matcher. Multi-word keywords match consecutive words.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleKeywordSearcher;

impl KeywordSearcher for SimpleKeywordSearcher {
    fn search(&self, document: &Document, keywords: &KeywordSet) -> KeywordHits {
        let mut hits = KeywordHits::default();
        if keywords.is_empty() {
            return hits;
        }
        let words = word_spans(document.text());
        let lowered: Vec<String> = words.iter().map(|(_, w)| w.to_lowercase()).collect();

        for keyword in keywords.iter() {
            let parts: Vec<String> = word_spans(keyword)
                .into_iter()
                .map(|(_, w)| w.to_lowercase())
                .collect();
            if parts.is_empty() || parts.len() > lowered.len() {
                continue;
            }
            for start in 0..=lowered.len() - parts.len() {
                if lowered[start..start + parts.len()] == parts[..] {
                    let span = Span::new(words[start].0.start, words[start + parts.len() - 1].0.end);
                    hits.push(keyword, span);
                }
            }
        }
        hits
    }
}
