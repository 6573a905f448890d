use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use super::readability::{Readability, ReadabilityLevel, TextStats};
use crate::error::PipelineError;
use crate::{KeywordHits, Language, ParseSource, Span};

/// Name of a grammatical construction a parser can tag (e.g. `negation`, `passive_voice`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Construction(String);

impl Construction {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Construction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Construction {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Construction {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A parsed document.
///
/// Text and source never change after construction. The parsed flag is set exactly once by the
/// pipeline; keyword hits may be attached afterwards. Readability is computed on first access
/// unless the parser supplied one.
#[derive(Clone, Debug)]
pub struct Document {
    rank: usize,
    title: String,
    url: Option<String>,
    language: Language,
    text: String,
    stats: TextStats,
    constructions: BTreeMap<Construction, Vec<Span>>,
    readability: OnceLock<Readability>,
    keyword_hits: Option<KeywordHits>,
    parsed: bool,
}

impl Document {
    pub fn new(
        source: &ParseSource,
        language: Language,
        stats: TextStats,
        constructions: BTreeMap<Construction, Vec<Span>>,
    ) -> Self {
        Self {
            rank: source.rank,
            title: source.title.clone(),
            url: source.url.clone(),
            language,
            text: source.text.clone(),
            stats,
            constructions,
            readability: OnceLock::new(),
            keyword_hits: None,
            parsed: false,
        }
    }

    /// Use a parser-supplied readability instead of the language strategy.
    pub fn with_readability(self, readability: Readability) -> Self {
        let _ = self.readability.set(readability);
        self
    }

    /// Flag the document as parsed. Flagging twice is a contract violation.
    pub fn mark_parsed(&mut self) -> Result<(), PipelineError> {
        if self.parsed {
            return Err(PipelineError::AlreadyParsed(self.rank));
        }
        self.parsed = true;
        Ok(())
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn stats(&self) -> &TextStats {
        &self.stats
    }

    /// Length in words; the unit the ranker normalizes by.
    pub fn length(&self) -> usize {
        self.stats.word_count
    }

    pub fn readability(&self) -> &Readability {
        self.readability
            .get_or_init(|| Readability::compute(self.language, &self.stats))
    }

    pub fn readability_level(&self) -> ReadabilityLevel {
        self.readability().level()
    }

    pub fn constructions(&self) -> impl Iterator<Item = (&Construction, &[Span])> {
        self.constructions.iter().map(|(c, s)| (c, s.as_slice()))
    }

    pub fn construction_count(&self, construction: &str) -> usize {
        self.constructions.get(construction).map_or(0, Vec::len)
    }

    pub fn has_construction(&self, construction: &str) -> bool {
        self.construction_count(construction) > 0
    }

    pub fn set_keyword_hits(&mut self, hits: KeywordHits) {
        self.keyword_hits = Some(hits);
    }

    pub fn keyword_hits(&self) -> Option<&KeywordHits> {
        self.keyword_hits.as_ref()
    }

    pub fn keyword_count(&self) -> usize {
        self.keyword_hits.as_ref().map_or(0, |h| h.total_count)
    }
}
