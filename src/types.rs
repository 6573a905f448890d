//! Public and internal types shared by the pipeline, services and ranker.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Languages the pipeline can search, parse and rank.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[value(alias = "en")]
    English,
    #[value(alias = "de")]
    German,
    #[value(alias = "ar")]
    Arabic,
}

impl Language {
    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
            Language::Arabic => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which kind of operation a job drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    SearchCrawlParse,
    CustomParse,
}

/// Parameters of one web search: what to look for and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    pub language: Language,
    pub query: String,
    /// Restrict results to the provider's curated domain list.
    pub restricted_domains: bool,
}

impl SearchQuery {
    pub fn new(language: Language, query: impl Into<String>, restricted_domains: bool) -> Self {
        Self {
            language,
            query: query.into(),
            restricted_domains,
        }
    }
}

/// One entry of a search provider's result list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub display_url: String,
    pub snippet: String,
    /// Position in the overall result stream (0-based, continues across "more results").
    pub rank: usize,
}

/// Already-fetched text handed to a parser: a crawled page or an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseSource {
    pub rank: usize,
    pub title: String,
    pub url: Option<String>,
    pub text: String,
}

impl ParseSource {
    pub fn new(rank: usize, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            rank,
            title: title.into(),
            url: None,
            text: text.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Descriptor without the text body, used for job-begin notifications.
    pub fn info(&self) -> SourceInfo {
        SourceInfo {
            rank: self.rank,
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Lightweight description of a [`ParseSource`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub rank: usize,
    pub title: String,
    pub url: Option<String>,
}

/// Byte range `[start, end)` into a document's text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized (lowercased, trimmed, deduplicated) set of keywords to look for in documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k = k.as_ref().trim().to_lowercase();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        Self { keywords: out }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

/// Result of a keyword search over one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KeywordHits {
    pub per_keyword: BTreeMap<String, Vec<Span>>,
    pub total_count: usize,
}

impl KeywordHits {
    /// Record one hit for `keyword`.
    pub fn push(&mut self, keyword: &str, span: Span) {
        self.per_keyword
            .entry(keyword.to_string())
            .or_default()
            .push(span);
        self.total_count += 1;
    }
}
