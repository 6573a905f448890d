//! Web-search seam: the provider trait, the resumable cursor jobs search through, URL
//! blacklisting, and a provider over a local directory of text files.

use log::{debug, warn};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::SearchError;
use crate::utils::config::{DEFAULT_URL_BLACKLIST, SearchConsts};
use crate::utils::tools::{domain_suffixes, glob_match, host_of, path_relative_to, word_spans};
use crate::{SearchQuery, SearchResult};

/// One page of provider results. `no_more_results` signals exhaustion; providers must not error
/// when their result set is consumed.
#[derive(Clone, Debug, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub no_more_results: bool,
}

/// A web-search backend. Blocking; called from the search pool.
pub trait SearchProvider: Send + Sync {
    /// Fetch `page` (0-based) of `results_per_page` results for `query`.
    fn search(
        &self,
        query: &SearchQuery,
        page: usize,
        results_per_page: usize,
    ) -> Result<SearchPage, SearchError>;
}

/// Host patterns whose results are never crawled.
#[derive(Clone, Debug)]
pub struct UrlBlacklist {
    patterns: Vec<String>,
}

impl UrlBlacklist {
    /// Default patterns plus `extra`.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> =
            DEFAULT_URL_BLACKLIST.iter().map(|s| s.to_string()).collect();
        patterns.extend(extra.into_iter().map(Into::into));
        Self { patterns }
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        domain_suffixes(host).any(|d| self.patterns.iter().any(|p| glob_match(p, d)))
    }
}

impl Default for UrlBlacklist {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

/// Resumable position in one query's result stream.
///
/// Owns the provider handle, the next page to request, results fetched but not yet handed out,
/// and the URLs already handed out, so a follow-up job ("more results") continues paginating
/// instead of restarting.
pub struct SearchCursor {
    provider: Arc<dyn SearchProvider>,
    query: SearchQuery,
    next_page: usize,
    next_rank: usize,
    exhausted: bool,
    buffered: VecDeque<SearchResult>,
    seen_urls: HashSet<String>,
}

impl SearchCursor {
    pub fn new(provider: Arc<dyn SearchProvider>, query: SearchQuery) -> Self {
        Self {
            provider,
            query,
            next_page: 0,
            next_rank: 0,
            exhausted: false,
            buffered: VecDeque::new(),
            seen_urls: HashSet::new(),
        }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn has_no_more_results(&self) -> bool {
        self.exhausted && self.buffered.is_empty()
    }

    /// Pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.next_page
    }

    /// Collect up to `target` new, non-blacklisted results. Ranks continue from the previous
    /// fetch; results past `target` on the last page are kept for the next call. A provider
    /// error is returned only when nothing was collected in this call.
    pub fn fetch(
        &mut self,
        target: usize,
        blacklist: &UrlBlacklist,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut out = Vec::new();
        self.take_buffered(&mut out, target, blacklist);
        let mut pages = 0;
        while out.len() < target && !self.exhausted && pages < SearchConsts::MAX_PAGES_PER_FETCH {
            let page = match self.provider.search(
                &self.query,
                self.next_page,
                SearchConsts::RESULTS_PER_PAGE,
            ) {
                Ok(page) => page,
                Err(e) if out.is_empty() => return Err(e),
                Err(e) => {
                    warn!("search: stopping early after provider error: {e}");
                    break;
                }
            };
            self.next_page += 1;
            pages += 1;
            self.exhausted = page.no_more_results || page.results.is_empty();
            self.buffered.extend(page.results);
            self.take_buffered(&mut out, target, blacklist);
        }
        Ok(out)
    }

    fn take_buffered(
        &mut self,
        out: &mut Vec<SearchResult>,
        target: usize,
        blacklist: &UrlBlacklist,
    ) {
        while out.len() < target {
            let Some(mut result) = self.buffered.pop_front() else {
                return;
            };
            if blacklist.is_blacklisted(&result.url) {
                debug!("search: skipping blacklisted {}", result.url);
                continue;
            }
            if !self.seen_urls.insert(result.url.clone()) {
                continue;
            }
            result.rank = self.next_rank;
            self.next_rank += 1;
            out.push(result);
        }
    }
}

struct CorpusFile {
    path: PathBuf,
    display: String,
    title: String,
    snippet: String,
    /// Lowercased word tokens.
    words: Vec<String>,
}

/// [`SearchProvider`] over text files under a directory. Files score by query-term hits.
///
/// With `restricted_domains`, only files under the configured subdirectories are returned.
pub struct LocalCorpusSearch {
    root: PathBuf,
    files: Vec<CorpusFile>,
    restricted: Vec<PathBuf>,
}

const CORPUS_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm"];
const SNIPPET_CHARS: usize = 160;

impl LocalCorpusSearch {
    /// Walk `root` and load every text file.
    pub fn open(root: &Path) -> Result<Self, SearchError> {
        let root = root
            .canonicalize()
            .map_err(|e| SearchError::Unreachable(format!("{}: {e}", root.display())))?;
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true).into_iter() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("corpus: skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !has_corpus_extension(entry.path()) {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => files.push(corpus_file(&root, entry.path(), &text)),
                Err(e) => warn!("corpus: skipping {}: {e}", entry.path().display()),
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("corpus: loaded {} files from {}", files.len(), root.display());
        Ok(Self {
            root,
            files,
            restricted: Vec::new(),
        })
    }

    /// A corpus with no files; every search comes back exhausted.
    pub fn empty() -> Self {
        Self {
            root: PathBuf::new(),
            files: Vec::new(),
            restricted: Vec::new(),
        }
    }

    /// Subdirectories (relative to the root) that count as restricted domains.
    pub fn with_restricted<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.restricted = dirs.into_iter().map(|d| self.root.join(d)).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn score(file: &CorpusFile, terms: &[String]) -> usize {
        file.words
            .iter()
            .filter(|w| terms.iter().any(|t| t == *w))
            .count()
    }
}

impl SearchProvider for LocalCorpusSearch {
    fn search(
        &self,
        query: &SearchQuery,
        page: usize,
        results_per_page: usize,
    ) -> Result<SearchPage, SearchError> {
        let terms: Vec<String> = word_spans(&query.query)
            .into_iter()
            .map(|(_, w)| w.to_lowercase())
            .collect();
        let mut scored: Vec<(usize, &CorpusFile)> = self
            .files
            .iter()
            .filter(|f| {
                !query.restricted_domains || self.restricted.iter().any(|d| f.path.starts_with(d))
            })
            .map(|f| (Self::score(f, &terms), f))
            .filter(|(s, _)| *s > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.path.cmp(&b.1.path)));

        let start = page * results_per_page;
        let end = (start + results_per_page).min(scored.len());
        let results = scored
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, (_, f))| SearchResult {
                title: f.title.clone(),
                url: format!("file://{}", f.path.display()),
                display_url: f.display.clone(),
                snippet: f.snippet.clone(),
                rank: start + i,
            })
            .collect();
        Ok(SearchPage {
            results,
            no_more_results: end >= scored.len(),
        })
    }
}

fn has_corpus_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CORPUS_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

fn corpus_file(root: &Path, path: &Path, text: &str) -> CorpusFile {
    let display = path_relative_to(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string();
    let title = text
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(80).collect())
        .unwrap_or_else(|| display.clone());
    let snippet = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SNIPPET_CHARS)
        .collect();
    let words = word_spans(text)
        .into_iter()
        .map(|(_, w)| w.to_lowercase())
        .collect();
    CorpusFile {
        path: path.to_path_buf(),
        display,
        title,
        snippet,
        words,
    }
}
