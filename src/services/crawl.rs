//! Crawl seam: fetch a search result and extract its readable text.

use scraper::{Html, Node};
use std::path::Path;

use crate::SearchResult;
use crate::error::CrawlError;

/// Text extracted from one crawled page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawledPage {
    pub url: String,
    pub title: String,
    pub text: String,
}

/// Fetches pages. Blocking; called from the crawl pool. Calls must be safe to repeat.
pub trait Crawler: Send + Sync {
    fn crawl(&self, result: &SearchResult) -> Result<CrawledPage, CrawlError>;
}

/// [`Crawler`] for `file://` URLs and plain paths. HTML files have their markup stripped.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileCrawler;

impl Crawler for FileCrawler {
    fn crawl(&self, result: &SearchResult) -> Result<CrawledPage, CrawlError> {
        let path = result.url.strip_prefix("file://").unwrap_or(&result.url);
        let path = Path::new(path);
        let raw = std::fs::read_to_string(path).map_err(|e| CrawlError::Fetch {
            url: result.url.clone(),
            reason: e.to_string(),
        })?;
        let is_html = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
        let text = if is_html { strip_html(&raw) } else { raw };
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(CrawlError::NoText(result.url.clone()));
        }
        Ok(CrawledPage {
            url: result.url.clone(),
            title: result.title.clone(),
            text,
        })
    }
}

/// Elements whose text is never page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];
/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6",
    "section", "article", "main", "header", "footer", "blockquote", "pre", "table", "dd", "dt",
];

/// Readable text of an HTML document: text nodes outside scripts, styles and `<head>`, one
/// line per block element, whitespace collapsed and entities decoded by the HTML parser.
pub fn strip_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => out.push('\n'),
            Node::Text(text) if !node.ancestors().any(|a| is_skipped(a.value())) => {
                out.push_str(text)
            }
            _ => {}
        }
    }
    out.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_skipped(node: &Node) -> bool {
    matches!(node, Node::Element(e) if SKIPPED_ELEMENTS.contains(&e.name()))
}
