//! Parser seam: per-language NLP engines behind a trait, serialized per instance and cached
//! per language.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::document::Document;
use crate::error::ParseError;
use crate::{Language, ParseSource};

/// An NLP engine instance for one language.
///
/// Implementations may hold per-call state (`&mut self`); the pipeline never calls one
/// instance concurrently.
pub trait Parser: Send {
    fn is_language_supported(&self, language: Language) -> bool;

    /// Parse `source` into an unflagged [`Document`]. The pipeline flags it as parsed.
    fn parse(&mut self, source: &ParseSource, language: Language) -> Result<Document, ParseError>;
}

/// Builds parser instances. Construction may be expensive (model loading); the cache calls
/// [`ParserFactory::create`] at most once per language.
pub trait ParserFactory: Send + Sync {
    fn is_language_supported(&self, language: Language) -> bool;

    fn create(&self, language: Language) -> Result<Box<dyn Parser>, ParseError>;
}

/// A parser instance shared by every job of one language. At most one parse call runs at a
/// time per instance.
pub struct SharedParser {
    language: Language,
    inner: Mutex<Box<dyn Parser>>,
    calls: AtomicUsize,
}

impl SharedParser {
    pub fn new(language: Language, parser: Box<dyn Parser>) -> Self {
        Self {
            language,
            inner: Mutex::new(parser),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Parse calls completed or in progress on this instance.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Blocks while another job is parsing with this instance.
    pub fn parse(&self, source: &ParseSource) -> Result<Document, ParseError> {
        if source.text.trim().is_empty() {
            return Err(ParseError::Empty(source.rank));
        }
        let mut parser = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        self.calls.fetch_add(1, Ordering::Relaxed);
        parser.parse(source, self.language)
    }
}

/// Lazily built, per-language parser instances.
pub struct ParserCache {
    factory: Arc<dyn ParserFactory>,
    parsers: Mutex<HashMap<Language, Arc<SharedParser>>>,
}

impl ParserCache {
    pub fn new(factory: Arc<dyn ParserFactory>) -> Self {
        Self {
            factory,
            parsers: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_language_supported(&self, language: Language) -> bool {
        self.factory.is_language_supported(language)
    }

    /// The cached instance for `language`, constructing it on first use.
    pub fn get(&self, language: Language) -> Result<Arc<SharedParser>, ParseError> {
        // Held across construction so concurrent first uses build one instance.
        let mut parsers = self.parsers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(p) = parsers.get(&language) {
            return Ok(Arc::clone(p));
        }
        if !self.factory.is_language_supported(language) {
            return Err(ParseError::Unsupported(language));
        }
        debug!("parser cache: constructing parser for '{language}'");
        let parser = self.factory.create(language)?;
        let shared = Arc::new(SharedParser::new(language, parser));
        parsers.insert(language, Arc::clone(&shared));
        info!("Parser for '{language}' ready");
        Ok(shared)
    }

    /// Languages with a constructed instance.
    pub fn loaded(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self
            .parsers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        langs.sort();
        langs
    }
}
