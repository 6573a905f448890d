use std::collections::BTreeMap;
use std::sync::Arc;

use super::model::{Construction, Document};
use super::readability::ReadabilityLevel;
use crate::Language;
use crate::error::PipelineError;

/// Aggregate of one construction across a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConstructionStats {
    /// Number of documents containing the construction at least once.
    pub document_frequency: usize,
    /// Total occurrences over all documents.
    pub occurrences: usize,
}

/// Ordered, append-only set of parsed documents sharing one language.
#[derive(Clone, Debug)]
pub struct DocumentCollection {
    language: Language,
    documents: Vec<Arc<Document>>,
}

impl DocumentCollection {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            documents: Vec::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Append a document. Rejects documents of another language.
    pub fn add(&mut self, document: Arc<Document>) -> Result<(), PipelineError> {
        if document.language() != self.language {
            return Err(PipelineError::LanguageMismatch {
                expected: self.language,
                found: document.language(),
            });
        }
        self.documents.push(document);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.iter()
    }

    /// Per-construction document frequency and occurrence count, recomputed on each call.
    pub fn construction_stats(&self) -> BTreeMap<Construction, ConstructionStats> {
        let mut stats: BTreeMap<Construction, ConstructionStats> = BTreeMap::new();
        for doc in &self.documents {
            for (construction, spans) in doc.constructions() {
                if spans.is_empty() {
                    continue;
                }
                let entry = stats.entry(construction.clone()).or_default();
                entry.document_frequency += 1;
                entry.occurrences += spans.len();
            }
        }
        stats
    }

    /// Number of documents per readability level.
    pub fn level_counts(&self) -> BTreeMap<ReadabilityLevel, usize> {
        let mut counts: BTreeMap<ReadabilityLevel, usize> =
            ReadabilityLevel::ALL.iter().map(|l| (*l, 0)).collect();
        for doc in &self.documents {
            *counts.entry(doc.readability_level()).or_default() += 1;
        }
        counts
    }
}
