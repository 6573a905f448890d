//! Ranking of a finished collection: filter, weight by document frequency, score with BM25
//! saturation, sort. Never mutates the collection.

pub mod config;
pub mod weights;

pub use config::{DocumentFilter, RankerConfig};
pub use weights::{Dimension, DimensionStats, RankerWeights};

use log::debug;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::document::{Document, DocumentCollection};

/// Which of the three orderings a ranking used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Descending score; some weight was nonzero.
    Score,
    /// Ascending length; only the length weight was set.
    Length,
    /// Original rank order.
    Rank,
}

#[derive(Clone, Debug)]
pub struct RankedDocument {
    pub document: Arc<Document>,
    pub score: f64,
}

/// Output of [`DocumentRanker::rerank`].
#[derive(Clone, Debug)]
pub struct Ranking {
    pub documents: Vec<RankedDocument>,
    pub num_filtered: usize,
    pub weights: RankerWeights,
    pub sort_mode: SortMode,
}

impl Ranking {
    /// Ranks of the output documents, in output order.
    pub fn ranks(&self) -> Vec<usize> {
        self.documents.iter().map(|d| d.document.rank()).collect()
    }
}

pub struct DocumentRanker {
    config: RankerConfig,
}

impl DocumentRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    pub fn rerank(&self, collection: &DocumentCollection) -> Ranking {
        let survivors: Vec<&Arc<Document>> = collection
            .iter()
            .filter(|d| self.config.accepts(d))
            .collect();
        let num_filtered = collection.len() - survivors.len();

        let docs: Vec<&Document> = survivors.iter().map(|d| d.as_ref()).collect();
        let weights = RankerWeights::build(&self.config, &docs);

        let mut documents: Vec<RankedDocument> = survivors
            .par_iter()
            .map(|d| RankedDocument {
                document: Arc::clone(d),
                score: weights.score(d),
            })
            .collect();

        let sort_mode = if self.config.has_scoring_weights() {
            SortMode::Score
        } else if self.config.length_weight != 0.0 {
            SortMode::Length
        } else {
            SortMode::Rank
        };
        // Rank first so equal keys keep rank order under the stable sorts below.
        documents.sort_by_key(|d| d.document.rank());
        match sort_mode {
            SortMode::Score => documents.sort_by(|a, b| b.score.total_cmp(&a.score)),
            SortMode::Length => documents.sort_by_key(|d| d.document.length()),
            SortMode::Rank => {}
        }
        debug!(
            "rerank: {} kept, {} filtered, sorted by {sort_mode:?}",
            documents.len(),
            num_filtered
        );

        Ranking {
            documents,
            num_filtered,
            weights,
            sort_mode,
        }
    }
}
