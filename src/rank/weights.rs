use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::config::RankerConfig;
use crate::document::{Construction, Document, ReadabilityLevel};
use crate::utils::config::RankingConsts;

/// One axis a document can be scored on.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Level(ReadabilityLevel),
    Keywords,
    Construction(Construction),
}

impl Dimension {
    /// Raw term frequency of this dimension in `document`.
    pub fn term_frequency(&self, document: &Document) -> f64 {
        match self {
            Dimension::Level(l) => f64::from(u8::from(document.readability_level() == *l)),
            Dimension::Keywords => document.keyword_count() as f64,
            Dimension::Construction(c) => document.construction_count(c.as_str()) as f64,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Level(l) => write!(f, "level {l}"),
            Dimension::Keywords => f.write_str("keywords"),
            Dimension::Construction(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DimensionStats {
    /// Normalized weight; all weights of one ranking sum to 1 (or are all 0).
    pub weight: f64,
    /// Surviving documents with a nonzero term frequency.
    pub df: usize,
    /// `ln((N + 1) / df)`, 0 when `df` is 0.
    pub idf: f64,
}

/// Per-call weighting derived from a [`RankerConfig`] and the surviving documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankerWeights {
    pub dimensions: BTreeMap<Dimension, DimensionStats>,
    pub document_count: usize,
    /// Mean word count of the surviving documents; 0 when there are none.
    pub avg_length: f64,
    pub k1: f64,
    pub b: f64,
}

impl RankerWeights {
    pub fn build(config: &RankerConfig, survivors: &[&Document]) -> Self {
        let mut raw: BTreeMap<Dimension, f64> = BTreeMap::new();
        for level in ReadabilityLevel::ALL {
            let w = config.level_weights.get(&level).copied().unwrap_or(0.0);
            raw.insert(Dimension::Level(level), w);
        }
        raw.insert(Dimension::Keywords, config.keyword_weight);
        for (c, w) in &config.construction_weights {
            if *w != 0.0 {
                raw.insert(Dimension::Construction(c.clone()), *w);
            }
        }

        let total: f64 = raw.values().map(|w| w.abs()).sum();
        let n = survivors.len();
        let dimensions = raw
            .into_iter()
            .map(|(dim, w)| {
                let df = survivors
                    .iter()
                    .filter(|d| dim.term_frequency(d) > 0.0)
                    .count();
                let idf = if df == 0 {
                    0.0
                } else {
                    ((n as f64 + 1.0) / df as f64).ln()
                };
                let weight = if total > 0.0 { w / total } else { 0.0 };
                (dim, DimensionStats { weight, df, idf })
            })
            .collect();

        let avg_length = if n == 0 {
            0.0
        } else {
            survivors.iter().map(|d| d.length() as f64).sum::<f64>() / n as f64
        };

        Self {
            dimensions,
            document_count: n,
            avg_length,
            k1: RankingConsts::K1,
            b: config.length_weight / RankingConsts::LENGTH_WEIGHT_SCALE,
        }
    }

    pub fn get(&self, dimension: &Dimension) -> Option<&DimensionStats> {
        self.dimensions.get(dimension)
    }

    /// BM25 saturation of `tf` for a document of `len` words.
    pub fn tf_norm(&self, tf: f64, len: f64) -> f64 {
        let k1 = self.k1;
        let denom = tf + k1 * (1.0 - self.b + self.b * (len / self.avg_length));
        if denom == 0.0 {
            return 0.0;
        }
        ((k1 + 1.0) * tf) / denom
    }

    /// Weighted sum over all scoring dimensions. 0 when there is no average length.
    pub fn score(&self, document: &Document) -> f64 {
        if self.avg_length == 0.0 {
            return 0.0;
        }
        let len = document.length() as f64;
        self.dimensions
            .iter()
            .filter(|(_, s)| s.weight != 0.0)
            .map(|(dim, s)| self.tf_norm(dim.term_frequency(document), len) * s.idf * s.weight)
            .sum()
    }
}
