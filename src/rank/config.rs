use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::document::{Construction, Document, ReadabilityLevel};
use crate::utils::config::RankingConsts;

/// Caller-side predicate; documents it rejects are filtered out.
pub type DocumentFilter = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// What to filter and how to weight. Built by the caller per ranking call.
#[derive(Clone)]
pub struct RankerConfig {
    pub enabled_levels: BTreeSet<ReadabilityLevel>,
    /// Weight per construction. Zero weights do not score.
    pub construction_weights: BTreeMap<Construction, f64>,
    /// Documents containing any of these at least once are dropped.
    pub disabled_constructions: BTreeSet<Construction>,
    /// Weight per readability level; a document scores on its own level only.
    pub level_weights: BTreeMap<ReadabilityLevel, f64>,
    pub keyword_weight: f64,
    /// Length-normalization slider, `0..=10`. `b = length_weight / 10`.
    pub length_weight: f64,
    pub custom_filter: Option<DocumentFilter>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            enabled_levels: ReadabilityLevel::ALL.into_iter().collect(),
            construction_weights: BTreeMap::new(),
            disabled_constructions: BTreeSet::new(),
            level_weights: BTreeMap::new(),
            keyword_weight: 0.0,
            length_weight: 0.0,
            custom_filter: None,
        }
    }
}

impl RankerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: ReadabilityLevel, enabled: bool) -> Self {
        if enabled {
            self.enabled_levels.insert(level);
        } else {
            self.enabled_levels.remove(&level);
        }
        self
    }

    pub fn with_construction_weight(
        mut self,
        construction: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.construction_weights
            .insert(Construction::new(construction), weight);
        self
    }

    pub fn with_disabled_construction(mut self, construction: impl Into<String>) -> Self {
        self.disabled_constructions
            .insert(Construction::new(construction));
        self
    }

    pub fn with_level_weight(mut self, level: ReadabilityLevel, weight: f64) -> Self {
        self.level_weights.insert(level, weight);
        self
    }

    pub fn with_keyword_weight(mut self, weight: f64) -> Self {
        self.keyword_weight = weight;
        self
    }

    /// Clamped to `0..=10`.
    pub fn with_length_weight(mut self, weight: f64) -> Self {
        self.length_weight = weight.clamp(0.0, RankingConsts::MAX_LENGTH_WEIGHT);
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        self.custom_filter = Some(Arc::new(filter));
        self
    }

    /// True when `document` survives filtering.
    pub fn accepts(&self, document: &Document) -> bool {
        if !self.enabled_levels.contains(&document.readability_level()) {
            return false;
        }
        if self
            .disabled_constructions
            .iter()
            .any(|c| document.has_construction(c.as_str()))
        {
            return false;
        }
        self.custom_filter.as_ref().is_none_or(|f| f(document))
    }

    /// Any construction, keyword or level weight is nonzero.
    pub fn has_scoring_weights(&self) -> bool {
        self.keyword_weight != 0.0
            || self.construction_weights.values().any(|w| *w != 0.0)
            || self.level_weights.values().any(|w| *w != 0.0)
    }
}

impl fmt::Debug for RankerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankerConfig")
            .field("enabled_levels", &self.enabled_levels)
            .field("construction_weights", &self.construction_weights)
            .field("disabled_constructions", &self.disabled_constructions)
            .field("level_weights", &self.level_weights)
            .field("keyword_weight", &self.keyword_weight)
            .field("length_weight", &self.length_weight)
            .field("custom_filter", &self.custom_filter.is_some())
            .finish()
    }
}
