//! Readability scoring: one strategy per script, selected by document language.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Language;

/// Coarse difficulty band. `A` is easiest.
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
pub enum ReadabilityLevel {
    A,
    B,
    C,
}

impl ReadabilityLevel {
    pub const ALL: [ReadabilityLevel; 3] =
        [ReadabilityLevel::A, ReadabilityLevel::B, ReadabilityLevel::C];

    /// Band for a reading-ease score (higher score = easier text).
    pub fn from_ease(score: f64) -> Self {
        if score >= 60.0 {
            ReadabilityLevel::A
        } else if score >= 30.0 {
            ReadabilityLevel::B
        } else {
            ReadabilityLevel::C
        }
    }
}

impl fmt::Display for ReadabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadabilityLevel::A => "A",
            ReadabilityLevel::B => "B",
            ReadabilityLevel::C => "C",
        };
        f.write_str(s)
    }
}

/// Surface counts a parser records for readability scoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub syllable_count: usize,
    /// Words longer than six characters.
    pub long_word_count: usize,
}

impl TextStats {
    fn words_per_sentence(&self) -> f64 {
        self.word_count as f64 / self.sentence_count.max(1) as f64
    }

    fn per_word(&self, n: usize) -> f64 {
        n as f64 / self.word_count.max(1) as f64
    }
}

/// Readability of one document, tagged by the scoring strategy that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Readability {
    Standard { score: f64, level: ReadabilityLevel },
    Arabic { score: f64, level: ReadabilityLevel },
}

impl Readability {
    pub fn score(&self) -> f64 {
        match self {
            Readability::Standard { score, .. } | Readability::Arabic { score, .. } => *score,
        }
    }

    pub fn level(&self) -> ReadabilityLevel {
        match self {
            Readability::Standard { level, .. } | Readability::Arabic { level, .. } => *level,
        }
    }

    /// Score `stats` with the strategy for `language`.
    ///
    /// - English: Flesch reading ease.
    /// - German: Amstad's adaptation of Flesch.
    /// - Arabic: vowel marks are usually absent, so syllables are replaced by the share of long words.
    pub fn compute(language: Language, stats: &TextStats) -> Self {
        if stats.word_count == 0 {
            return match language {
                Language::Arabic => Readability::Arabic {
                    score: 100.0,
                    level: ReadabilityLevel::A,
                },
                _ => Readability::Standard {
                    score: 100.0,
                    level: ReadabilityLevel::A,
                },
            };
        }
        let asl = stats.words_per_sentence();
        match language {
            Language::English => {
                let asw = stats.per_word(stats.syllable_count);
                Self::standard(206.835 - 1.015 * asl - 84.6 * asw)
            }
            Language::German => {
                let asw = stats.per_word(stats.syllable_count);
                Self::standard(180.0 - asl - 58.5 * asw)
            }
            Language::Arabic => {
                let long = stats.per_word(stats.long_word_count);
                let score = (200.791 - 1.015 * asl - 124.181 * long).clamp(0.0, 100.0);
                Readability::Arabic {
                    score,
                    level: ReadabilityLevel::from_ease(score),
                }
            }
        }
    }

    fn standard(score: f64) -> Self {
        let score = score.clamp(0.0, 100.0);
        Readability::Standard {
            score,
            level: ReadabilityLevel::from_ease(score),
        }
    }
}
