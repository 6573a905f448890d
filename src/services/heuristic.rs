//! Rule-based stand-in for a full NLP engine: tokenizes words and sentences and tags a small
//! set of surface constructions with word lists and suffix rules. Enough to drive the pipeline
//! and the ranker end to end; not a linguistic analysis.

use std::collections::BTreeMap;

use super::parser::{Parser, ParserFactory};
use crate::document::{Construction, Document, TextStats};
use crate::error::ParseError;
use crate::utils::tools::{sentence_spans, word_spans};
use crate::{Language, ParseSource, Span};

pub const QUESTION: &str = "question";
pub const NEGATION: &str = "negation";
pub const CONDITIONAL: &str = "conditional";
pub const MODAL_VERB: &str = "modal_verb";
pub const RELATIVE_CLAUSE: &str = "relative_clause";
pub const LONG_SENTENCE: &str = "long_sentence";
pub const PAST_REGULAR: &str = "past_regular";
pub const PROGRESSIVE: &str = "progressive";
pub const PASSIVE_VOICE: &str = "passive_voice";
pub const COMPARATIVE: &str = "comparative";
pub const SUPERLATIVE: &str = "superlative";

/// Sentences with at least this many words are tagged [`LONG_SENTENCE`].
const LONG_SENTENCE_WORDS: usize = 25;
/// Words longer than this many characters count as long (readability).
const LONG_WORD_CHARS: usize = 6;

/// Word lists for one language. Empty lists disable the matching construction.
struct Lexicon {
    negations: &'static [&'static str],
    conditionals: &'static [&'static str],
    modals: &'static [&'static str],
    relatives: &'static [&'static str],
    /// English-only suffix rules (past tense, progressive, passive, comparison).
    english_morphology: bool,
}

const ENGLISH: Lexicon = Lexicon {
    negations: &[
        "not", "no", "never", "nothing", "nobody", "none", "nor", "cannot", "neither",
    ],
    conditionals: &["if", "unless"],
    modals: &[
        "can", "could", "may", "might", "must", "shall", "should", "will", "would",
    ],
    relatives: &["who", "whom", "whose", "which"],
    english_morphology: true,
};

const GERMAN: Lexicon = Lexicon {
    negations: &[
        "nicht", "kein", "keine", "keinen", "keinem", "keiner", "keines", "nie", "niemals",
        "nichts",
    ],
    conditionals: &["wenn", "falls", "sofern"],
    modals: &[
        "kann", "kannst", "können", "könnt", "konnte", "könnte", "muss", "musst", "müssen",
        "musste", "darf", "dürfen", "durfte", "soll", "sollen", "sollte", "will", "wollen",
        "wollte", "mag", "möchte", "möchten",
    ],
    relatives: &["welcher", "welche", "welches", "welchen", "welchem"],
    english_morphology: false,
};

const ARABIC: Lexicon = Lexicon {
    negations: &["لا", "لم", "لن", "ليس", "ليست", "ما"],
    conditionals: &["إذا", "اذا", "لو", "إن"],
    modals: &["يجب", "يمكن", "ينبغي", "يستطيع"],
    relatives: &["الذي", "التي", "الذين", "اللذان", "اللتان", "اللواتي", "اللاتي"],
    english_morphology: false,
};

const BE_FORMS: &[&str] = &["am", "is", "are", "was", "were", "be", "been", "being"];
const IRREGULAR_PARTICIPLES: &[&str] = &[
    "done", "made", "written", "given", "taken", "seen", "known", "built", "found", "held",
    "told", "sold", "paid", "said", "sent", "kept", "left", "brought", "bought", "taught",
    "thought", "caught", "shown", "born", "chosen", "driven", "eaten", "forgotten", "hidden",
    "spoken", "stolen", "broken", "won", "put", "set", "cut", "read",
];
/// Common `-ed`/`-er`/`-est` words that are not inflections.
const SUFFIX_EXCEPTIONS: &[&str] = &[
    "need", "feed", "seed", "speed", "bed", "red", "shed", "hundred", "indeed", "bred", "weed",
    "other", "never", "over", "under", "after", "water", "number", "paper", "order", "rest",
    "best", "test", "west", "interest", "forest", "nest", "chest", "honest", "guest", "request",
    "thing", "king", "ring", "sing", "spring", "string", "bring", "nothing", "something",
    "anything", "everything", "morning", "evening", "during", "ceiling",
];

fn lexicon(language: Language) -> &'static Lexicon {
    match language {
        Language::English => &ENGLISH,
        Language::German => &GERMAN,
        Language::Arabic => &ARABIC,
    }
}

/// [`Parser`] for one language built on [`Lexicon`] rules.
#[derive(Clone, Copy, Debug)]
pub struct HeuristicParser {
    language: Language,
}

impl HeuristicParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl Parser for HeuristicParser {
    fn is_language_supported(&self, language: Language) -> bool {
        language == self.language
    }

    fn parse(&mut self, source: &ParseSource, language: Language) -> Result<Document, ParseError> {
        if language != self.language {
            return Err(ParseError::Unsupported(language));
        }
        let text = source.text.as_str();
        let words = word_spans(text);
        if words.is_empty() {
            return Err(ParseError::Empty(source.rank));
        }
        let sentences = sentence_spans(text);
        let lex = lexicon(language);
        let lowered: Vec<String> = words.iter().map(|(_, w)| w.to_lowercase()).collect();

        let mut tags = Tagger::default();
        tag_sentences(&mut tags, text, &sentences, &words);
        tag_word_lists(&mut tags, lex, &words, &lowered);
        if lex.english_morphology {
            tag_english_morphology(&mut tags, &words, &lowered);
        }

        let stats = TextStats {
            word_count: words.len(),
            sentence_count: sentences.len().max(1),
            syllable_count: lowered.iter().map(|w| syllables(w, language)).sum(),
            long_word_count: lowered
                .iter()
                .filter(|w| w.chars().count() > LONG_WORD_CHARS)
                .count(),
        };
        Ok(Document::new(source, language, stats, tags.into_map()))
    }
}

/// Builds [`HeuristicParser`]s for English, German and Arabic.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicParserFactory;

impl ParserFactory for HeuristicParserFactory {
    fn is_language_supported(&self, _language: Language) -> bool {
        true
    }

    fn create(&self, language: Language) -> Result<Box<dyn Parser>, ParseError> {
        Ok(Box::new(HeuristicParser::new(language)))
    }
}

#[derive(Default)]
struct Tagger {
    found: BTreeMap<Construction, Vec<Span>>,
}

impl Tagger {
    fn tag(&mut self, construction: &str, span: Span) {
        self.found
            .entry(Construction::from(construction))
            .or_default()
            .push(span);
    }

    fn into_map(mut self) -> BTreeMap<Construction, Vec<Span>> {
        for spans in self.found.values_mut() {
            spans.sort();
            spans.dedup();
        }
        self.found
    }
}

fn tag_sentences(tags: &mut Tagger, text: &str, sentences: &[Span], words: &[(Span, &str)]) {
    for s in sentences {
        let sentence = &text[s.start..s.end];
        if sentence.ends_with('?') || sentence.ends_with('\u{061F}') {
            tags.tag(QUESTION, *s);
        }
        let n = words
            .iter()
            .filter(|(w, _)| w.start >= s.start && w.end <= s.end)
            .count();
        if n >= LONG_SENTENCE_WORDS {
            tags.tag(LONG_SENTENCE, *s);
        }
    }
}

fn tag_word_lists(tags: &mut Tagger, lex: &Lexicon, words: &[(Span, &str)], lowered: &[String]) {
    for (i, w) in lowered.iter().enumerate() {
        let span = words[i].0;
        let w = w.as_str();
        if lex.negations.contains(&w) || (lex.english_morphology && w.ends_with("n't")) {
            tags.tag(NEGATION, span);
        }
        if lex.conditionals.contains(&w) {
            tags.tag(CONDITIONAL, span);
        }
        if lex.modals.contains(&w) {
            tags.tag(MODAL_VERB, span);
        }
        if lex.relatives.contains(&w) {
            tags.tag(RELATIVE_CLAUSE, span);
        }
    }
}

fn is_participle(w: &str) -> bool {
    (w.len() > 4 && w.ends_with("ed") && !SUFFIX_EXCEPTIONS.contains(&w))
        || IRREGULAR_PARTICIPLES.contains(&w)
}

fn tag_english_morphology(tags: &mut Tagger, words: &[(Span, &str)], lowered: &[String]) {
    for (i, w) in lowered.iter().enumerate() {
        let span = words[i].0;
        let w = w.as_str();
        let exception = SUFFIX_EXCEPTIONS.contains(&w);

        if BE_FORMS.contains(&w) {
            // be + participle, allowing one adverb in between ("was quickly sold").
            let next = lowered.get(i + 1).map(String::as_str);
            let after = lowered.get(i + 2).map(String::as_str);
            let hit = match (next, after) {
                (Some(n), _) if is_participle(n) => Some(i + 1),
                (Some(n), Some(a)) if n.ends_with("ly") && is_participle(a) => Some(i + 2),
                _ => None,
            };
            if let Some(j) = hit {
                tags.tag(PASSIVE_VOICE, Span::new(span.start, words[j].0.end));
            }
            continue;
        }
        if !exception && w.len() > 4 && w.ends_with("ed") {
            tags.tag(PAST_REGULAR, span);
        }
        if !exception && w.len() > 4 && w.ends_with("ing") {
            tags.tag(PROGRESSIVE, span);
        }
        if w == "than" && i > 0 {
            tags.tag(COMPARATIVE, Span::new(words[i - 1].0.start, span.end));
        }
        if (w == "most" || w == "least") && i + 1 < words.len() {
            tags.tag(SUPERLATIVE, Span::new(span.start, words[i + 1].0.end));
        } else if !exception
            && w.len() > 5
            && w.ends_with("est")
            && i > 0
            && lowered[i - 1] == "the"
        {
            tags.tag(SUPERLATIVE, Span::new(words[i - 1].0.start, span.end));
        }
    }
}

/// Vowel-group count for Latin scripts, length-based estimate for Arabic. At least one.
fn syllables(word: &str, language: Language) -> usize {
    if language == Language::Arabic {
        return (word.chars().count() / 2).max(1);
    }
    let is_vowel = |c: char| "aeiouyäöü".contains(c);
    let mut count = 0;
    let mut prev_vowel = false;
    for c in word.chars() {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }
    if language == Language::English && word.ends_with('e') && !word.ends_with("le") && count > 1
    {
        count -= 1;
    }
    count.max(1)
}
