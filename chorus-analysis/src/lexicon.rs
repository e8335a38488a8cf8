//! Word-list polarity scorer.
//!
//! Each token found in the lexicon contributes its polarity. An intensifier
//! scales the next scored word; a negation within [`NEGATION_WINDOW`] tokens
//! flips it and halves it. The text's polarity is the mean contribution,
//! clamped to `[-1, 1]`, and `0.0` when no token matched.
use crate::sentiment::PolarityScorer;
use chorus_common::Result;
use std::collections::{HashMap, HashSet};

pub const NEGATION_WINDOW: usize = 3;
const NEGATION_FACTOR: f64 = -0.5;

const ENGLISH_WORDS: &[(&str, f64)] = &[
    // positive
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("better", 0.5),
    ("brilliant", 0.9),
    ("celebrate", 0.5),
    ("congratulations", 0.6),
    ("cool", 0.35),
    ("delighted", 0.7),
    ("easy", 0.43),
    ("enjoy", 0.4),
    ("excellent", 1.0),
    ("excited", 0.375),
    ("exciting", 0.3),
    ("fantastic", 0.4),
    ("fast", 0.2),
    ("fine", 0.42),
    ("free", 0.4),
    ("fun", 0.3),
    ("glad", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("helpful", 0.5),
    ("incredible", 0.9),
    ("interesting", 0.5),
    ("kind", 0.6),
    ("like", 0.1),
    ("love", 0.5),
    ("loved", 0.7),
    ("lovely", 0.5),
    ("lucky", 0.33),
    ("nice", 0.6),
    ("perfect", 1.0),
    ("pleased", 0.5),
    ("proud", 0.8),
    ("safe", 0.5),
    ("strong", 0.43),
    ("success", 0.3),
    ("successful", 0.75),
    ("super", 0.33),
    ("thank", 0.2),
    ("thanks", 0.2),
    ("tremendous", 0.6),
    ("win", 0.8),
    ("winning", 0.5),
    ("wonderful", 1.0),
    ("wow", 0.1),
    // negative
    ("angry", -0.5),
    ("annoying", -0.8),
    ("awful", -1.0),
    ("bad", -0.7),
    ("boring", -1.0),
    ("broken", -0.4),
    ("crazy", -0.6),
    ("dangerous", -0.6),
    ("dead", -0.2),
    ("disappointed", -0.75),
    ("disappointing", -0.6),
    ("disaster", -0.8),
    ("disgusting", -1.0),
    ("dumb", -0.375),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failing", -0.5),
    ("fake", -0.5),
    ("hard", -0.29),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("hurt", -0.3),
    ("lose", -0.4),
    ("lost", -0.2),
    ("mad", -0.6),
    ("pathetic", -1.0),
    ("poor", -0.4),
    ("sad", -0.5),
    ("scary", -0.5),
    ("sick", -0.71),
    ("slow", -0.3),
    ("sorry", -0.5),
    ("stupid", -0.8),
    ("terrible", -1.0),
    ("tired", -0.4),
    ("ugly", -0.7),
    ("unfair", -0.5),
    ("weak", -0.375),
    ("worse", -0.4),
    ("worst", -1.0),
    ("wrong", -0.5),
];

const ENGLISH_INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.5),
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("really", 1.3),
    ("so", 1.3),
    ("super", 1.3),
    ("totally", 1.4),
    ("very", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("barely", 0.4),
];

// Apostrophes are stripped by cleaning, so "don't" arrives as "don t".
const ENGLISH_NEGATIONS: &[&str] = &[
    "not", "no", "never", "nor", "nothing", "cannot", "cant", "dont", "don", "doesn", "didn",
    "isn", "wasn", "aren", "weren", "shouldn", "couldn", "wouldn", "hasn", "haven",
];

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer {
    words: HashMap<String, f64>,
    intensifiers: HashMap<String, f64>,
    negations: HashSet<String>,
}

impl LexiconScorer {
    /// Scorer without any entries; every text scores `0.0` until words are added.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in general-purpose English lexicon.
    pub fn english() -> Self {
        Self {
            words: ENGLISH_WORDS
                .iter()
                .map(|(w, p)| ((*w).to_string(), *p))
                .collect(),
            intensifiers: ENGLISH_INTENSIFIERS
                .iter()
                .map(|(w, f)| ((*w).to_string(), *f))
                .collect(),
            negations: ENGLISH_NEGATIONS.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    /// Add or override a word; the polarity is clamped to `[-1, 1]`.
    pub fn with_word(mut self, word: &str, polarity: f64) -> Self {
        self.words
            .insert(word.to_lowercase(), polarity.clamp(-1.0, 1.0));
        self
    }

    pub fn with_intensifier(mut self, word: &str, factor: f64) -> Self {
        self.intensifiers.insert(word.to_lowercase(), factor);
        self
    }

    pub fn with_negation(mut self, word: &str) -> Self {
        self.negations.insert(word.to_lowercase());
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> Result<f64> {
        let mut total = 0.0;
        let mut scored = 0usize;
        let mut intensity = 1.0;
        let mut negation_age: Option<usize> = None;

        for token in text.split_whitespace() {
            let word = token.to_lowercase();

            // a polarity entry beats the same word used as an intensifier ("super")
            if let Some(&base) = self.words.get(&word) {
                let mut score = base * intensity;
                if negation_age.is_some() {
                    score *= NEGATION_FACTOR;
                }
                total += score.clamp(-1.0, 1.0);
                scored += 1;
                intensity = 1.0;
                negation_age = None;
                continue;
            }

            if self.negations.contains(&word) {
                negation_age = Some(0);
                continue;
            }
            if let Some(&factor) = self.intensifiers.get(&word) {
                intensity *= factor;
                continue;
            }

            negation_age = match negation_age {
                Some(age) if age + 1 < NEGATION_WINDOW => Some(age + 1),
                _ => None,
            };
        }

        if scored == 0 {
            return Ok(0.0);
        }
        Ok((total / scored as f64).clamp(-1.0, 1.0))
    }
}
