//! Tokenization and term counting for text index expressions

use crate::artifact::LocalTermWeights;
use regex::Regex;

/// Splits text into normalized words
#[derive(Debug, Clone)]
pub(crate) struct Tokenizer {
    separator: Regex,
    case_sensitive: bool,
}

impl Tokenizer {
    pub(crate) fn new(separator: Regex, case_sensitive: bool) -> Self {
        Self {
            separator,
            case_sensitive,
        }
    }

    pub(crate) fn pattern(&self) -> &str {
        self.separator.as_str()
    }

    pub(crate) fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Split on the separator, strip punctuation at word edges and drop
    /// empty words
    pub(crate) fn tokenize(&self, text: &str) -> Vec<String> {
        self.separator
            .split(text)
            .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()))
            .filter(|word| !word.is_empty())
            .map(|word| {
                if self.case_sensitive {
                    word.to_string()
                } else {
                    word.to_lowercase()
                }
            })
            .collect()
    }
}

/// Number of positions where `term` occurs as a run of consecutive tokens
pub(crate) fn count_term(tokens: &[String], term: &[String]) -> usize {
    if term.is_empty() || term.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(term.len())
        .filter(|window| *window == term)
        .count()
}

pub(crate) fn weigh(count: usize, weights: LocalTermWeights) -> f64 {
    match weights {
        LocalTermWeights::TermFrequency => count as f64,
        LocalTermWeights::Binary => {
            if count > 0 {
                1.0
            } else {
                0.0
            }
        }
        LocalTermWeights::Logarithmic => (1.0 + count as f64).log10(),
    }
}
