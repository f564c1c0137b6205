//! Whole-word keyword signal
//!
//! Every comparison is a case-insensitive word-boundary match, so the task
//! "class" never matches the keyword "as".

use crate::types::CapabilityRecord;
use crate::vocabulary::Vocabulary;
use regex::Regex;

pub const KEYWORD_CAP: u32 = 40;
pub const KEYWORD_WEIGHT: u32 = 8;
pub const NAME_PART_WEIGHT: u32 = 4;
pub const DESCRIPTION_WORD_WEIGHT: u32 = 2;
pub const MAX_DESCRIPTION_WORDS: usize = 4;

/// Keyword signal of one candidate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMatch {
    pub score: u32,
    /// Matched terms in the order they were counted
    pub matched: Vec<String>,
}

/// Score `record` against the task text
pub fn keyword_match(task: &str, record: &CapabilityRecord, vocabulary: &Vocabulary) -> KeywordMatch {
    let mut result = KeywordMatch::default();
    if task.trim().is_empty() {
        return result;
    }

    let eligible = |term: &str, counted: &[String]| {
        !term.is_empty() && !vocabulary.is_stopword(term) && !counted.iter().any(|c| c == term)
    };

    for keyword in &record.keywords {
        let keyword = keyword.to_lowercase();
        if eligible(&keyword, &result.matched) && contains_whole_word(task, &keyword) {
            result.score += KEYWORD_WEIGHT;
            result.matched.push(keyword);
        }
    }

    let mut description_hits = 0;
    for word in description_words(&record.description) {
        if description_hits == MAX_DESCRIPTION_WORDS {
            break;
        }
        if eligible(&word, &result.matched) && contains_whole_word(task, &word) {
            result.score += DESCRIPTION_WORD_WEIGHT;
            result.matched.push(word);
            description_hits += 1;
        }
    }

    for part in name_parts(&record.name) {
        if eligible(&part, &result.matched) && contains_whole_word(task, &part) {
            result.score += NAME_PART_WEIGHT;
            result.matched.push(part);
        }
    }

    result.score = result.score.min(KEYWORD_CAP);
    result
}

/// Case-insensitive word-boundary containment
pub fn contains_whole_word(haystack: &str, word: &str) -> bool {
    let word = word.trim();
    if word.is_empty() {
        return false;
    }
    match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))) {
        Ok(pattern) => pattern.is_match(haystack),
        Err(_) => false,
    }
}

/// Lowercase name parts split on hyphens, underscores and whitespace (length > 2)
pub fn name_parts(name: &str) -> Vec<String> {
    unique(
        name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .map(str::to_lowercase)
            .filter(|p| p.chars().count() > 2),
    )
}

/// Lowercase alphanumeric description tokens (length > 2)
pub fn description_words(description: &str) -> Vec<String> {
    unique(
        description
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() > 2),
    )
}

fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
