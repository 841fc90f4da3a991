//! Keyword derivation for match scoring.
//!
//! Job descriptions persist their derived keywords at write time; the
//! enhancement stage derives résumé keywords on the fly and scores the
//! overlap. Both sides use this one tokenizer so the score is
//! symmetric.

use std::collections::HashSet;

/// Words carrying no matching signal.
const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "from", "up",
    "about", "into", "through", "during", "before", "after", "above", "below", "between", "among",
    "down", "out", "off", "over", "under", "again", "further", "then", "once", "here", "there",
    "when", "where", "why", "how", "all", "any", "both", "each", "few", "more", "most", "other",
    "some", "such", "nor", "not", "only", "own", "same", "than", "too", "very", "can", "will",
    "just", "should", "you", "your", "our", "their", "this", "that", "are", "was", "were", "has",
    "have", "had",
];

/// Derive the unique, lowercased keyword set from free text.
///
/// Tokens are alphanumeric words of at least three characters that
/// start with a letter; stop words are dropped. Order is not
/// meaningful.
pub fn derive_keywords(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 3)
    {
        if !token.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        let lower = token.to_ascii_lowercase();
        if stop.contains(lower.as_str()) {
            continue;
        }
        if seen.insert(lower.clone()) {
            keywords.push(lower);
        }
    }

    keywords
}

/// Overlap of `keywords` found in `text`, as a 0–100 score rounded to
/// two decimals. An empty keyword set scores zero.
pub fn overlap_score(keywords: &[String], text: &str) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let text_keywords: HashSet<String> = derive_keywords(text).into_iter().collect();
    let matches = keywords
        .iter()
        .filter(|k| text_keywords.contains(k.as_str()))
        .count();
    let score = matches as f32 / keywords.len() as f32 * 100.0;
    (score * 100.0).round() / 100.0
}
