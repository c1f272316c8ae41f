//! Extractive, frequency-based summarization
//!
//! Sentences are scored by the mean corpus frequency of their words
//! (stop words count as zero); the best `max_sentences` are kept in their
//! original order.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use castline_pipeline::{BoxError, Summarizer};

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "while", "with", "for", "to", "of", "in",
        "on", "at", "by", "from", "this", "that", "these", "those", "is", "are", "was", "were",
        "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would",
        "shall", "should", "can", "could", "may", "might", "must", "about", "into", "than",
        "as", "it", "its", "he", "she", "they", "them", "his", "her", "their", "we", "you",
        "your", "i", "me", "my", "mine", "ours", "ourselves",
    ]
    .into_iter()
    .collect()
});

/// Input had no text after whitespace normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyText;

impl std::fmt::Display for EmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("no text to summarize")
    }
}

impl std::error::Error for EmptyText {}

#[derive(Debug, Default, Clone, Copy)]
pub struct FrequencySummarizer;

impl Summarizer for FrequencySummarizer {
    fn summarize(&self, text: &str, max_sentences: usize) -> Result<String, BoxError> {
        Ok(summarize(text, max_sentences)?)
    }
}

/// Condense `text` to at most `max_sentences` sentences (minimum one).
pub fn summarize(text: &str, max_sentences: usize) -> Result<String, EmptyText> {
    let max_sentences = max_sentences.max(1);
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Err(EmptyText);
    }
    if sentences.len() <= max_sentences {
        return Ok(sentences.join(" "));
    }

    let tokens: Vec<Vec<String>> = sentences.iter().map(|s| tokenize(s)).collect();

    let mut freq: HashMap<&str, usize> = HashMap::new();
    for word in tokens.iter().flatten() {
        if !STOP_WORDS.contains(word.as_str()) {
            *freq.entry(word.as_str()).or_default() += 1;
        }
    }

    let mut scored: Vec<(usize, f64)> = tokens
        .iter()
        .enumerate()
        .map(|(idx, words)| {
            if words.is_empty() {
                return (idx, 0.0);
            }
            let total: usize = words
                .iter()
                .map(|w| freq.get(w.as_str()).copied().unwrap_or(0))
                .sum();
            (idx, total as f64 / words.len() as f64)
        })
        .collect();

    // Best score first; equal scores favour the earlier sentence.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut keep: Vec<usize> = scored
        .into_iter()
        .take(max_sentences)
        .map(|(idx, _)| idx)
        .collect();
    keep.sort_unstable();

    Ok(keep
        .into_iter()
        .map(|idx| sentences[idx].as_str())
        .collect::<Vec<_>>()
        .join(" "))
}

/// Split at `.`, `!` or `?` followed by whitespace and an uppercase letter.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = normalized.chars().collect();

    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1) == Some(&' ')
            && chars.get(i + 2).is_some_and(|n| n.is_ascii_uppercase());
        if boundary {
            sentences.push(std::mem::take(&mut current));
            i += 1; // skip the separating space
        }
        i += 1;
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercase alphabetic words; apostrophes inside words are kept.
fn tokenize(sentence: &str) -> Vec<String> {
    sentence
        .to_lowercase()
        .split(|c: char| !(c.is_ascii_alphabetic() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
