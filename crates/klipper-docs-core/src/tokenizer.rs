//! Text tokenizer shared by index build and query time.
//!
//! Pipeline: split on anything that is not alphanumeric or `_` → trim
//! surrounding underscores → lowercase → drop stopwords → light stem.
//!
//! Underscores are word characters so that option names such as
//! `rotation_distance` or `bed_mesh` survive as single terms.

use std::collections::HashSet;

/// Standard English stopwords (Lucene's default set).
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// A single term occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Stemmed, lowercased term.
    pub term: String,
    /// Ordinal of this token among the kept tokens of the text.
    pub position: u32,
    /// Byte offset of the source word in the original text.
    pub offset: usize,
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline]
fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Split `text` into raw words with their byte offsets.
fn words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }

    out.into_iter()
        .filter_map(|(offset, word)| {
            let leading = word.len() - word.trim_start_matches('_').len();
            let trimmed = word.trim_matches('_');
            if trimmed.is_empty() {
                None
            } else {
                Some((offset + leading, trimmed))
            }
        })
        .collect()
}

/// Normalize common English plural suffixes.
///
/// Words of three characters or fewer, and words that end in a digit, are
/// returned unchanged.
///
/// ```
/// use klipper_docs_core::tokenizer::stem;
///
/// assert_eq!(stem("extruders"), "extruder");
/// assert_eq!(stem("meshes"), "mesh");
/// assert_eq!(stem("entries"), "entry");
/// assert_eq!(stem("axis"), "axis");
/// ```
pub fn stem(word: &str) -> String {
    if word.chars().count() <= 3 || !word.ends_with(|c: char| c.is_alphabetic()) {
        return word.to_string();
    }

    if word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with("ies") && word.len() > 4 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["xes", "ches", "shes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    for keep in ["ss", "us", "is"] {
        if word.ends_with(keep) {
            return word.to_string();
        }
    }
    if let Some(stripped) = word.strip_suffix('s') {
        return stripped.to_string();
    }
    word.to_string()
}

/// Tokenize text into positioned terms.
///
/// # Example
///
/// ```
/// use klipper_docs_core::tokenizer::tokenize;
///
/// let tokens = tokenize("The [bed_mesh] Probes");
/// let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
/// assert_eq!(terms, vec!["bed_mesh", "probe"]);
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut position: u32 = 0;

    for (offset, word) in words(text) {
        let lower = word.to_lowercase();
        if is_stopword(&lower) {
            continue;
        }
        tokens.push(Token {
            term: stem(&lower),
            position,
            offset,
        });
        position += 1;
    }

    tokens
}

/// Term stream of `text`, without positions.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.term).collect()
}

/// Tokenize and deduplicate, preserving first-seen order. Used for queries.
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    terms(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
