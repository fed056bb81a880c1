//! Query execution: scoring, filtering, ranking, snippets and highlights.
//!
//! The query engine operates on one immutable snapshot (a
//! [`DocumentStore`] and the [`SearchIndex`] built from it) and has no
//! configuration dependencies beyond [`SearchSettings`]. The calling
//! engine is responsible for holding the snapshot and passing it in.
//!
//! # Algorithm
//!
//! 1. Tokenize the query with the index tokenizer and deduplicate terms.
//! 2. Score every document matching at least one term (see [`crate::index`]).
//! 3. Keep documents whose section equals `options.section`, if given.
//! 4. Drop documents scoring below `min_score`.
//! 5. Sort by score (desc), then document id (asc).
//! 6. Record `total_results`, then truncate to the limit.
//! 7. Build a snippet and highlight list for each surviving hit.

use std::collections::{BTreeSet, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::index::{Field, SearchIndex};
use crate::models::{Document, DocumentSummary};
use crate::store::DocumentStore;
use crate::tokenizer::tokenize_unique;

/// Distance in characters between consecutive snippet window starts.
pub const SNIPPET_STEP: usize = 20;

/// Marker added where a snippet cuts the body.
pub const ELLIPSIS: &str = "...";

/// Query tuning parameters, decoupled from application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Default result limit when a query does not set one.
    pub max_results: usize,
    /// Snippet window length in characters, before ellipsis markers.
    pub snippet_length: usize,
    /// Results scoring below this are dropped.
    pub min_score: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            snippet_length: 200,
            min_score: 0.1,
        }
    }
}

/// Per-query options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum hits returned; `None` uses [`SearchSettings::max_results`].
    pub limit: Option<usize>,
    /// Exact-match section filter.
    pub section: Option<String>,
    /// Include the full body in each hit.
    pub include_content: bool,
}

/// Filters that were in effect for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub min_score: f64,
    pub limit: usize,
}

/// Per-query metadata, reported once per response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetadata {
    pub query: String,
    /// Query terms after tokenization.
    pub terms: Vec<String>,
    /// Wall-clock duration of the whole search call.
    pub search_time_ms: f64,
    /// Hit count after section and score filtering, before truncation.
    pub total_results: usize,
    pub filters: ActiveFilters,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub document: DocumentSummary,
    pub score: f64,
    pub snippet: String,
    /// Indexed terms of the document overlapping a query term, sorted.
    pub highlights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub metadata: QueryMetadata,
}

/// Run a query against one snapshot.
///
/// Never fails: empty or nonsense queries produce an empty result list.
pub fn search(
    store: &DocumentStore,
    index: &SearchIndex,
    settings: &SearchSettings,
    query: &str,
    options: &SearchOptions,
) -> SearchResponse {
    let started = Instant::now();
    let terms = tokenize_unique(query);
    let limit = options.limit.unwrap_or(settings.max_results);

    let mut ranked: Vec<(u32, f64, std::sync::Arc<Document>)> = index
        .score(&terms)
        .into_iter()
        .filter(|(_, score)| *score >= settings.min_score)
        .filter_map(|(ordinal, score)| {
            let doc = store.get(index.doc_id(ordinal)?)?;
            match &options.section {
                Some(section) if &doc.section != section => None,
                _ => Some((ordinal, score, doc)),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let total_results = ranked.len();
    ranked.truncate(limit);

    let results = ranked
        .into_iter()
        .map(|(ordinal, score, doc)| {
            let offsets = body_offsets(index, ordinal, &terms);
            SearchHit {
                document: DocumentSummary::from(doc.as_ref()),
                score,
                snippet: make_snippet(&doc.content, &terms, &offsets, settings.snippet_length),
                highlights: index
                    .vocabulary(ordinal)
                    .map(|vocab| highlight_terms(vocab, &terms))
                    .unwrap_or_default(),
                content: options.include_content.then(|| doc.content.clone()),
            }
        })
        .collect::<Vec<_>>();

    let elapsed = started.elapsed();
    tracing::debug!(
        query,
        terms = ?terms,
        results = results.len(),
        total_results,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "search executed"
    );

    SearchResponse {
        results,
        metadata: QueryMetadata {
            query: query.to_string(),
            terms,
            search_time_ms: elapsed.as_secs_f64() * 1000.0,
            total_results,
            filters: ActiveFilters {
                section: options.section.clone(),
                min_score: settings.min_score,
                limit,
            },
        },
    }
}

/// Body byte offsets of every query-term occurrence in one document.
fn body_offsets(index: &SearchIndex, ordinal: u32, terms: &[String]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for (term_idx, term) in terms.iter().enumerate() {
        for posting in index.postings(term) {
            if posting.doc == ordinal && posting.field == Field::Body {
                out.extend(posting.offsets.iter().map(|o| (term_idx, *o)));
            }
        }
    }
    out
}

/// Indexed terms that overlap a query term.
///
/// A document term matches a query term when either contains the other.
/// Single-character terms only match exactly.
pub fn highlight_terms(vocabulary: &BTreeSet<String>, query_terms: &[String]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|t| {
            query_terms.iter().any(|q| {
                if t.as_str() == q.as_str() {
                    return true;
                }
                let shorter = t.chars().count().min(q.chars().count());
                shorter >= 2 && (t.contains(q.as_str()) || q.contains(t.as_str()))
            })
        })
        .cloned()
        .collect()
}

/// Choose the body excerpt with the most distinct query terms.
///
/// `offsets` holds `(term index, body byte offset)` pairs for occurrences
/// found by the index. A term also counts for a window whose lowercased
/// text contains it, which covers terms split across tokens; that fallback
/// ignores single-character terms. Windows start every [`SNIPPET_STEP`]
/// characters plus one final window flush with the end. Each window is cut
/// back to word boundaries before counting, so only words that survive the
/// cut are credited; ties go to the earliest window. Whitespace is
/// collapsed and [`ELLIPSIS`] marks each cut.
///
/// # Example
///
/// ```
/// use klipper_docs_core::search::make_snippet;
///
/// let body = "short body about the extruder";
/// assert_eq!(make_snippet(body, &["extruder".to_string()], &[], 200), body);
/// ```
pub fn make_snippet(
    body: &str,
    terms: &[String],
    offsets: &[(usize, usize)],
    max_len: usize,
) -> String {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let n = chars.len();
    if n <= max_len || max_len == 0 {
        return collapse_whitespace(body);
    }

    let folded: Vec<char> = chars
        .iter()
        .map(|(_, c)| c.to_lowercase().next().unwrap_or(*c))
        .collect();

    // Occurrences as (term, first char, one past the last word char).
    let occurrences: Vec<(usize, usize, usize)> = offsets
        .iter()
        .filter_map(|(term, byte)| {
            let idx = chars.binary_search_by_key(byte, |(b, _)| *b).ok()?;
            let word_end = (idx..n)
                .find(|&i| !is_word_char(chars[i].1))
                .unwrap_or(n);
            Some((*term, idx, word_end))
        })
        .collect();

    let last_start = n - max_len;
    let mut starts: Vec<usize> = (0..last_start).step_by(SNIPPET_STEP.max(1)).collect();
    starts.push(last_start);

    let mut best: Option<((usize, usize), usize)> = None;
    for &candidate in &starts {
        let (start, end) = trim_to_words(&chars, candidate, candidate + max_len);
        let window: String = folded[start..end].iter().collect();
        let mut present: HashSet<usize> = occurrences
            .iter()
            .filter(|(_, idx, word_end)| *idx >= start && *word_end <= end)
            .map(|(term, _, _)| *term)
            .collect();
        for (i, term) in terms.iter().enumerate() {
            if term.chars().count() >= 2 && window.contains(term.as_str()) {
                present.insert(i);
            }
        }
        if best.map_or(true, |(_, count)| present.len() > count) {
            best = Some(((start, end), present.len()));
        }
    }

    let (start, end) = best.map_or((0, max_len), |(range, _)| range);

    let text: String = chars[start..end].iter().map(|(_, c)| *c).collect();
    let mut snippet = collapse_whitespace(&text);
    if start > 0 {
        snippet.insert_str(0, ELLIPSIS);
    }
    if end < n {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Narrow `[start, end)` so it neither begins nor ends inside a word.
fn trim_to_words(chars: &[(usize, char)], mut start: usize, mut end: usize) -> (usize, usize) {
    let n = chars.len();
    if start > 0 && !chars[start - 1].1.is_whitespace() && !chars[start].1.is_whitespace() {
        if let Some(ws) = (start..end).find(|&i| chars[i].1.is_whitespace()) {
            start = ws;
        }
    }
    if end < n && !chars[end - 1].1.is_whitespace() && !chars[end].1.is_whitespace() {
        if let Some(ws) = (start..end).rev().find(|&i| chars[i].1.is_whitespace()) {
            end = ws;
        }
    }
    (start, end)
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
