//! Inverted index over the four weighted document fields.
//!
//! A [`SearchIndex`] is built once from a complete [`DocumentStore`]
//! snapshot and is immutable afterwards. Each term maps to a posting list
//! with one entry per (document, field) pair that contains it; each entry
//! keeps the token positions and byte offsets of every occurrence.
//!
//! # Scoring
//!
//! For a query term `t` matching field `f` of document `d`:
//!
//! ```text
//! score += idf(t) × weight(f) × tfnorm(f, tf)
//!
//! idf(t)          = ln(1 + (N - df + 0.5) / (df + 0.5))
//! tfnorm(body)    = tf × (k1 + 1) / (tf + k1 × (1 - b + b × len / avg_len))
//! tfnorm(other)   = tf × (k1 + 1) / (tf + k1)
//! ```
//!
//! with `k1 = 1.2`, `b = 0.75`. Title, section and tags are short fields and
//! are not length-normalized. Both forms are strictly increasing in `tf`,
//! and at equal `tf` the field precedence title > section > tags > body
//! always holds with the default 10:5:3:1 weights.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Document;
use crate::store::DocumentStore;
use crate::tokenizer::tokenize;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// An indexed document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Section,
    Tags,
    Body,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Title, Field::Section, Field::Tags, Field::Body];

    fn slot(self) -> usize {
        match self {
            Field::Title => 0,
            Field::Section => 1,
            Field::Tags => 2,
            Field::Body => 3,
        }
    }

    fn text(self, doc: &Document) -> String {
        match self {
            Field::Title => doc.title.clone(),
            Field::Section => doc.section.clone(),
            Field::Tags => doc
                .metadata
                .tags
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
            Field::Body => doc.content.clone(),
        }
    }
}

/// Per-field score multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub title: f64,
    pub section: f64,
    pub tags: f64,
    pub body: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            title: 10.0,
            section: 5.0,
            tags: 3.0,
            body: 1.0,
        }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> f64 {
        match field {
            Field::Title => self.title,
            Field::Section => self.section,
            Field::Tags => self.tags,
            Field::Body => self.body,
        }
    }
}

/// Occurrences of one term in one field of one document.
#[derive(Debug, Clone)]
pub struct Posting {
    /// Document ordinal (position in id order).
    pub doc: u32,
    pub field: Field,
    /// Token positions within the field.
    pub positions: Vec<u32>,
    /// Byte offsets of the source words within the field text.
    pub offsets: Vec<usize>,
}

impl Posting {
    pub fn tf(&self) -> u32 {
        self.positions.len() as u32
    }
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    id: String,
    field_lens: [u32; 4],
    vocabulary: BTreeSet<String>,
}

/// Immutable inverted index.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    docs: Vec<IndexedDoc>,
    postings: HashMap<String, Vec<Posting>>,
    doc_freqs: HashMap<String, usize>,
    avg_body_len: f64,
    weights: FieldWeights,
    built_at: DateTime<Utc>,
}

impl SearchIndex {
    /// Index every document in `store`. Ordinals follow the store's id order.
    pub fn build(store: &DocumentStore, weights: FieldWeights) -> Self {
        let mut docs = Vec::with_capacity(store.len());
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut total_body_len: u64 = 0;

        for (ordinal, doc) in store.iter().enumerate() {
            let ordinal = ordinal as u32;
            let mut field_lens = [0u32; 4];
            let mut vocabulary = BTreeSet::new();

            for field in Field::ALL {
                let tokens = tokenize(&field.text(doc));
                field_lens[field.slot()] = tokens.len() as u32;

                // BTreeMap keeps posting insertion deterministic.
                let mut grouped: BTreeMap<String, (Vec<u32>, Vec<usize>)> = BTreeMap::new();
                for token in tokens {
                    let entry = grouped.entry(token.term).or_default();
                    entry.0.push(token.position);
                    entry.1.push(token.offset);
                }

                for (term, (positions, offsets)) in grouped {
                    vocabulary.insert(term.clone());
                    postings.entry(term).or_default().push(Posting {
                        doc: ordinal,
                        field,
                        positions,
                        offsets,
                    });
                }
            }

            for term in &vocabulary {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            total_body_len += field_lens[Field::Body.slot()] as u64;

            docs.push(IndexedDoc {
                id: doc.id.clone(),
                field_lens,
                vocabulary,
            });
        }

        let avg_body_len = if docs.is_empty() {
            0.0
        } else {
            total_body_len as f64 / docs.len() as f64
        };

        Self {
            docs,
            postings,
            doc_freqs,
            avg_body_len,
            weights,
            built_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    /// Number of distinct indexed terms.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn doc_id(&self, ordinal: u32) -> Option<&str> {
        self.docs.get(ordinal as usize).map(|d| d.id.as_str())
    }

    /// All distinct terms indexed for a document, across every field.
    pub fn vocabulary(&self, ordinal: u32) -> Option<&BTreeSet<String>> {
        self.docs.get(ordinal as usize).map(|d| &d.vocabulary)
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of documents containing `term` in any field.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    pub fn idf(&self, term: &str) -> f64 {
        let n = self.docs.len() as f64;
        let df = self.doc_freq(term) as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn tf_norm(&self, posting: &Posting) -> f64 {
        let tf = posting.tf() as f64;
        match posting.field {
            Field::Body => {
                let len = self.docs[posting.doc as usize].field_lens[Field::Body.slot()] as f64;
                let norm = if self.avg_body_len > 0.0 {
                    1.0 - B + B * len / self.avg_body_len
                } else {
                    1.0
                };
                tf * (K1 + 1.0) / (tf + K1 * norm)
            }
            _ => tf * (K1 + 1.0) / (tf + K1),
        }
    }

    /// Score every document matching at least one of `terms`.
    ///
    /// Returns `(ordinal, score)` pairs in ordinal order. Duplicate terms
    /// are counted once per occurrence in `terms`; callers pass
    /// deduplicated query terms.
    pub fn score(&self, terms: &[String]) -> Vec<(u32, f64)> {
        let mut scores: BTreeMap<u32, f64> = BTreeMap::new();
        for term in terms {
            let postings = self.postings(term);
            if postings.is_empty() {
                continue;
            }
            let idf = self.idf(term);
            for posting in postings {
                let contribution = idf * self.weights.weight(posting.field) * self.tf_norm(posting);
                *scores.entry(posting.doc).or_insert(0.0) += contribution;
            }
        }
        scores.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc, doc_with_tags};

    fn build(docs: Vec<Document>) -> SearchIndex {
        let store = DocumentStore::from_documents(docs).unwrap();
        SearchIndex::build(&store, FieldWeights::default())
    }

    fn score_of(index: &SearchIndex, query: &str, id: &str) -> f64 {
        let terms = crate::tokenizer::tokenize_unique(query);
        index
            .score(&terms)
            .into_iter()
            .find(|(ord, _)| index.doc_id(*ord) == Some(id))
            .map(|(_, s)| s)
            .unwrap_or(0.0)
    }

    #[test]
    fn test_empty_index() {
        let index = build(vec![]);
        assert!(index.is_empty());
        assert!(index.score(&["anything".to_string()]).is_empty());
    }

    #[test]
    fn test_ordinals_follow_id_order() {
        let index = build(vec![doc("b", "", "", "s"), doc("a", "", "", "s")]);
        assert_eq!(index.doc_id(0), Some("a"));
        assert_eq!(index.doc_id(1), Some("b"));
    }

    #[test]
    fn test_postings_keep_positions() {
        let index = build(vec![doc("a", "", "probe the probe and probes", "s")]);
        let postings = index.postings("probe");
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].field, Field::Body);
        assert_eq!(postings[0].positions, vec![0, 1, 2]);
        assert_eq!(postings[0].offsets, vec![0, 10, 20]);
    }

    #[test]
    fn test_doc_freq_counts_documents_once() {
        let index = build(vec![
            doc("a", "Probe", "probe", "probe"),
            doc("b", "", "nothing here", "s"),
        ]);
        assert_eq!(index.doc_freq("probe"), 1);
        assert_eq!(index.postings("probe").len(), 3);
    }

    #[test]
    fn test_field_precedence_at_equal_tf() {
        let index = build(vec![
            doc("title", "Thermistor", "unrelated words here", "misc"),
            doc("section", "Other", "unrelated words here", "thermistor"),
            doc_with_tags("tags", "Other", "unrelated words here", "misc", &["thermistor"]),
            doc("body", "Other", "thermistor words here", "misc"),
        ]);
        let title = score_of(&index, "thermistor", "title");
        let section = score_of(&index, "thermistor", "section");
        let tags = score_of(&index, "thermistor", "tags");
        let body = score_of(&index, "thermistor", "body");
        assert!(title > section, "title {} <= section {}", title, section);
        assert!(section > tags, "section {} <= tags {}", section, tags);
        assert!(tags > body, "tags {} <= body {}", tags, body);
        assert!(body > 0.0);
    }

    #[test]
    fn test_monotonic_in_term_frequency() {
        let index = build(vec![
            doc("one", "", "heater once filler filler filler", "s"),
            doc("three", "", "heater heater heater filler filler", "s"),
        ]);
        assert!(score_of(&index, "heater", "three") > score_of(&index, "heater", "one"));
    }

    #[test]
    fn test_vocabulary_spans_fields() {
        let index = build(vec![doc_with_tags("a", "Bed Mesh", "probe", "config", &["leveling"])]);
        let vocab = index.vocabulary(0).unwrap();
        for term in ["bed", "mesh", "probe", "config", "leveling"] {
            assert!(vocab.contains(term), "missing {}", term);
        }
    }
}
