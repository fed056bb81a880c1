//! The engine handle callers hold for the process lifetime.
//!
//! [`DocsEngine`] owns the current snapshot: a [`DocumentStore`] and the
//! [`SearchIndex`] built from it, behind one `Arc`. A build constructs the
//! new snapshot without holding any lock and then swaps the handle, so a
//! concurrent reader sees either the previous complete snapshot or the new
//! one. A failed build leaves the previous snapshot in place.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::extract;
use crate::index::{FieldWeights, SearchIndex};
use crate::models::{Document, IndexStats};
use crate::search::{self, SearchOptions, SearchResponse, SearchSettings};
use crate::store::DocumentStore;

#[derive(Debug)]
struct Snapshot {
    store: DocumentStore,
    index: SearchIndex,
}

/// Outcome of a successful [`DocsEngine::build_index`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub documents: usize,
    pub terms: usize,
    pub elapsed_ms: f64,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DocsEngine {
    settings: SearchSettings,
    weights: FieldWeights,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl DocsEngine {
    pub fn new(settings: SearchSettings) -> Self {
        Self::with_weights(settings, FieldWeights::default())
    }

    pub fn with_weights(settings: SearchSettings, weights: FieldWeights) -> Self {
        Self {
            settings,
            weights,
            current: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    /// True once a build has succeeded.
    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// Replace the current snapshot with one built from `documents`.
    ///
    /// Safe to call repeatedly. An empty input produces a valid empty index.
    /// On error the previous snapshot stays in effect.
    pub fn build_index(&self, documents: Vec<Document>) -> Result<BuildSummary> {
        let started = Instant::now();
        tracing::info!(documents = documents.len(), "index build started");

        let store = match DocumentStore::from_documents(documents) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "index build failed; keeping previous index");
                return Err(e);
            }
        };
        let index = SearchIndex::build(&store, self.weights);

        let summary = BuildSummary {
            documents: store.len(),
            terms: index.term_count(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            indexed_at: index.built_at(),
        };

        *self.current.write() = Some(Arc::new(Snapshot { store, index }));

        tracing::info!(
            documents = summary.documents,
            terms = summary.terms,
            elapsed_ms = summary.elapsed_ms,
            "index build finished"
        );
        Ok(summary)
    }

    /// Run a query against the current snapshot.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let snapshot = self.snapshot().ok_or(CoreError::IndexNotReady)?;
        Ok(search::search(
            &snapshot.store,
            &snapshot.index,
            &self.settings,
            query,
            options,
        ))
    }

    pub fn get_document(&self, id: &str) -> Option<Arc<Document>> {
        self.snapshot()?.store.get(id)
    }

    /// Documents whose section equals `section`, in id order.
    pub fn get_documents_by_section(&self, section: &str) -> Vec<Arc<Document>> {
        self.snapshot()
            .map(|s| s.store.by_section(section))
            .unwrap_or_default()
    }

    /// All documents in id order.
    pub fn documents(&self) -> Vec<Arc<Document>> {
        self.snapshot()
            .map(|s| s.store.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_sections(&self) -> Vec<String> {
        self.snapshot()
            .map(|s| s.store.sections())
            .unwrap_or_default()
    }

    pub fn section_counts(&self) -> BTreeMap<String, usize> {
        self.snapshot()
            .map(|s| s.store.section_counts())
            .unwrap_or_default()
    }

    pub fn get_stats(&self) -> IndexStats {
        match self.snapshot() {
            Some(s) => IndexStats {
                total_documents: s.store.len(),
                total_words: s.store.total_words(),
                sections: s.store.sections(),
                last_indexed: Some(s.index.built_at()),
            },
            None => IndexStats {
                total_documents: 0,
                total_words: 0,
                sections: Vec::new(),
                last_indexed: None,
            },
        }
    }

    /// See [`extract::extract_config_section`].
    pub fn extract_config_section(content: &str, option: &str) -> Option<String> {
        extract::extract_config_section(content, option)
    }
}

impl Default for DocsEngine {
    fn default() -> Self {
        Self::new(SearchSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::doc;

    fn with_words(id: &str, section: &str, words: usize) -> Document {
        let mut d = doc(id, id, "", section);
        d.metadata.word_count = words;
        d
    }

    #[test]
    fn test_search_before_build_is_not_ready() {
        let engine = DocsEngine::default();
        assert!(!engine.is_ready());
        let err = engine.search("anything", &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::IndexNotReady));
    }

    #[test]
    fn test_empty_build_is_queryable() {
        let engine = DocsEngine::default();
        let summary = engine.build_index(Vec::new()).unwrap();
        assert_eq!(summary.documents, 0);
        assert!(engine.is_ready());
        for query in ["", "extruder", "bed mesh probe"] {
            let response = engine.search(query, &SearchOptions::default()).unwrap();
            assert!(response.results.is_empty());
        }
    }

    #[test]
    fn test_extruder_scenario() {
        let engine = DocsEngine::default();
        engine
            .build_index(vec![doc(
                "config_reference",
                "Extruder Configuration",
                "The extruder section sets rotation_distance and nozzle_diameter.",
                "config-reference",
            )])
            .unwrap();

        let response = engine.search("extruder", &SearchOptions::default()).unwrap();
        assert_eq!(response.results.len(), 1);
        let hit = &response.results[0];
        assert_eq!(hit.document.id, "config_reference");
        assert!(hit.score > 0.0);
        assert!(hit.snippet.to_lowercase().contains("extruder"));
        assert_eq!(hit.highlights, vec!["extruder"]);
    }

    #[test]
    fn test_stats() {
        let engine = DocsEngine::default();
        let empty = engine.get_stats();
        assert_eq!(empty.total_documents, 0);
        assert!(empty.last_indexed.is_none());

        engine
            .build_index(vec![
                with_words("one", "a", 10),
                with_words("two", "a", 20),
                with_words("three", "b", 30),
            ])
            .unwrap();
        let stats = engine.get_stats();
        assert_eq!(stats.total_documents, 3);
        assert_eq!(stats.total_words, 60);
        assert_eq!(stats.sections, vec!["a", "b"]);
        assert!(stats.last_indexed.is_some());
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let engine = DocsEngine::default();
        engine.build_index(vec![doc("old", "Probe", "probe", "s")]).unwrap();
        engine.build_index(vec![doc("new", "Heater", "heater", "t")]).unwrap();
        assert!(engine.get_document("old").is_none());
        assert!(engine.get_document("new").is_some());
        assert_eq!(engine.get_sections(), vec!["t"]);
        let response = engine.search("probe", &SearchOptions::default()).unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_failed_build_keeps_previous_index() {
        let engine = DocsEngine::default();
        engine.build_index(vec![doc("keep", "Probe", "probe", "s")]).unwrap();
        let err = engine
            .build_index(vec![doc("dup", "", "", "s"), doc("dup", "", "", "s")])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateDocument { .. }));
        assert!(engine.get_document("keep").is_some());
        let response = engine.search("probe", &SearchOptions::default()).unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[test]
    fn test_lookups() {
        let engine = DocsEngine::default();
        assert!(engine.get_document("a").is_none());
        assert!(engine.get_documents_by_section("s").is_empty());

        engine
            .build_index(vec![
                doc("b", "B", "", "g-codes"),
                doc("a", "A", "", "g-codes"),
                doc("c", "C", "", "config-reference"),
            ])
            .unwrap();
        let ids: Vec<String> = engine
            .get_documents_by_section("g-codes")
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(engine.get_sections(), vec!["config-reference", "g-codes"]);
        assert_eq!(engine.section_counts().get("g-codes"), Some(&2));
        assert_eq!(engine.documents().len(), 3);
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let engine = DocsEngine::default();
        let small: Vec<Document> = (0..3).map(|i| doc(&format!("s{}", i), "Probe", "probe", "s")).collect();
        let large: Vec<Document> = (0..9).map(|i| doc(&format!("l{}", i), "Probe", "probe", "s")).collect();
        engine.build_index(small.clone()).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..20 {
                    let docs = if i % 2 == 0 { large.clone() } else { small.clone() };
                    engine.build_index(docs).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let options = SearchOptions {
                            limit: Some(100),
                            ..Default::default()
                        };
                        let total = engine.search("probe", &options).unwrap().metadata.total_results;
                        assert!(total == 3 || total == 9, "partial snapshot: {}", total);
                    }
                });
            }
        });
    }

    #[test]
    fn test_extract_passthrough() {
        let text = "### [bed_mesh]\nfoo\n### [extruder]\nbar";
        assert_eq!(
            DocsEngine::extract_config_section(text, "bed_mesh").as_deref(),
            Some("### [bed_mesh]\nfoo")
        );
    }
}
