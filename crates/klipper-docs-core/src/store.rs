//! In-memory document store.
//!
//! A [`DocumentStore`] is one complete snapshot of the parsed corpus. It is
//! built wholesale from the parser output and never mutated after being
//! handed to the engine; a re-parse produces a fresh store.
//!
//! Documents are kept in a `BTreeMap` keyed by id, so iteration order is
//! the sorted id order. The index assigns document ordinals in this order
//! and the query engine uses it as its tie-break.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::models::Document;

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    docs: BTreeMap<String, Arc<Document>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parser output.
    ///
    /// Fails with [`CoreError::DuplicateDocument`] if two documents share an
    /// id.
    pub fn from_documents<I>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut store = Self::new();
        for doc in documents {
            store.insert(doc)?;
        }
        Ok(store)
    }

    /// Add a document, rejecting duplicate ids.
    pub fn insert(&mut self, doc: Document) -> Result<()> {
        if let Some(existing) = self.docs.get(&doc.id) {
            return Err(CoreError::DuplicateDocument {
                id: doc.id.clone(),
                first: existing.path.clone(),
                second: doc.path.clone(),
            });
        }
        self.docs.insert(doc.id.clone(), Arc::new(doc));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.docs.get(id).cloned()
    }

    /// Documents whose section equals `section` exactly, in id order.
    pub fn by_section(&self, section: &str) -> Vec<Arc<Document>> {
        self.docs
            .values()
            .filter(|d| d.section == section)
            .cloned()
            .collect()
    }

    /// Distinct section names, sorted ascending.
    pub fn sections(&self) -> Vec<String> {
        self.section_counts().into_keys().collect()
    }

    /// Document count per section, sorted by section name.
    pub fn section_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for doc in self.docs.values() {
            *counts.entry(doc.section.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Sum of word counts across all documents.
    pub fn total_words(&self) -> usize {
        self.docs.values().map(|d| d.metadata.word_count).sum()
    }

    /// All documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.docs.values()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::doc;

    #[test]
    fn test_duplicate_id_rejected() {
        let result = DocumentStore::from_documents(vec![
            doc("a", "A", "one", "s"),
            doc("a", "A again", "two", "s"),
        ]);
        match result {
            Err(CoreError::DuplicateDocument { id, .. }) => assert_eq!(id, "a"),
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_by_section_exact_match() {
        let store = DocumentStore::from_documents(vec![
            doc("b", "B", "", "g-codes"),
            doc("a", "A", "", "g-codes"),
            doc("c", "C", "", "g-codes-extra"),
        ])
        .unwrap();
        let ids: Vec<String> = store
            .by_section("g-codes")
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sections_sorted_distinct() {
        let store = DocumentStore::from_documents(vec![
            doc("1", "", "", "z"),
            doc("2", "", "", "a"),
            doc("3", "", "", "z"),
        ])
        .unwrap();
        assert_eq!(store.sections(), vec!["a", "z"]);
        assert_eq!(store.section_counts().get("z"), Some(&2));
    }

    #[test]
    fn test_get_missing() {
        let store = DocumentStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.is_empty());
    }
}
