//! Core data models shared by the store, index, and query engine.
//!
//! Documents are produced by an external parser and handed to
//! [`DocsEngine::build_index`](crate::engine::DocsEngine::build_index) as a
//! complete snapshot. Everything here is plain data and serializes to the
//! JSON shapes returned by the tool layer.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rough audience tier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "basic" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "expert" | "hard" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: '{}'", other)),
        }
    }
}

/// A markdown heading inside a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 through 6.
    pub level: u8,
    pub text: String,
    /// Anchor slug usable as a URL fragment.
    pub anchor: String,
}

/// Derived metadata attached to every [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub word_count: usize,
    /// Estimated reading time in minutes.
    pub reading_time: u32,
    pub difficulty: Difficulty,
    /// Lowercase, deduplicated, sorted.
    pub tags: BTreeSet<String>,
    /// In document order.
    pub headings: Vec<Heading>,
}

/// A parsed documentation page.
///
/// `id` is derived from `path` and is stable across re-parses of the
/// same file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Raw markdown body with any frontmatter removed.
    pub content: String,
    pub section: String,
    pub subsection: Option<String>,
    /// Path relative to the docs root.
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

/// A document without its body, used in listings and search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub metadata: DocumentMetadata,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            section: doc.section.clone(),
            subsection: doc.subsection.clone(),
            path: doc.path.clone(),
            last_modified: doc.last_modified,
            metadata: doc.metadata.clone(),
        }
    }
}

/// Aggregate counts over the current document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub total_words: usize,
    /// Distinct, sorted ascending.
    pub sections: Vec<String>,
    /// `None` until the first successful build.
    pub last_indexed: Option<DateTime<Utc>>,
}
