//! # Klipper Docs Core
//!
//! The search and retrieval core of Klipper Docs: document store,
//! tokenizer, weighted inverted index, query engine, configuration-section
//! extractor and stats reporting.
//!
//! This crate performs no file I/O and runs no async runtime or timers.
//! Documents arrive already parsed; the application crate owns parsing,
//! repository sync, scheduling and the protocol layers.
//!
//! ```
//! use klipper_docs_core::engine::DocsEngine;
//! use klipper_docs_core::search::SearchOptions;
//!
//! let engine = DocsEngine::default();
//! engine.build_index(Vec::new()).unwrap();
//! let response = engine.search("bed mesh", &SearchOptions::default()).unwrap();
//! assert!(response.results.is_empty());
//! ```

pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use engine::DocsEngine;
pub use error::{CoreError, Result};
