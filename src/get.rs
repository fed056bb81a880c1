//! Document retrieval by id.
//!
//! Used by both the `kdocs get` CLI command and the `get_document` tool.

use anyhow::Result;
use klipper_docs_core::models::Document;
use klipper_docs_core::CoreError;
use std::sync::Arc;

use crate::service::DocsService;

/// Fetch a document, mapping absence to [`CoreError::DocumentNotFound`].
pub fn get_document(service: &DocsService, id: &str) -> Result<Arc<Document>> {
    service
        .engine()
        .get_document(id)
        .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()).into())
}

/// CLI entry point: print metadata, headings and body.
pub async fn run_get(service: &DocsService, id: &str) -> Result<()> {
    let doc = get_document(service, id)?;
    let meta = &doc.metadata;

    println!("--- Document ---");
    println!("id:            {}", doc.id);
    println!("title:         {}", doc.title);
    println!("section:       {}", doc.section);
    if let Some(sub) = &doc.subsection {
        println!("subsection:    {}", sub);
    }
    println!("path:          {}", doc.path);
    println!(
        "last_modified: {}",
        doc.last_modified.format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("words:         {}", meta.word_count);
    println!("reading_time:  {} min", meta.reading_time);
    println!("difficulty:    {}", meta.difficulty);
    if !meta.tags.is_empty() {
        let tags: Vec<&str> = meta.tags.iter().map(String::as_str).collect();
        println!("tags:          {}", tags.join(", "));
    }
    println!();

    if !meta.headings.is_empty() {
        println!("--- Headings ({}) ---", meta.headings.len());
        for h in &meta.headings {
            let indent = "  ".repeat(h.level.saturating_sub(1) as usize);
            println!("{}{} (#{})", indent, h.text, h.anchor);
        }
        println!();
    }

    println!("--- Body ---");
    println!("{}", doc.content);

    Ok(())
}
