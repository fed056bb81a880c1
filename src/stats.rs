//! Index statistics and section listings.
//!
//! Backs `kdocs stats`, `kdocs sections` and `kdocs list`.

use anyhow::Result;

use crate::service::DocsService;

/// Print document, word and section totals.
pub async fn run_stats(service: &DocsService) -> Result<()> {
    let stats = service.engine().get_stats();

    println!("Klipper Docs: Index Stats");
    println!("=========================");
    println!();
    println!("  Docs root:   {}", service.docs_root().display());
    println!("  Documents:   {}", stats.total_documents);
    println!("  Words:       {}", stats.total_words);
    println!("  Sections:    {}", stats.sections.len());
    println!(
        "  Indexed at:  {}",
        stats
            .last_indexed
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!();

    Ok(())
}

/// Print every section with its document count.
pub async fn run_sections(service: &DocsService) -> Result<()> {
    let counts = service.engine().section_counts();
    if counts.is_empty() {
        println!("No sections.");
        return Ok(());
    }

    println!("  {:<32} {:>6}", "SECTION", "DOCS");
    println!("  {}", "-".repeat(39));
    for (section, count) in &counts {
        println!("  {:<32} {:>6}", section, count);
    }

    Ok(())
}

/// Print the documents in one section.
pub async fn run_list(service: &DocsService, section: &str) -> Result<()> {
    let docs = service.engine().get_documents_by_section(section);
    if docs.is_empty() {
        println!("No documents in section '{}'.", section);
        return Ok(());
    }

    for doc in &docs {
        println!(
            "  {:<40} {} ({} words)",
            doc.id, doc.title, doc.metadata.word_count
        );
    }

    Ok(())
}
