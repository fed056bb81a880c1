//! `kdocs search` output.

use anyhow::Result;
use klipper_docs_core::search::{SearchOptions, SearchResponse};

use crate::service::DocsService;

/// Run a query and print ranked results with snippets.
pub async fn run_search(
    service: &DocsService,
    query: &str,
    section: Option<String>,
    limit: Option<usize>,
    include_content: bool,
) -> Result<()> {
    let options = SearchOptions {
        limit,
        section,
        include_content,
    };
    let response = service.engine().search(query, &options)?;
    print_response(&response);
    Ok(())
}

fn print_response(response: &SearchResponse) {
    if response.results.is_empty() {
        println!("No results.");
        return;
    }

    println!(
        "{} of {} results for \"{}\" ({:.1} ms)",
        response.results.len(),
        response.metadata.total_results,
        response.metadata.query,
        response.metadata.search_time_ms
    );
    println!();

    for (i, hit) in response.results.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} ({})",
            i + 1,
            hit.score,
            hit.document.title,
            hit.document.section
        );
        println!("    id: {}", hit.document.id);
        println!("    path: {}", hit.document.path);
        if !hit.highlights.is_empty() {
            println!("    matched: {}", hit.highlights.join(", "));
        }
        println!("    > {}", hit.snippet);
        if let Some(content) = &hit.content {
            println!();
            println!("{}", content);
        }
        println!();
    }
}
