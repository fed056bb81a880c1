//! Configuration-option lookup across the loaded documents.
//!
//! Used by both the `kdocs lookup` CLI command and the `lookup_config` tool.
//! Without an explicit document, documents in the `config-reference`
//! section are tried first, then every other document in id order; the
//! first extraction hit wins.

use anyhow::Result;
use klipper_docs_core::engine::DocsEngine;
use klipper_docs_core::extract::{find_config_section, ConfigSection};
use klipper_docs_core::CoreError;
use serde::Serialize;

use crate::service::DocsService;

/// Section searched first when no document is named.
pub const CONFIG_REFERENCE_SECTION: &str = "config-reference";

#[derive(Debug, Clone, Serialize)]
pub struct ConfigLookup {
    pub option: String,
    pub found: bool,
    /// Id of the document the section came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<ConfigSection>,
    /// Rendered block, including any context heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Find the configuration block for `option`.
///
/// A missing match is `found: false`, not an error. An unknown explicit
/// `document` is [`CoreError::DocumentNotFound`].
pub fn lookup_config(
    engine: &DocsEngine,
    option: &str,
    document: Option<&str>,
) -> Result<ConfigLookup> {
    let candidates = match document {
        Some(id) => vec![engine
            .get_document(id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?],
        None => {
            let (mut preferred, rest): (Vec<_>, Vec<_>) = engine
                .documents()
                .into_iter()
                .partition(|d| d.section == CONFIG_REFERENCE_SECTION);
            preferred.extend(rest);
            preferred
        }
    };

    for doc in candidates {
        if let Some(section) = find_config_section(&doc.content, option) {
            tracing::debug!(option, document = %doc.id, line = section.line, "config section found");
            return Ok(ConfigLookup {
                option: option.to_string(),
                found: true,
                document: Some(doc.id.clone()),
                text: Some(section.to_string()),
                section: Some(section),
            });
        }
    }

    tracing::debug!(option, "config section not found");
    Ok(ConfigLookup {
        option: option.to_string(),
        found: false,
        document: None,
        section: None,
        text: None,
    })
}

/// CLI entry point: print the block or a not-found message.
pub async fn run_lookup(service: &DocsService, option: &str, document: Option<&str>) -> Result<()> {
    let lookup = lookup_config(service.engine(), option, document)?;

    match (&lookup.document, &lookup.text) {
        (Some(doc), Some(text)) => {
            println!("--- [{}] from {} ---", option, doc);
            println!("{}", text);
        }
        _ => println!("No configuration section found for '{}'.", option),
    }

    Ok(())
}
