//! Tool trait, registry and the built-in docs tools.
//!
//! Every capability exposed to agents is a [`Tool`] registered in a
//! [`ToolRegistry`]. The HTTP server (`POST /tools/{name}`) and the MCP
//! bridge (`call_tool`) dispatch through the same registry, so both
//! protocols see identical tools.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 ToolRegistry                 │
//! │  search_docs  get_document  list_sections    │
//! │  list_documents  lookup_config  get_stats    │
//! │  reindex        + custom Rust tools          │
//! └──────────────┬───────────────────────────────┘
//!                ▼
//!     ToolContext → DocsService → DocsEngine
//! ```
//!
//! # Usage
//!
//! ```rust
//! use klipper_docs::traits::ToolRegistry;
//!
//! let tools = ToolRegistry::with_builtins();
//! assert!(tools.find("search_docs").is_some());
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use klipper_docs_core::models::{DocumentSummary, IndexStats};
use klipper_docs_core::search::{SearchOptions, SearchResponse};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::get::get_document;
use crate::lookup::{lookup_config, ConfigLookup};
use crate::service::{DocsService, RefreshReport};

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A tool that agents can discover and call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use klipper_docs::traits::{Tool, ToolContext};
///
/// pub struct SectionCountTool;
///
/// #[async_trait]
/// impl Tool for SectionCountTool {
///     fn name(&self) -> &str { "section_count" }
///     fn description(&self) -> &str { "Number of documentation sections" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {} })
///     }
///
///     async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
///         Ok(json!({ "sections": ctx.stats().sections.len() }))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Route name (`POST /tools/{name}`), lowercase with underscores.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Built-in tools are marked `"builtin": true` in `GET /tools/list`.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Whether the tool leaves the index unchanged.
    fn read_only(&self) -> bool {
        true
    }

    /// JSON Schema (`type: "object"`) for the parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with parameters already checked by [`validate_params`].
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Serializable tool info for the `/tools/list` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn from_tool(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            builtin: tool.is_builtin(),
            parameters: tool.parameters_schema(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// ToolContext
// ═══════════════════════════════════════════════════════════════════════

/// Bridge from tools to the loaded documentation.
///
/// All methods delegate to the same functions the CLI uses.
#[derive(Clone)]
pub struct ToolContext {
    service: Arc<DocsService>,
}

/// One entry of [`ToolContext::sections`].
#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub name: String,
    pub documents: usize,
}

impl ToolContext {
    pub fn new(service: Arc<DocsService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &DocsService {
        &self.service
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        Ok(self.service.engine().search(query, options)?)
    }

    pub fn sections(&self) -> Vec<SectionInfo> {
        self.service
            .engine()
            .section_counts()
            .into_iter()
            .map(|(name, documents)| SectionInfo { name, documents })
            .collect()
    }

    pub fn documents_in(&self, section: &str) -> Vec<DocumentSummary> {
        self.service
            .engine()
            .get_documents_by_section(section)
            .iter()
            .map(|d| DocumentSummary::from(d.as_ref()))
            .collect()
    }

    pub fn lookup_config(&self, option: &str, document: Option<&str>) -> Result<ConfigLookup> {
        lookup_config(self.service.engine(), option, document)
    }

    pub fn stats(&self) -> IndexStats {
        self.service.engine().get_stats()
    }

    pub async fn reindex(&self, sync: bool) -> Result<RefreshReport> {
        self.service.refresh(sync).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Parameter Validation
// ═══════════════════════════════════════════════════════════════════════

/// Validate incoming JSON parameters against a tool's schema.
///
/// Checks required fields, type compatibility, enum constraints and
/// integer `minimum`. Injects default values for missing optional fields.
pub fn validate_params(schema: &Value, params: &Value) -> Result<Value> {
    let params_obj = match params {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        other => bail!("parameters must be a JSON object, got {}", json_type_name(other)),
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let mut result = params_obj.clone();

    for req_field in &required {
        if !params_obj.contains_key(req_field) {
            bail!("missing required parameter: {}", req_field);
        }
    }

    for (prop_name, prop_schema) in &properties {
        if let Some(value) = params_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    bail!(
                        "parameter '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    );
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    bail!(
                        "parameter '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    );
                }
            }

            if let (Some(min), Some(n)) = (
                prop_schema.get("minimum").and_then(|m| m.as_i64()),
                value.as_i64(),
            ) {
                if n < min {
                    bail!("parameter '{}' must be >= {}, got {}", prop_name, min, n);
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    let value = params[key].as_str().unwrap_or("");
    if value.trim().is_empty() {
        bail!("{} must not be empty", key);
    }
    Ok(value)
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params[key].as_str().filter(|s| !s.trim().is_empty())
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Tool Implementations
// ═══════════════════════════════════════════════════════════════════════

pub struct SearchDocsTool;

#[async_trait]
impl Tool for SearchDocsTool {
    fn name(&self) -> &str {
        "search_docs"
    }

    fn description(&self) -> &str {
        "Full-text search over the Klipper documentation"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" },
                "section": { "type": "string", "description": "Only return documents in this section" },
                "limit": { "type": "integer", "description": "Max results", "minimum": 1 },
                "include_content": { "type": "boolean", "description": "Include full document bodies", "default": false }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        // Blank queries are valid and return no results.
        let query = params["query"].as_str().unwrap_or("");
        let options = SearchOptions {
            limit: params["limit"].as_u64().map(|n| n as usize),
            section: optional_str(&params, "section").map(str::to_string),
            include_content: params["include_content"].as_bool().unwrap_or(false),
        };
        let response = ctx.search(query, &options)?;
        Ok(serde_json::to_value(&response)?)
    }
}

pub struct GetDocumentTool;

#[async_trait]
impl Tool for GetDocumentTool {
    fn name(&self) -> &str {
        "get_document"
    }

    fn description(&self) -> &str {
        "Retrieve a full documentation page by id"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Document id, e.g. config_reference" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let id = required_str(&params, "id")?;
        let doc = get_document(ctx.service(), id)?;
        Ok(serde_json::to_value(doc.as_ref())?)
    }
}

pub struct ListSectionsTool;

#[async_trait]
impl Tool for ListSectionsTool {
    fn name(&self) -> &str {
        "list_sections"
    }

    fn description(&self) -> &str {
        "List documentation sections with document counts"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(json!({ "sections": ctx.sections() }))
    }
}

pub struct ListDocumentsTool;

#[async_trait]
impl Tool for ListDocumentsTool {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List the documents in one section"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "section": { "type": "string", "description": "Section name, e.g. g-codes" }
            },
            "required": ["section"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let section = required_str(&params, "section")?;
        Ok(json!({
            "section": section,
            "documents": ctx.documents_in(section),
        }))
    }
}

pub struct LookupConfigTool;

#[async_trait]
impl Tool for LookupConfigTool {
    fn name(&self) -> &str {
        "lookup_config"
    }

    fn description(&self) -> &str {
        "Extract the documentation block for a configuration section such as [bed_mesh]"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "option": { "type": "string", "description": "Config section name, e.g. bed_mesh" },
                "document": { "type": "string", "description": "Document id to search; defaults to the config reference" }
            },
            "required": ["option"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let option = required_str(&params, "option")?;
        let lookup = ctx.lookup_config(option, optional_str(&params, "document"))?;
        Ok(serde_json::to_value(&lookup)?)
    }
}

pub struct GetStatsTool;

#[async_trait]
impl Tool for GetStatsTool {
    fn name(&self) -> &str {
        "get_stats"
    }

    fn description(&self) -> &str {
        "Document, word and section counts for the loaded index"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        Ok(serde_json::to_value(ctx.stats())?)
    }
}

pub struct ReindexTool;

#[async_trait]
impl Tool for ReindexTool {
    fn name(&self) -> &str {
        "reindex"
    }

    fn description(&self) -> &str {
        "Re-parse the docs and rebuild the index, optionally syncing the repository first"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn read_only(&self) -> bool {
        false
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sync": { "type": "boolean", "description": "Pull the repository before parsing", "default": false }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let sync = params["sync"].as_bool().unwrap_or(false);
        let report = ctx.reindex(sync).await?;
        Ok(serde_json::to_value(&report)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry for built-in and custom tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with every built-in docs tool.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchDocsTool));
        registry.register(Box::new(GetDocumentTool));
        registry.register(Box::new(ListSectionsTool));
        registry.register(Box::new(ListDocumentsTool));
        registry.register(Box::new(LookupConfigTool));
        registry.register(Box::new(GetStatsTool));
        registry.register(Box::new(ReindexTool));
        registry
    }

    /// Register a tool. Lookups return the first tool registered under a
    /// name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::from_tool(t.as_ref())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
