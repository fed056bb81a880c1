//! Integration tests for the tool layer.
//!
//! These tests drive built-in and custom tools (implemented via the
//! `Tool` trait) against a real docs directory, both in-process and
//! through the HTTP server.

use anyhow::Result;
use async_trait::async_trait;
use klipper_docs::config::Config;
use klipper_docs::server::router;
use klipper_docs::service::DocsService;
use klipper_docs::traits::{validate_params, Tool, ToolContext, ToolRegistry};
use klipper_docs_core::search::SearchOptions;
use serde_json::{json, Value};
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;

// ─── Test Tool ──────────────────────────────────────────────────────

/// Custom tool that counts search hits per section via ToolContext.
struct HitsBySectionTool;

#[async_trait]
impl Tool for HitsBySectionTool {
    fn name(&self) -> &str {
        "hits_by_section"
    }

    fn description(&self) -> &str {
        "Count search hits grouped by section"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        let response = ctx.search(query, &SearchOptions::default())?;
        let mut counts = serde_json::Map::new();
        for hit in &response.results {
            let entry = counts
                .entry(hit.document.section.clone())
                .or_insert(json!(0));
            *entry = json!(entry.as_u64().unwrap_or(0) + 1);
        }
        Ok(json!({
            "query": query,
            "sections": counts,
            "section_total": ctx.sections().len(),
        }))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn write_docs(tmp: &TempDir) {
    let docs = tmp.path().join("docs");
    fs::create_dir_all(docs.join("guides")).unwrap();
    fs::write(
        docs.join("Config_Reference.md"),
        "# Configuration reference\n\n\
         ### [extruder]\n\nrotation_distance: 22.6\n\n\
         ### [bed_mesh]\n\nspeed: 50\nmesh_min: 10, 10\n",
    )
    .unwrap();
    fs::write(
        docs.join("guides").join("Bed_Level.md"),
        "# Bed level\n\nManual bed leveling with BED_SCREWS_ADJUST.\n",
    )
    .unwrap();
    fs::write(
        docs.join("guides").join("Probe_Calibrate.md"),
        "---\ntitle: Probe calibration\ntags: probe, bed\n---\n\
         Calibrate the probe z_offset before running a bed mesh.\n",
    )
    .unwrap();
}

fn test_config(tmp: &TempDir) -> Config {
    let config_content = format!(
        r#"
[docs]
root = '{}'

[search]
min_score = 0.0

[server]
bind = "127.0.0.1:0"
"#,
        tmp.path().join("docs").display()
    );
    toml::from_str(&config_content).unwrap()
}

async fn loaded_service(tmp: &TempDir) -> Arc<DocsService> {
    write_docs(tmp);
    let service = Arc::new(DocsService::new(test_config(tmp)));
    service.load().await.unwrap();
    service
}

/// Serve the router on an ephemeral port and return its address.
async fn spawn_server(
    service: Arc<DocsService>,
    tools: Arc<ToolRegistry>,
) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(service, tools);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    (addr, handle)
}

async fn call_tool(registry: &ToolRegistry, ctx: &ToolContext, name: &str, params: Value) -> Result<Value> {
    let tool = registry.find(name).expect("tool not registered");
    let params = validate_params(&tool.parameters_schema(), &params)?;
    tool.execute(params, ctx).await
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_builtin_tools_in_process() {
    let tmp = TempDir::new().unwrap();
    let service = loaded_service(&tmp).await;
    let registry = ToolRegistry::with_builtins();
    let ctx = ToolContext::new(service.clone());

    let result = call_tool(&registry, &ctx, "search_docs", json!({ "query": "bed" }))
        .await
        .unwrap();
    let results = result["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["document"]["id"], "guides/bed_level");
    assert_eq!(result["metadata"]["terms"], json!(["bed"]));
    assert!(results[0].get("content").map_or(true, Value::is_null));

    let result = call_tool(
        &registry,
        &ctx,
        "search_docs",
        json!({ "query": "bed", "section": "config-reference" }),
    )
    .await
    .unwrap();
    for hit in result["results"].as_array().unwrap() {
        assert_eq!(hit["document"]["section"], "config-reference");
    }

    let result = call_tool(&registry, &ctx, "list_sections", json!({}))
        .await
        .unwrap();
    let names: Vec<&str> = result["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["config-reference", "guides"]);

    let result = call_tool(&registry, &ctx, "list_documents", json!({ "section": "guides" }))
        .await
        .unwrap();
    assert_eq!(result["documents"].as_array().unwrap().len(), 2);

    let result = call_tool(&registry, &ctx, "get_document", json!({ "id": "guides/probe_calibrate" }))
        .await
        .unwrap();
    assert_eq!(result["title"], "Probe calibration");

    let result = call_tool(&registry, &ctx, "get_stats", json!({})).await.unwrap();
    assert_eq!(result["total_documents"], 3);
    assert!(result["last_indexed"].is_string());
}

#[tokio::test]
async fn test_lookup_config_tool() {
    let tmp = TempDir::new().unwrap();
    let service = loaded_service(&tmp).await;
    let registry = ToolRegistry::with_builtins();
    let ctx = ToolContext::new(service);

    let result = call_tool(&registry, &ctx, "lookup_config", json!({ "option": "[bed_mesh]" }))
        .await
        .unwrap();
    assert_eq!(result["found"], true);
    assert_eq!(result["document"], "config_reference");
    let text = result["text"].as_str().unwrap();
    assert!(text.starts_with("### [bed_mesh]"));
    assert!(text.contains("mesh_min: 10, 10"));
    assert!(!text.contains("rotation_distance"));

    let result = call_tool(&registry, &ctx, "lookup_config", json!({ "option": "tmc5160" }))
        .await
        .unwrap();
    assert_eq!(result["found"], false);

    let err = call_tool(
        &registry,
        &ctx,
        "lookup_config",
        json!({ "option": "extruder", "document": "missing" }),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_reindex_tool_picks_up_new_files() {
    let tmp = TempDir::new().unwrap();
    let service = loaded_service(&tmp).await;
    let registry = ToolRegistry::with_builtins();
    let ctx = ToolContext::new(service.clone());

    assert!(registry.find("reindex").is_some_and(|t| !t.read_only()));

    fs::write(
        tmp.path().join("docs").join("Resonance.md"),
        "# Resonance compensation\n\nInput shaper reduces ringing.\n",
    )
    .unwrap();

    let result = call_tool(&registry, &ctx, "reindex", json!({})).await.unwrap();
    assert_eq!(result["build"]["documents"], 4);
    assert!(result.get("sync").is_none());

    let response = service
        .engine()
        .search("shaper", &SearchOptions::default())
        .unwrap();
    assert_eq!(response.results[0].document.id, "resonance");
}

#[tokio::test]
async fn test_custom_tool_via_http_server() {
    let tmp = TempDir::new().unwrap();
    let service = loaded_service(&tmp).await;

    let mut tools = ToolRegistry::with_builtins();
    tools.register(Box::new(HitsBySectionTool));
    let tools = Arc::new(tools);

    let (addr, server_handle) = spawn_server(service, tools).await;
    let client = reqwest::Client::new();

    // Health reports a ready index
    let resp = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["index_ready"], true);

    // Custom tool listed alongside built-ins
    let resp = client
        .get(format!("http://{}/tools/list", addr))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let listed: Vec<(&str, bool)> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| (t["name"].as_str().unwrap(), t["builtin"].as_bool().unwrap()))
        .collect();
    assert!(listed.contains(&("search_docs", true)));
    assert!(listed.contains(&("hits_by_section", false)));

    // Call the custom tool
    let resp = client
        .post(format!("http://{}/tools/hits_by_section", addr))
        .json(&json!({ "query": "bed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"]["query"], "bed");
    assert_eq!(body["result"]["section_total"], 2);
    assert!(body["result"]["sections"]["guides"].as_u64().unwrap() >= 1);

    // Missing required param → 400
    let resp = client
        .post(format!("http://{}/tools/search_docs", addr))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    // Blank query is not an error, just empty
    let resp = client
        .post(format!("http://{}/tools/search_docs", addr))
        .json(&json!({ "query": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["result"]["results"], json!([]));
    assert_eq!(body["result"]["metadata"]["total_results"], 0);

    // Unknown document → 404
    let resp = client
        .post(format!("http://{}/tools/get_document", addr))
        .json(&json!({ "id": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    // Unknown tool → 404
    let resp = client
        .post(format!("http://{}/tools/nonexistent", addr))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server_handle.abort();
}

#[tokio::test]
async fn test_search_before_load_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    write_docs(&tmp);
    let service = Arc::new(DocsService::new(test_config(&tmp)));

    let (addr, server_handle) =
        spawn_server(service, Arc::new(ToolRegistry::with_builtins())).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["index_ready"], false);

    let resp = client
        .post(format!("http://{}/tools/search_docs", addr))
        .json(&json!({ "query": "bed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "index_not_ready");

    server_handle.abort();
}
