//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to the MCP tool protocol so that editors
//! and agents can connect over stdio (`kdocs serve mcp`). Tools are
//! exposed via `list_tools` / `call_tool`, with the same parameter
//! validation as the HTTP server.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};

use crate::service::DocsService;
use crate::traits::{validate_params, ToolContext, ToolRegistry};

/// Bridges the tool registry to the MCP JSON-RPC protocol.
///
/// Cloned per session; everything is behind `Arc`.
#[derive(Clone)]
pub struct McpBridge {
    service: Arc<DocsService>,
    tools: Arc<ToolRegistry>,
}

impl McpBridge {
    pub fn new(service: Arc<DocsService>, tools: Arc<ToolRegistry>) -> Self {
        Self { service, tools }
    }

    /// Convert a registry tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::traits::Tool) -> Tool {
        let schema_value = tool.parameters_schema();
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> = match schema_value {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(tool.read_only())),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl ServerHandler for McpBridge {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "klipper-docs".to_string(),
                title: Some("Klipper Docs".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Klipper firmware documentation. Use search_docs to find pages, \
                 get_document to read one, and lookup_config to pull the reference \
                 block for a config section such as [bed_mesh] or [extruder]."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .tools
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.tools.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.tools.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let params = validate_params(&tool.parameters_schema(), &params)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let ctx = ToolContext::new(self.service.clone());
        match tool.execute(params, &ctx).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!("{:#}", e))])),
        }
    }
}

/// Serve the bridge over stdin/stdout until the client disconnects.
pub async fn run_stdio(service: Arc<DocsService>, tools: Arc<ToolRegistry>) -> anyhow::Result<()> {
    tracing::info!(tools = tools.len(), "MCP server starting on stdio");
    let running = McpBridge::new(service, tools)
        .serve(rmcp::transport::stdio())
        .await?;
    running.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_descriptors() {
        let registry = ToolRegistry::with_builtins();

        let search = McpBridge::to_mcp_tool(registry.find("search_docs").unwrap());
        assert_eq!(search.name, "search_docs");
        assert_eq!(search.input_schema["required"], serde_json::json!(["query"]));
        assert_eq!(search.annotations.and_then(|a| a.read_only_hint), Some(true));

        let reindex = McpBridge::to_mcp_tool(registry.find("reindex").unwrap());
        assert_eq!(reindex.annotations.and_then(|a| a.read_only_hint), Some(false));
    }
}
