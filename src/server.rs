//! JSON tool server over HTTP.
//!
//! Exposes every registered [`Tool`](crate::traits::Tool) through one
//! dispatch route.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool; success is `{ "result": ... }` |
//! | `GET`  | `/health` | Status, version and index readiness |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `index_not_ready` (503), `tool_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use klipper_docs_core::CoreError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::service::DocsService;
use crate::traits::{validate_params, ToolContext, ToolInfo, ToolRegistry};

/// Shared state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<DocsService>,
    tools: Arc<ToolRegistry>,
}

/// Build the router. Split out from [`run_server`] for in-process tests.
pub fn router(service: Arc<DocsService>, tools: Arc<ToolRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service, tools })
}

/// Bind `[server].bind` and serve until the process exits.
pub async fn run_server(service: Arc<DocsService>, tools: Arc<ToolRegistry>) -> anyhow::Result<()> {
    let bind_addr = service.config().server.bind.clone();

    for t in tools.tools() {
        tracing::debug!(tool = t.name(), builtin = t.is_builtin(), "tool registered");
    }

    let app = router(service, tools);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "tool server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn index_not_ready(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "index_not_ready",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

/// Map a tool failure to a status code: typed core errors first, then
/// known validation messages.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = format!("{}: {:#}", tool_name, err);

    match err.downcast_ref::<CoreError>() {
        Some(CoreError::IndexNotReady) => return index_not_ready(msg),
        Some(CoreError::DocumentNotFound(_)) => return not_found(msg),
        _ => {}
    }

    let plain = err.to_string();
    if plain.contains("must not be empty") || plain.contains("must be") {
        bad_request(msg)
    } else if plain.contains("not found") {
        not_found(msg)
    } else {
        tool_error(msg)
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    index_ready: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_ready: state.service.engine().is_ready(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

/// Look up, validate and execute a tool.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let validated_params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(e.to_string()))?;

    let ctx = ToolContext::new(state.service.clone());
    let result = tool
        .execute(validated_params, &ctx)
        .await
        .map_err(|e| {
            tracing::debug!(tool = %name, error = %e, "tool call failed");
            classify_tool_error(&name, e)
        })?;

    Ok(Json(serde_json::json!({ "result": result })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_core_errors() {
        let e = classify_tool_error("search_docs", CoreError::IndexNotReady.into());
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(e.code, "index_not_ready");

        let e = classify_tool_error("get_document", CoreError::DocumentNotFound("x".into()).into());
        assert_eq!(e.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_classify_messages() {
        let e = classify_tool_error("search_docs", anyhow::anyhow!("query must not be empty"));
        assert_eq!(e.code, "bad_request");
        let e = classify_tool_error("reindex", anyhow::anyhow!("git clone failed: boom"));
        assert_eq!(e.code, "tool_error");
        assert!(e.message.starts_with("reindex: "));
    }
}
