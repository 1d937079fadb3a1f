use crate::error::{AppError, Result};
use crate::mcp::handler::McpHandler;
use crate::state::is_reserved_collection;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// HTTP POST endpoint for JSON-RPC requests
pub const MCP_PATH: &str = "/mcp";
/// Health check endpoint (GET)
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub collections: usize,
}

/// Healthy only while the document store answers
pub async fn health_check(State(handler): State<McpHandler>) -> Result<Json<HealthResponse>> {
    let collections = handler
        .knowledge_base()
        .store()
        .list_collections()
        .await
        .map_err(|e| AppError::Unavailable(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collections: collections
            .iter()
            .filter(|name| !is_reserved_collection(name))
            .count(),
    }))
}

/// Handle one JSON-RPC message; notifications are acknowledged with 202
pub async fn mcp_endpoint(State(handler): State<McpHandler>, body: Bytes) -> Response {
    match handler.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Build the HTTP router
pub fn build_router(handler: McpHandler) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(MCP_PATH, post(mcp_endpoint))
        .with_state(handler)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
