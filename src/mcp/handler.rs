//! MCP request dispatch over the knowledge base

use crate::engine::{
    KnowledgeBase, QueryError, ResourceContent, ResourceReadout, CONTENT_TEMPLATE, SCHEMA_RESOURCE,
};
use crate::ingestion::{IngestRequest, IngestionService};
use crate::mcp::protocol::{
    McpRequest, McpResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION, RESOURCE_NOT_FOUND,
};
use crate::mcp::tools::{
    error_result, render_groups, render_records, render_search, text_result, AggregateArgs,
    FuzzySearchArgs, SearchArgs, ToolName,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use validator::Validate;

const JSON_MIME: &str = "application/json";

/// MCP handler shared by every transport
#[derive(Clone)]
pub struct McpHandler {
    knowledge_base: Arc<KnowledgeBase>,
    ingestion: Arc<IngestionService>,
    server_name: String,
}

/// Reasons a tool call never reaches the engine
enum ParamsError {
    UnknownTool(String),
    Invalid(String),
}

impl McpHandler {
    pub fn new(
        knowledge_base: Arc<KnowledgeBase>,
        ingestion: Arc<IngestionService>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            knowledge_base,
            ingestion,
            server_name: server_name.into(),
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// Handle one raw JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<McpResponse> {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable JSON-RPC message");
                return Some(McpResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)));
            }
        };

        let id = value.get("id").cloned();
        let request: McpRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(McpResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ))
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(McpResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        self.handle(request).await
    }

    /// Handle an MCP request. Notifications produce no response.
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }

        tracing::debug!(method = %request.method, "Handling request");
        let id = request.id;

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => McpResponse::success(id, json!({ "tools": ToolName::definitions() })),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "resources/list" => self.handle_list_resources(id),
            "resources/templates/list" => self.handle_list_templates(id),
            "resources/read" => self.handle_read_resource(id, request.params).await,
            _ => McpResponse::error(id, METHOD_NOT_FOUND, "Method not found"),
        };

        Some(response)
    }

    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "resources": {
                    "subscribe": false,
                    "listChanged": false
                },
                "tools": {}
            },
            "serverInfo": {
                "name": self.server_name,
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        McpResponse::success(id, result)
    }

    fn handle_list_resources(&self, id: Option<Value>) -> McpResponse {
        let result = json!({
            "resources": [
                {
                    "uri": SCHEMA_RESOURCE,
                    "name": "Database schema",
                    "description": "Collections and the top-level fields of a sampled record in each",
                    "mimeType": JSON_MIME
                }
            ]
        });

        McpResponse::success(id, result)
    }

    fn handle_list_templates(&self, id: Option<Value>) -> McpResponse {
        let result = json!({
            "resourceTemplates": [
                {
                    "uriTemplate": CONTENT_TEMPLATE,
                    "name": "Documentation content",
                    "description": "One record by id, or up to ten records by technology and/or version",
                    "mimeType": JSON_MIME
                }
            ]
        });

        McpResponse::success(id, result)
    }

    async fn handle_read_resource(&self, id: Option<Value>, params: Value) -> McpResponse {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return McpResponse::error(id, INVALID_PARAMS, "Missing resource uri");
        };

        let readout = match self.knowledge_base.read_resource(uri).await {
            Ok(readout) => readout,
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "Resource read failed");
                return McpResponse::error(id, resource_error_code(&e), e.to_string());
            }
        };

        let text = match &readout {
            ResourceReadout::Schema(report) => serde_json::to_string_pretty(report),
            ResourceReadout::Content(ResourceContent::Guidance { message }) => Ok(message.clone()),
            ResourceReadout::Content(content) => serde_json::to_string_pretty(content),
        };

        match text {
            Ok(text) => {
                let mime = match readout {
                    ResourceReadout::Content(ResourceContent::Guidance { .. }) => "text/plain",
                    _ => JSON_MIME,
                };
                McpResponse::success(
                    id,
                    json!({ "contents": [{ "uri": uri, "mimeType": mime, "text": text }] }),
                )
            }
            Err(e) => McpResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Value) -> McpResponse {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match self.call_tool(name, arguments).await {
            Ok(result) => McpResponse::success(id, result),
            Err(ParamsError::UnknownTool(name)) => {
                McpResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
            }
            Err(ParamsError::Invalid(message)) => McpResponse::error(id, INVALID_PARAMS, message),
        }
    }

    /// Run a tool. Engine and ingestion failures become `isError` results.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ParamsError> {
        let tool =
            ToolName::from_str(name).map_err(|_| ParamsError::UnknownTool(name.to_string()))?;

        tracing::info!(tool = %tool, "Tool call");

        let result = match tool {
            ToolName::SearchDocumentation => {
                let args: SearchArgs = parse_arguments(arguments)?;
                match self
                    .knowledge_base
                    .search(args.technology.as_deref(), &args.query, args.limit)
                    .await
                {
                    Ok(outcome) => text_result(render_search(&args.query, &outcome)),
                    Err(e) => tool_failure(tool, &e),
                }
            }

            ToolName::AggregateDocumentation => {
                let args: AggregateArgs = parse_arguments(arguments)?;
                match self
                    .knowledge_base
                    .aggregate(&args.group_by, args.filter.as_ref())
                    .await
                {
                    Ok(groups) => rendered(render_groups(&groups)),
                    Err(e) => tool_failure(tool, &e),
                }
            }

            ToolName::FuzzySearchDocumentation => {
                let args: FuzzySearchArgs = parse_arguments(arguments)?;
                match self
                    .knowledge_base
                    .fuzzy_search(&args.term, &args.field, args.limit)
                    .await
                {
                    Ok(records) => rendered(render_records(&records)),
                    Err(e) => tool_failure(tool, &e),
                }
            }

            ToolName::IngestDocumentation => {
                let args: IngestRequest = parse_arguments(arguments)?;
                match self.ingestion.ingest_url(&args).await {
                    Ok(record) => text_result(format!(
                        "Ingested record {} for {} ({})",
                        record.id, record.technology, record.version
                    )),
                    Err(e) => {
                        tracing::warn!(tool = %tool, error = %e, "Tool failed");
                        error_result(e.to_string())
                    }
                }
            }
        };

        Ok(result)
    }
}

fn parse_arguments<T: DeserializeOwned + Validate>(arguments: Value) -> Result<T, ParamsError> {
    let args: T = serde_json::from_value(arguments)
        .map_err(|e| ParamsError::Invalid(format!("Invalid arguments: {}", e)))?;
    args.validate()
        .map_err(|e| ParamsError::Invalid(format!("Invalid arguments: {}", e)))?;
    Ok(args)
}

fn rendered(text: serde_json::Result<String>) -> Value {
    match text {
        Ok(text) => text_result(text),
        Err(e) => error_result(format!("Failed to render result: {}", e)),
    }
}

fn tool_failure(tool: ToolName, err: &QueryError) -> Value {
    tracing::warn!(tool = %tool, error = %err, "Tool failed");
    error_result(err.to_string())
}

fn resource_error_code(err: &QueryError) -> i32 {
    match err {
        QueryError::NotFound(_) => RESOURCE_NOT_FOUND,
        e if e.is_caller_error() => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IngestionConfig, SearchConfig};
    use crate::state::create_in_memory_store;

    fn create_handler() -> McpHandler {
        let store = create_in_memory_store(50_000_000).unwrap();
        let knowledge_base = Arc::new(KnowledgeBase::new(
            store.clone(),
            "documentation",
            SearchConfig::default(),
        ));
        let ingestion = Arc::new(
            IngestionService::new(store, "documentation", &IngestionConfig::default()).unwrap(),
        );
        McpHandler::new(knowledge_base, ingestion, "docs-knowledge-server")
    }

    #[tokio::test]
    async fn test_initialize() {
        let handler = create_handler();
        let response = handler
            .handle(McpRequest::new(1, "initialize", Value::Null))
            .await
            .unwrap();

        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "docs-knowledge-server");
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let handler = create_handler();
        let raw = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(handler.handle_message(raw).await.is_none());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let handler = create_handler();

        let response = handler.handle_message(b"{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);

        let response = handler
            .handle_message(br#"{"jsonrpc":"2.0","id":3,"method":"unknown/method"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(json!(3)));
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

        let response = handler
            .handle_message(br#"{"jsonrpc":"1.0","id":4,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_arguments() {
        let handler = create_handler();

        let response = handler
            .handle(McpRequest::new(1, "tools/call", json!({"name": "drop-everything"})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = handler
            .handle(McpRequest::new(
                2,
                "tools/call",
                json!({"name": "search-documentation", "arguments": {"limit": 3}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_failure_is_flagged_result() {
        let handler = create_handler();

        let response = handler
            .handle(McpRequest::new(
                1,
                "tools/call",
                json!({"name": "aggregate-documentation", "arguments": {"groupBy": "$where"}}),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Invalid field name"));
    }

    #[tokio::test]
    async fn test_resource_error_codes() {
        let handler = create_handler();

        let read = |uri: &str| McpRequest::new(1, "resources/read", json!({ "uri": uri }));

        let response = handler
            .handle(read("documentation.content/000000000000000000000000"))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, RESOURCE_NOT_FOUND);

        let response = handler.handle(read("documentation.content/not-an-id")).await.unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);

        let response = handler.handle(read("documentation.content")).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["contents"][0]["mimeType"], "text/plain");
    }
}
