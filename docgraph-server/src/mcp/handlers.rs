// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! MCP Request Handlers
//!
//! Handles JSON-RPC 2.0 requests for the MCP protocol.

use crate::mcp::protocol::*;
use crate::resources::{resource_catalog, ResourceManager};
use docgraph_core::DocGraphError;
use docgraph_query::DataLoader;
use serde_json::json;
use tracing::{debug, info, warn};

/// Server name reported during initialization
pub const SERVER_NAME: &str = "docgraph-mcp";

/// MCP request handler
pub struct McpHandler<L> {
    resources: ResourceManager<L>,
}

impl<L: DataLoader> McpHandler<L> {
    pub fn new(resources: ResourceManager<L>) -> Self {
        Self { resources }
    }

    pub fn resources(&self) -> &ResourceManager<L> {
        &self.resources
    }

    /// Handle a JSON-RPC request; notifications get no response
    pub fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request received");

        let Some(id) = request.id else {
            if request.method == "notifications/initialized" {
                info!("MCP client initialized");
            }
            return None;
        };

        let response = match request.method.as_str() {
            // Health check
            "ping" => JsonRpcResponse::success(id, json!({})),

            // Initialization
            "initialize" => self.handle_initialize(id, request.params),

            // Resources
            "resources/list" => self.handle_resources_list(id),
            "resources/read" => self.handle_resources_read(id, request.params),

            // Unknown method
            _ => {
                warn!(method = %request.method, "Unknown MCP method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(&request.method))
            }
        };

        Some(response)
    }

    fn handle_initialize(
        &self,
        id: JsonRpcId,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let init_params: InitializeParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)),
                    )
                }
            },
            None => InitializeParams::default(),
        };

        if let Some(client) = &init_params.client_info {
            info!(client = %client.name, version = %client.version, "MCP client connected");
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(id, &result)
    }

    fn handle_resources_list(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = ListResourcesResult {
            resources: resource_catalog(),
            next_cursor: None,
        };
        to_response(id, &result)
    }

    fn handle_resources_read(
        &mut self,
        id: JsonRpcId,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        let read_params: ReadResourceParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid read params: {}", e)),
                    )
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing read params"),
                )
            }
        };

        match self.resources.read_resource(&read_params.uri) {
            Ok(result) => to_response(id, &result),
            Err(e) => {
                warn!(uri = %read_params.uri, error = %e, "Resource read failed");
                JsonRpcResponse::error(id, resource_error(&e))
            }
        }
    }
}

/// Request errors are the caller's fault; anything else is ours
fn resource_error(e: &DocGraphError) -> JsonRpcError {
    if e.is_request_error() {
        JsonRpcError::invalid_params(e.to_string())
    } else {
        JsonRpcError::internal_error(e.to_string())
    }
}

fn to_response<T: serde::Serialize>(id: JsonRpcId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgraph_core::{Document, Graph};
    use docgraph_query::{CacheConfig, Corpus};

    fn handler() -> McpHandler<Corpus> {
        let corpus = Corpus::from_parts(
            vec![Document::new("intro", "intro.md").with_title("Intro")],
            Graph::new(),
            vec![],
            json!({}),
        );
        McpHandler::new(ResourceManager::new(corpus, CacheConfig::default()))
    }

    fn call(handler: &mut McpHandler<Corpus>, method: &str, params: serde_json::Value) -> JsonRpcResponse {
        handler
            .handle_request(JsonRpcRequest::new(JsonRpcId::Number(1), method, Some(params)))
            .unwrap()
    }

    #[test]
    fn test_initialize() {
        let mut h = handler();
        let resp = call(
            &mut h,
            "initialize",
            json!({"protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": {"name": "t", "version": "1"}}),
        );
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["capabilities"]["resources"]["subscribe"], false);
    }

    #[test]
    fn test_notification_has_no_response() {
        let mut h = handler();
        let req = JsonRpcRequest::notification("notifications/initialized", None);
        assert!(h.handle_request(req).is_none());

        let ping = JsonRpcRequest::notification("ping", None);
        assert!(h.handle_request(ping).is_none());

        let ping = JsonRpcRequest::new(JsonRpcId::Null, "ping", None);
        assert_eq!(h.handle_request(ping).unwrap().id, JsonRpcId::Null);
    }

    #[test]
    fn test_resources_read() {
        let mut h = handler();
        let resp = call(&mut h, "resources/read", json!({"uri": "docs://documents/intro"}));
        let result: ReadResourceResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.text().unwrap().contains("\"Intro\""));
    }

    #[test]
    fn test_resource_errors_are_invalid_params() {
        let mut h = handler();
        for uri in ["docs://nope", "file://graph", "docs://documents/missing"] {
            let resp = call(&mut h, "resources/read", json!({ "uri": uri }));
            assert_eq!(resp.error.unwrap().code, -32602, "{}", uri);
        }

        let resp = call(&mut h, "resources/read", json!({}));
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[test]
    fn test_unknown_method() {
        let mut h = handler();
        let resp = call(&mut h, "tools/list", json!({}));
        assert_eq!(resp.error.unwrap().code, -32601);
    }
}
