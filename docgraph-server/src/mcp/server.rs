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

//! MCP serve loop

use crate::mcp::handlers::McpHandler;
use crate::mcp::protocol::{JsonRpcError, JsonRpcId, JsonRpcResponse};
use crate::mcp::transport::{McpTransport, TransportError};
use docgraph_query::DataLoader;
use tracing::{info, warn};

/// Answer requests until the transport closes.
///
/// Undecodable messages get a parse error response and the loop continues;
/// I/O failures end it.
pub async fn serve<L, T>(handler: &mut McpHandler<L>, transport: &mut T) -> Result<(), TransportError>
where
    L: DataLoader,
    T: McpTransport + ?Sized,
{
    info!("MCP server ready");
    let mut handled = 0u64;

    loop {
        let request = match transport.recv().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(TransportError::Json(e)) => {
                warn!(error = %e, "Malformed MCP message");
                let response = JsonRpcResponse::error(
                    JsonRpcId::Null,
                    JsonRpcError::parse_error(e.to_string()),
                );
                transport.send(response).await?;
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Some(response) = handler.handle_request(request) {
            transport.send(response).await?;
        }
        handled += 1;
    }

    info!(handled, "MCP transport closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::JsonRpcRequest;
    use crate::mcp::transport::BufferTransport;
    use crate::resources::ResourceManager;
    use docgraph_core::Graph;
    use docgraph_query::{CacheConfig, Corpus};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_serve_over_buffer_transport() {
        let corpus = Corpus::from_parts(vec![], Graph::new(), vec![], json!({}));
        let mut handler = McpHandler::new(ResourceManager::new(corpus, CacheConfig::default()));

        let (req_tx, req_rx) = mpsc::channel(8);
        let (resp_tx, mut resp_rx) = mpsc::channel(8);
        let mut transport = BufferTransport::new(req_rx, resp_tx);

        req_tx
            .send(JsonRpcRequest::new(JsonRpcId::Number(1), "ping", None))
            .await
            .unwrap();
        req_tx
            .send(JsonRpcRequest::notification("notifications/initialized", None))
            .await
            .unwrap();
        req_tx
            .send(JsonRpcRequest::new(
                JsonRpcId::String("r".into()),
                "resources/read",
                Some(json!({"uri": "docs://graph/summary"})),
            ))
            .await
            .unwrap();
        drop(req_tx);

        serve(&mut handler, &mut transport).await.unwrap();

        let first = resp_rx.recv().await.unwrap();
        assert_eq!(first.id, JsonRpcId::Number(1));
        let second = resp_rx.recv().await.unwrap();
        assert_eq!(second.id, JsonRpcId::String("r".into()));
        assert!(second.result.is_some());
        assert!(resp_rx.try_recv().is_err());
    }
}
