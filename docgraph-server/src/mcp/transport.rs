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

//! MCP transport abstraction (newline-delimited stdio, in-process channels).

use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::mpsc;

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Channel closed")]
    ChannelClosed,
}

/// Transport abstraction for MCP JSON-RPC messages.
#[async_trait::async_trait]
pub trait McpTransport: Send {
    /// Receive a JSON-RPC request; `None` once the peer has gone away.
    async fn recv(&mut self) -> Result<Option<JsonRpcRequest>, TransportError>;
    /// Send a JSON-RPC response.
    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError>;
}

/// One JSON message per line.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    line: String,
}

/// Line transport over the process's stdin/stdout
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<R, W> McpTransport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<JsonRpcRequest>, TransportError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(trimmed)?));
        }
    }

    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError> {
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        self.writer.write_all(&payload).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Buffer-backed transport for tests and in-process use.
pub struct BufferTransport {
    input: mpsc::Receiver<JsonRpcRequest>,
    output: mpsc::Sender<JsonRpcResponse>,
}

impl BufferTransport {
    pub fn new(input: mpsc::Receiver<JsonRpcRequest>, output: mpsc::Sender<JsonRpcResponse>) -> Self {
        Self { input, output }
    }
}

#[async_trait::async_trait]
impl McpTransport for BufferTransport {
    async fn recv(&mut self) -> Result<Option<JsonRpcRequest>, TransportError> {
        Ok(self.input.recv().await)
    }

    async fn send(&mut self, response: JsonRpcResponse) -> Result<(), TransportError> {
        self.output
            .send(response)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}
