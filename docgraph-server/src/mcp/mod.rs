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

//! Model Context Protocol (MCP) Server
//!
//! Exposes the documentation knowledge graph as read-only MCP resources under
//! the `docs://` scheme. Messages are JSON-RPC 2.0, one per line on stdio.
//!
//! ## Methods
//!
//! - `initialize` / `notifications/initialized`: lifecycle
//! - `ping`: health check
//! - `resources/list`: the `docs://` catalog
//! - `resources/read`: render one resource
//!
//! ```rust,ignore
//! let mut handler = McpHandler::new(ResourceManager::new(corpus, cache_config));
//! serve(&mut handler, &mut StdioTransport::stdio()).await?;
//! ```

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod transport;

pub use handlers::{McpHandler, SERVER_NAME};
pub use protocol::*;
pub use server::serve;
pub use transport::{BufferTransport, LineTransport, McpTransport, StdioTransport, TransportError};
