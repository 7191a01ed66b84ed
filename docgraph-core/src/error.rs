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

//! Docgraph error types

use thiserror::Error;

/// Result type for docgraph operations
pub type Result<T> = std::result::Result<T, DocGraphError>;

/// Errors that can occur while building, analysing or querying the graph
#[derive(Debug, Error)]
pub enum DocGraphError {
    /// Missing threshold path, document, or fixture
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unknown comparison operator passed to a threshold check
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Resource URI does not use the `docs://` scheme or has bad parameters
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Resource path is well-formed but not served
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Ambiguous input to clustering or a missing required argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocGraphError {
    /// Whether the error was caused by the caller's request rather than the data.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            DocGraphError::InvalidUri(_)
                | DocGraphError::UnknownResource(_)
                | DocGraphError::NotFound(_)
                | DocGraphError::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for DocGraphError {
    fn from(e: serde_json::Error) -> Self {
        DocGraphError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for DocGraphError {
    fn from(e: toml::de::Error) -> Self {
        DocGraphError::Config(e.to_string())
    }
}
