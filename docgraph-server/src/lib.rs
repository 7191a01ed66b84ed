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


//! Docgraph server
//!
//! Serves a documentation knowledge graph as read-only MCP resources.
//! The corpus is loaded once from a data directory at start-up; every
//! `docs://` read is rendered from that in-memory snapshot and cached.

pub mod config;
pub mod mcp;
pub mod resources;

use anyhow::{Context, Result};
use docgraph_query::Corpus;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::ServerConfig;
use mcp::{serve, McpHandler, StdioTransport};

pub use resources::{parse_resource_uri, resource_catalog, ResourceManager, ResourceRequest};

const DEFAULT_LOG_FILTER: &str = "docgraph_server=info,docgraph_query=info";

/// Install the global subscriber. Logs go to stderr since stdout carries
/// the protocol stream.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

/// Load the corpus described by `config`
pub fn load_corpus(config: &ServerConfig) -> Result<Corpus> {
    let registry = config.threshold_registry()?;
    let corpus = Corpus::from_dir(&config.data.data_dir, &registry).with_context(|| {
        format!(
            "failed to load corpus from {}",
            config.data.data_dir.display()
        )
    })?;
    Ok(corpus)
}

pub fn resource_manager(config: &ServerConfig) -> Result<ResourceManager<Corpus>> {
    let corpus = load_corpus(config)?;
    Ok(ResourceManager::new(corpus, config.cache_config()))
}

/// Serve MCP over stdio until stdin closes
pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::info!("Starting docgraph MCP server");
    tracing::debug!("Configuration: {:#?}", config);

    config.validate()?;

    let resources = resource_manager(&config)?;
    tracing::info!(
        data_dir = %config.data.data_dir.display(),
        cache_enabled = config.cache.enabled,
        "Corpus loaded"
    );

    let mut handler = McpHandler::new(resources);
    let mut transport = StdioTransport::stdio();
    serve(&mut handler, &mut transport).await?;

    let stats = handler.resources().cache_stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = %stats.hit_rate,
        "Server stopped"
    );
    Ok(())
}
