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


use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docgraph_query::DataLoader;
use docgraph_server::{config::ServerConfig, init_tracing, load_corpus, resource_manager, run_server};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory path (overrides config file)
    #[arg(long, env = "DOCGRAPH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Threshold overrides file (overrides config file)
    #[arg(long, env = "DOCGRAPH_THRESHOLDS_FILE")]
    thresholds: Option<PathBuf>,

    /// Disable the resource cache
    #[arg(long)]
    no_cache: bool,

    /// Emit JSON log lines on stderr
    #[arg(long, env = "DOCGRAPH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP over stdio (default)
    Serve,
    /// Render one docs:// resource to stdout
    Read { uri: String },
    /// Print the graph analysis as JSON
    Analyze,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::load(args.config)?;

    // Apply CLI overrides
    if let Some(data_dir) = args.data_dir {
        config.data.data_dir = data_dir;
    }
    if let Some(thresholds) = args.thresholds {
        config.data.thresholds_file = Some(thresholds);
    }
    if args.no_cache {
        config.cache.enabled = false;
    }
    if args.log_json {
        config.logging.json = true;
    }

    init_tracing(config.logging.json);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Read { uri } => {
            config.validate()?;
            let mut resources = resource_manager(&config)?;
            let result = resources.read_resource(&uri)?;
            let text = result
                .text()
                .with_context(|| format!("resource {} has no text content", uri))?;
            println!("{}", text);
            Ok(())
        }
        Command::Analyze => {
            config.validate()?;
            let corpus = load_corpus(&config)?;
            println!("{}", serde_json::to_string_pretty(corpus.analysis())?);
            Ok(())
        }
    }
}
