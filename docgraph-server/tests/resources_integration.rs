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


//! Serving a corpus directory through the resource layer and the MCP loop.

use docgraph_core::{Document, TermFrequency};
use docgraph_query::loader::{DOCUMENTS_FILE, TERMS_FILE};
use docgraph_query::{terms_from_documents, CacheConfig};
use docgraph_server::config::ServerConfig;
use docgraph_server::mcp::{serve, LineTransport, McpHandler};
use docgraph_server::resource_manager;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;
use tokio::io::BufReader;

fn corpus_dir() -> TempDir {
    let documents = vec![
        Document::new("guides/setup", "guides/setup.md")
            .with_title("Setup")
            .with_content("Install the node and configure the wallet.")
            .with_terms(["node", "wallet", "configuration"])
            .with_links(["guides/wallet"]),
        Document::new("guides/wallet", "guides/wallet.md")
            .with_title("Wallet")
            .with_terms(["wallet", "wallets", "keys"])
            .with_links(["reference/rpc"]),
        Document::new("reference/rpc", "reference/rpc.md")
            .with_title("RPC")
            .with_content_type("reference")
            .with_terms(["rpc", "node"]),
        Document::new("faq", "faq.md").with_title("FAQ"),
    ];
    let terms: Vec<TermFrequency> = terms_from_documents(&documents);

    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(DOCUMENTS_FILE),
        serde_json::to_string(&documents).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join(TERMS_FILE),
        serde_json::to_string(&terms).unwrap(),
    )
    .unwrap();
    dir
}

fn config_for(dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.data.data_dir = dir.path().to_path_buf();
    config
}

fn text_of(result: &docgraph_server::mcp::ReadResourceResult) -> Value {
    serde_json::from_str(result.text().unwrap()).unwrap()
}

#[test]
fn test_resources_from_corpus_dir() {
    let dir = corpus_dir();
    let config = config_for(&dir);
    config.validate().unwrap();
    let mut resources = resource_manager(&config).unwrap();

    let summary = text_of(&resources.read_resource("docs://summary").unwrap());
    assert_eq!(summary["documents"], 4);
    assert_eq!(summary["orphanDocuments"], 1);
    assert_eq!(summary["orphanPercentage"], 25.0);
    assert_eq!(summary["directories"]["guides"], 2);
    assert!(summary["connectivityScore"].as_f64().is_some());

    let page = text_of(
        &resources
            .read_resource("docs://documents?directory=guides&limit=1")
            .unwrap(),
    );
    assert_eq!(page["total"], 2);
    assert_eq!(page["hasMore"], true);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let doc = text_of(&resources.read_resource("docs://documents/guides/wallet").unwrap());
    assert_eq!(doc["title"], "Wallet");

    let top = resources.get_top_concepts(Some(1));
    assert_eq!(top.len(), 1);

    assert!(resources.read_resource("docs://nowhere").is_err());
    assert!(resources.read_resource("http://summary").is_err());
}

#[test]
fn test_cache_disabled_never_hits() {
    let dir = corpus_dir();
    let mut config = config_for(&dir);
    config.cache.enabled = false;
    assert!(!config.cache_config().enabled);

    let mut resources = resource_manager(&config).unwrap();
    resources.read_resource("docs://graph/summary").unwrap();
    resources.read_resource("docs://graph/summary").unwrap();
    assert_eq!(resources.cache_stats().hits, 0);
}

#[test]
fn test_cache_hits_on_repeated_reads() {
    let dir = corpus_dir();
    let mut config = config_for(&dir);
    config.cache = Default::default();
    assert_eq!(config.cache_config().ttl, CacheConfig::default().ttl);

    let mut resources = resource_manager(&config).unwrap();
    let first = resources.read_resource("docs://concepts?limit=3").unwrap();
    let second = resources.read_resource("docs://concepts?limit=3").unwrap();
    assert_eq!(first, second);
    assert_eq!(resources.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_mcp_session_over_lines() {
    let dir = corpus_dir();
    let resources = resource_manager(&config_for(&dir)).unwrap();
    let mut handler = McpHandler::new(resources);

    let input = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","method":"ping"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"resources/read","params":{"uri":"docs://documents/list"}}"#,
        r#"{"jsonrpc":"2.0","id":4,"method":"resources/read","params":{"uri":"docs://unknown"}}"#,
        r#"not json"#,
        r#"{"jsonrpc":"2.0","id":5,"method":"tools/list"}"#,
    ]
    .join("\n");

    let mut transport = LineTransport::new(BufReader::new(input.as_bytes()), Vec::new());
    serve(&mut handler, &mut transport).await.unwrap();

    let output = String::from_utf8(transport.into_writer()).unwrap();
    let responses: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 6);

    assert_eq!(responses[0]["id"], 1);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "docgraph-mcp");

    assert_eq!(responses[1]["id"], 2);
    assert!(!responses[1]["result"]["resources"].as_array().unwrap().is_empty());

    assert_eq!(responses[2]["id"], 3);
    let text = responses[2]["result"]["contents"][0]["text"].as_str().unwrap();
    let listing: Value = serde_json::from_str(text).unwrap();
    assert_eq!(listing["total"], 4);

    assert_eq!(responses[3]["id"], 4);
    assert_eq!(responses[3]["error"]["code"], -32602);

    assert_eq!(responses[4]["id"], Value::Null);
    assert_eq!(responses[4]["error"]["code"], -32700);

    assert_eq!(responses[5]["id"], 5);
    assert_eq!(responses[5]["error"]["code"], -32601);
}
